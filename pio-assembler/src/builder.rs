//! Program builder
//!
//! Collects instruction words, labels and wrap marks, then produces a validated
//! [`Program`]. Jumps to labels are patched when the program is built.

use crate::assembler::InstructionBuilder;
use crate::error::{AssemblerError, Result};
use pio_spec::encoding::JMP_ADDRESS_MASK;
use pio_spec::{Instruction, Origin, PioVersion, Program, SideSet, Wrap};
use std::collections::HashMap;

#[derive(Clone, Debug)]
enum Slot {
    Word(u16),
    /// Encoded jump whose address field is filled from a label at build time
    Jump { word: u16, label: String },
}

/// Builds one program with a single side-set layout
#[derive(Clone, Debug)]
pub struct ProgramBuilder {
    side_set: SideSet,
    version: PioVersion,
    origin: Origin,
    slots: Vec<Slot>,
    labels: HashMap<String, u8>,
    wrap_target: Option<u8>,
    wrap_source: Option<u8>,
}

impl ProgramBuilder {
    pub fn new(side_set: SideSet) -> Self {
        Self::for_version(side_set, PioVersion::V0)
    }

    /// Builder whose program is checked against `version` on build
    pub fn for_version(side_set: SideSet, version: PioVersion) -> Self {
        ProgramBuilder {
            side_set,
            version,
            origin: Origin::Relocatable,
            slots: Vec::new(),
            labels: HashMap::new(),
            wrap_target: None,
            wrap_source: None,
        }
    }

    /// Address the next instruction will get
    pub fn position(&self) -> u8 {
        self.slots.len() as u8
    }

    /// Pin the program to a fixed offset
    pub fn origin(&mut self, offset: u8) -> &mut Self {
        self.origin = Origin::Fixed(offset);
        self
    }

    fn check_side_set(&self, instr: &InstructionBuilder) -> Result<()> {
        if instr.side_set() != self.side_set {
            return Err(AssemblerError::SideSetMismatch {
                expected: self.side_set,
                found: instr.side_set(),
            });
        }
        Ok(())
    }

    /// Append an instruction
    pub fn instr(&mut self, instr: InstructionBuilder) -> Result<&mut Self> {
        self.check_side_set(&instr)?;
        self.slots.push(Slot::Word(instr.encode()));
        Ok(self)
    }

    /// Append a jump whose target is `label`; the address given to the
    /// assembler is replaced.
    pub fn jmp_to(&mut self, instr: InstructionBuilder, label: &str) -> Result<&mut Self> {
        self.check_side_set(&instr)?;
        if !matches!(instr.instruction(), Instruction::Jmp { .. }) {
            return Err(AssemblerError::NotAJump(instr.instruction().mnemonic()));
        }
        self.slots.push(Slot::Jump {
            word: instr.encode() & !JMP_ADDRESS_MASK,
            label: label.to_string(),
        });
        Ok(self)
    }

    /// Name the next instruction's address
    pub fn label(&mut self, name: &str) -> Result<&mut Self> {
        if self.labels.contains_key(name) {
            return Err(AssemblerError::DuplicateLabel(name.to_string()));
        }
        self.labels.insert(name.to_string(), self.position());
        Ok(self)
    }

    /// Address of a label defined so far
    pub fn label_address(&self, name: &str) -> Option<u8> {
        self.labels.get(name).copied()
    }

    /// The next instruction is where execution continues after the wrap
    pub fn wrap_target(&mut self) -> Result<&mut Self> {
        if let Some(existing) = self.wrap_target {
            return Err(AssemblerError::DuplicateWrapTarget(existing));
        }
        self.wrap_target = Some(self.position());
        Ok(self)
    }

    /// The previous instruction wraps back to the wrap target
    pub fn wrap(&mut self) -> Result<&mut Self> {
        if let Some(existing) = self.wrap_source {
            return Err(AssemblerError::DuplicateWrap(existing));
        }
        if self.slots.is_empty() {
            return Err(AssemblerError::WrapWithoutInstruction);
        }
        self.wrap_source = Some(self.position() - 1);
        Ok(self)
    }

    /// Resolve labels and validate. Without wrap marks the program wraps over
    /// its whole length.
    pub fn build(&self) -> Result<Program> {
        if self.slots.is_empty() {
            return Err(AssemblerError::EmptyProgram);
        }

        let len = self.slots.len();
        let code = self
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Word(word) => Ok(*word),
                Slot::Jump { word, label } => {
                    let address = *self
                        .labels
                        .get(label)
                        .ok_or_else(|| AssemblerError::UndefinedLabel(label.clone()))?;
                    // Jumps stay inside the program once relocated
                    if address as usize >= len {
                        return Err(AssemblerError::LabelOutOfRange {
                            label: label.clone(),
                            address,
                            len,
                        });
                    }
                    Ok(word | address as u16 & JMP_ADDRESS_MASK)
                }
            })
            .collect::<Result<Vec<u16>>>()?;

        let wrap = Wrap {
            target: self.wrap_target.unwrap_or(0),
            source: self.wrap_source.unwrap_or(self.position() - 1),
        };

        let program = Program::new(code, self.origin, wrap, self.side_set)?;
        program.check_version(self.version)?;
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssemblerV0, AssemblerV1, PioAssembler};
    use pio_spec::{JmpCondition, OutDestination, SetDestination, SpecError};

    #[test]
    fn test_build_with_wrap() -> Result<()> {
        let side = SideSet::new(1, false, false);
        let asm = AssemblerV0::new(side);
        let mut builder = ProgramBuilder::new(side);
        builder
            .instr(asm.set(SetDestination::Pindirs, 1))?
            .wrap_target()?
            .instr(asm.out(OutDestination::Pins, 1).side(0))?
            .instr(asm.nop().side(1))?
            .wrap()?;

        let program = builder.build()?;
        assert_eq!(program.code, vec![0xE081, 0x6001, 0xB042]);
        assert_eq!(program.wrap, Wrap { target: 1, source: 2 });
        assert_eq!(program.side_set, side);
        Ok(())
    }

    #[test]
    fn test_labels_resolve_forward_and_backward() -> Result<()> {
        let asm = AssemblerV0::default();
        let mut builder = ProgramBuilder::new(SideSet::NONE);
        builder
            .label("top")?
            .jmp_to(asm.jmp(JmpCondition::XIsZero, 0), "end")?
            .instr(asm.nop())?
            .jmp_to(asm.jmp(JmpCondition::Always, 0), "top")?
            .label("end")?
            .instr(asm.nop())?;

        let program = builder.build()?;
        assert_eq!(program.code, vec![0x0023, 0xA042, 0x0000, 0xA042]);
        assert_eq!(builder.label_address("end"), Some(3));
        Ok(())
    }

    #[test]
    fn test_errors() {
        let asm = AssemblerV0::default();
        let mut builder = ProgramBuilder::new(SideSet::NONE);
        assert_eq!(builder.build().unwrap_err(), AssemblerError::EmptyProgram);
        assert_eq!(builder.wrap().unwrap_err(), AssemblerError::WrapWithoutInstruction);

        builder.label("a").unwrap();
        assert_eq!(
            builder.label("a").unwrap_err(),
            AssemblerError::DuplicateLabel("a".into())
        );

        builder.wrap_target().unwrap();
        assert_eq!(builder.wrap_target().unwrap_err(), AssemblerError::DuplicateWrapTarget(0));

        assert!(matches!(
            builder.jmp_to(asm.nop(), "a"),
            Err(AssemblerError::NotAJump("mov"))
        ));

        builder.jmp_to(asm.jmp(JmpCondition::Always, 0), "missing").unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            AssemblerError::UndefinedLabel("missing".into())
        );
    }

    #[test]
    fn test_jump_past_end_rejected() {
        let asm = AssemblerV0::default();
        let mut builder = ProgramBuilder::new(SideSet::NONE);
        builder
            .jmp_to(asm.jmp(JmpCondition::Always, 0), "end")
            .unwrap()
            .instr(asm.nop())
            .unwrap()
            .label("end")
            .unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            AssemblerError::LabelOutOfRange { label: "end".into(), address: 2, len: 2 }
        );

        // An unreferenced trailing label is harmless
        let mut builder = ProgramBuilder::new(SideSet::NONE);
        builder.instr(asm.nop()).unwrap().label("unused").unwrap();
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_side_set_mismatch() {
        let asm = AssemblerV0::new(SideSet::new(2, false, false));
        let mut builder = ProgramBuilder::new(SideSet::new(1, false, false));
        assert!(matches!(
            builder.instr(asm.nop()),
            Err(AssemblerError::SideSetMismatch { .. })
        ));
    }

    #[test]
    fn test_too_long() {
        let asm = AssemblerV0::default();
        let mut builder = ProgramBuilder::new(SideSet::NONE);
        for _ in 0..33 {
            builder.instr(asm.nop()).unwrap();
        }
        assert_eq!(
            builder.build().unwrap_err(),
            AssemblerError::Spec(SpecError::ProgramTooLong { len: 33, max: 32 })
        );
    }

    #[test]
    fn test_origin_and_version() -> Result<()> {
        let asm = AssemblerV1::default();
        let mut builder = ProgramBuilder::new(SideSet::NONE);
        builder.origin(8).instr(asm.mov_from_rx(crate::RxFifoIndex::Y))?;
        assert!(matches!(
            builder.build(),
            Err(AssemblerError::Spec(SpecError::UnsupportedOnVersion { .. }))
        ));

        let mut builder = ProgramBuilder::for_version(SideSet::NONE, PioVersion::V1);
        builder.origin(8).instr(asm.mov_from_rx(crate::RxFifoIndex::Y))?;
        let program = builder.build()?;
        assert_eq!(program.origin, Origin::Fixed(8));
        Ok(())
    }
}
