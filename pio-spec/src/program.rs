//! # Program Structure
//!
//! A program is a run of instruction words plus the metadata needed to place
//! and run it: where it may live in instruction memory, its wrap bounds and
//! the side-set layout shared by every word. Jump targets and wrap bounds are
//! authored relative to offset 0 and shifted when the program is loaded.

use crate::config::StateMachineConfig;
use crate::encoding::{self, relocate_jump};
use crate::error::{Result, SpecError};
use crate::{Instruction, PioVersion, INSTRUCTION_MEMORY_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a program may be placed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Anywhere; jumps are relocated on load
    #[default]
    Relocatable,
    /// Only at this offset
    Fixed(u8),
}

/// Wrap bounds, relative to the program start. After executing `source` the
/// state machine continues at `target` at no cost.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wrap {
    pub target: u8,
    pub source: u8,
}

/// Side-set layout shared by every instruction of a program
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SideSet {
    /// Data bits, enable bit excluded
    pub bits: u8,
    /// Top bit of the field enables side-set per instruction
    pub optional: bool,
    /// Side-set drives pin directions rather than levels
    pub pindirs: bool,
}

impl SideSet {
    pub const NONE: SideSet = SideSet { bits: 0, optional: false, pindirs: false };

    pub const fn new(bits: u8, optional: bool, pindirs: bool) -> Self {
        SideSet { bits, optional, pindirs }
    }

    /// Bits taken from the delay field, enable bit included
    pub const fn width(&self) -> u8 {
        self.bits + self.optional as u8
    }

    /// Largest side-set value
    pub const fn max_value(&self) -> u8 {
        ((1u16 << self.bits) - 1) as u8
    }

    /// Largest delay left next to this side-set
    pub const fn max_delay(&self) -> u8 {
        encoding::max_delay(self.width())
    }

    /// Field value for side-set `value`, enable bit set when optional
    pub const fn field_value(&self, value: u8) -> u8 {
        if self.optional {
            (1 << self.bits) | value
        } else {
            value
        }
    }

    /// Apply side-set `value` to `word`
    pub const fn apply(&self, word: u16, value: u8) -> u16 {
        encoding::apply_side_set(word, self.field_value(value), self.width())
    }

    /// Side-set value carried by `word`, `None` when the optional enable is clear
    pub const fn extract(&self, word: u16) -> Option<u8> {
        if self.width() == 0 {
            return None;
        }
        let field = encoding::extract_side_set(word, self.width());
        if self.optional {
            if field & (1 << self.bits) == 0 {
                None
            } else {
                Some(field & self.max_value())
            }
        } else {
            Some(field)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width() > encoding::MAX_SIDE_SET_WIDTH {
            return Err(SpecError::InvalidSideSet { width: self.width() });
        }
        Ok(())
    }
}

/// PIO program
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Instruction words, jumps relative to offset 0
    pub code: Vec<u16>,
    pub origin: Origin,
    pub wrap: Wrap,
    pub side_set: SideSet,
}

impl Program {
    /// Relocatable program wrapping over its whole length, no side-set
    pub fn from_words(code: Vec<u16>) -> Self {
        let source = code.len().saturating_sub(1) as u8;
        Program {
            code,
            origin: Origin::Relocatable,
            wrap: Wrap { target: 0, source },
            side_set: SideSet::NONE,
        }
    }

    /// Create a program and validate its layout
    pub fn new(code: Vec<u16>, origin: Origin, wrap: Wrap, side_set: SideSet) -> Result<Self> {
        let program = Program { code, origin, wrap, side_set };
        program.validate()?;
        Ok(program)
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Validate length, origin, wrap bounds and side-set width
    pub fn validate(&self) -> Result<()> {
        let len = self.code.len();
        if len == 0 {
            return Err(SpecError::EmptyProgram);
        }
        if len > INSTRUCTION_MEMORY_SIZE {
            return Err(SpecError::ProgramTooLong { len, max: INSTRUCTION_MEMORY_SIZE });
        }
        if let Origin::Fixed(origin) = self.origin {
            if origin as usize + len > INSTRUCTION_MEMORY_SIZE {
                return Err(SpecError::InvalidOrigin { origin, len });
            }
        }
        if self.wrap.target > self.wrap.source || self.wrap.source as usize >= len {
            return Err(SpecError::InvalidWrap {
                target: self.wrap.target,
                top: self.wrap.source,
                len,
            });
        }
        self.side_set.validate()
    }

    /// Serialize to a binary program image
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| SpecError::Serialization(e.to_string()))
    }

    /// Deserialize and validate a binary program image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let program: Program =
            bincode::deserialize(bytes).map_err(|e| SpecError::Serialization(e.to_string()))?;
        program.validate()?;
        Ok(program)
    }

    /// Reject words the given generation cannot execute
    pub fn check_version(&self, version: PioVersion) -> Result<()> {
        for &word in &self.code {
            Instruction::decode(word)?.check_version(version)?;
        }
        Ok(())
    }

    /// Words as they must appear in memory when loaded at `offset`
    pub fn relocated(&self, offset: u8) -> impl Iterator<Item = u16> + '_ {
        self.code.iter().map(move |&word| relocate_jump(word, offset))
    }

    /// Default configuration for this program loaded at `offset`: absolute
    /// wrap bounds and the side-set parameters, everything else at reset values.
    pub fn default_config(&self, offset: u8) -> StateMachineConfig {
        self.default_config_for(offset, PioVersion::V0)
    }

    pub fn default_config_for(&self, offset: u8, version: PioVersion) -> StateMachineConfig {
        StateMachineConfig::default_for(version)
            .set_wrap(offset + self.wrap.target, offset + self.wrap.source)
            .set_sideset_params(self.side_set.width(), self.side_set.optional, self.side_set.pindirs)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Program({} words", self.code.len())?;
        if let Origin::Fixed(origin) = self.origin {
            write!(f, ", origin {}", origin)?;
        }
        write!(f, ", wrap {}..={}", self.wrap.target, self.wrap.source)?;
        if self.side_set.width() > 0 {
            write!(f, ", side-set {}", self.side_set.bits)?;
            if self.side_set.optional {
                write!(f, " opt")?;
            }
            if self.side_set.pindirs {
                write!(f, " pindirs")?;
            }
        }
        write!(f, ")")
    }
}

/// A program placed in instruction memory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedProgram {
    pub program: Program,
    pub offset: u8,
    /// Generation of the block holding the program
    pub version: PioVersion,
}

impl LoadedProgram {
    pub fn new(program: Program, offset: u8, version: PioVersion) -> Self {
        LoadedProgram { program, offset, version }
    }

    /// Address of the first instruction
    pub fn entry(&self) -> u8 {
        self.offset
    }

    pub fn wrap_target(&self) -> u8 {
        self.offset + self.program.wrap.target
    }

    pub fn wrap_source(&self) -> u8 {
        self.offset + self.program.wrap.source
    }

    pub fn len(&self) -> usize {
        self.program.len()
    }

    pub fn is_empty(&self) -> bool {
        self.program.is_empty()
    }

    /// Default configuration for the program at its load offset, with the
    /// reset values of the block's generation
    pub fn default_config(&self) -> StateMachineConfig {
        self.program.default_config_for(self.offset, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_words() {
        let program = Program::from_words(vec![0x6001, 0x1040, 0x0000]);
        assert_eq!(program.len(), 3);
        assert_eq!(program.wrap, Wrap { target: 0, source: 2 });
        assert!(program.validate().is_ok());
    }

    #[test]
    fn test_validate_errors() {
        assert_eq!(Program::from_words(vec![]).validate(), Err(SpecError::EmptyProgram));

        let long = Program::from_words(vec![encoding::NOP; 33]);
        assert_eq!(long.validate(), Err(SpecError::ProgramTooLong { len: 33, max: 32 }));

        let mut fixed = Program::from_words(vec![encoding::NOP; 4]);
        fixed.origin = Origin::Fixed(29);
        assert_eq!(fixed.validate(), Err(SpecError::InvalidOrigin { origin: 29, len: 4 }));
        fixed.origin = Origin::Fixed(28);
        assert!(fixed.validate().is_ok());

        let mut wrap = Program::from_words(vec![encoding::NOP; 2]);
        wrap.wrap = Wrap { target: 0, source: 2 };
        assert!(matches!(wrap.validate(), Err(SpecError::InvalidWrap { .. })));
    }

    #[test]
    fn test_full_memory_program_is_valid() {
        let program = Program::from_words(vec![encoding::NOP; 32]);
        assert!(program.validate().is_ok());
    }

    #[test]
    fn test_relocated() {
        let program = Program::from_words(vec![0x0000, encoding::NOP, 0x0041]);
        let words: Vec<u16> = program.relocated(10).collect();
        assert_eq!(words, vec![0x000A, encoding::NOP, 0x004B]);
    }

    #[test]
    fn test_side_set_values() {
        let side = SideSet::new(1, true, false);
        assert_eq!(side.width(), 2);
        assert_eq!(side.max_value(), 1);
        assert_eq!(side.max_delay(), 7);
        assert_eq!(side.apply(encoding::NOP, 1), 0xB842);
        assert_eq!(side.extract(0xB842), Some(1));
        assert_eq!(side.extract(encoding::NOP), None);

        let plain = SideSet::new(1, false, false);
        assert_eq!(plain.apply(0x0040, 1), 0x1040);
        assert_eq!(plain.extract(0x1040), Some(1));
        assert_eq!(SideSet::NONE.extract(0x1F40), None);
    }

    #[test]
    fn test_default_config() {
        let mut program = Program::from_words(vec![encoding::NOP; 4]);
        program.wrap = Wrap { target: 1, source: 3 };
        program.side_set = SideSet::new(1, true, true);
        let cfg = program.default_config(8);
        assert_eq!(cfg.wrap(), (9, 11));
        assert_eq!(cfg.pinctrl >> 29, 2);
        assert_ne!(cfg.execctrl & crate::config::execctrl::SIDE_EN, 0);
        assert_ne!(cfg.execctrl & crate::config::execctrl::SIDE_PINDIR, 0);
    }

    #[test]
    fn test_loaded_program() {
        let mut program = Program::from_words(vec![encoding::NOP; 5]);
        program.wrap = Wrap { target: 2, source: 4 };
        let loaded = LoadedProgram::new(program, 20, PioVersion::V0);
        assert_eq!(loaded.entry(), 20);
        assert_eq!(loaded.wrap_target(), 22);
        assert_eq!(loaded.wrap_source(), 24);
        assert_eq!(loaded.default_config().wrap(), (22, 24));
    }

    #[test]
    fn test_loaded_program_config_follows_version() {
        let program = Program::from_words(vec![encoding::NOP; 2]);
        let v1 = LoadedProgram::new(program.clone(), 4, PioVersion::V1);
        assert_eq!(v1.default_config(), program.default_config_for(4, PioVersion::V1));

        // Joins and IN_COUNT only exist on V1 configurations
        let cfg = v1.default_config().set_fifo_join(crate::FifoJoin::PutGet).set_in_pins(0, 3);
        assert_eq!(cfg.fifo_join(), crate::FifoJoin::PutGet);
        assert_eq!(cfg.shiftctrl & crate::config::shiftctrl::IN_COUNT_MASK, 3);
    }

    #[test]
    fn test_check_version() {
        // mov rxfifo[y], isr
        let program = Program::from_words(vec![0x8010]);
        assert!(program.check_version(PioVersion::V0).is_err());
        assert!(program.check_version(PioVersion::V1).is_ok());
    }

    #[test]
    fn test_binary_image() {
        let mut program = Program::from_words(vec![0x6001, 0x1040]);
        program.origin = Origin::Fixed(4);
        program.side_set = SideSet::new(1, false, false);
        let bytes = program.to_bytes().unwrap();
        assert_eq!(Program::from_bytes(&bytes).unwrap(), program);
        assert!(matches!(
            Program::from_bytes(&bytes[..3]),
            Err(SpecError::Serialization(_))
        ));
    }

    #[test]
    fn test_display() {
        let mut program = Program::from_words(vec![encoding::NOP; 3]);
        program.side_set = SideSet::new(1, true, false);
        assert_eq!(program.to_string(), "Program(3 words, wrap 0..=2, side-set 1 opt)");
    }
}
