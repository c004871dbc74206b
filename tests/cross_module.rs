//! Cross-module interaction tests
//!
//! Tests the agreement between the instruction model, the assembler, the
//! disassembler and the runtime.

use pio_assembler::{AssemblerV0, PioAssembler};
use pio_disassembler::{decode, format};
use pio_runtime::{PioBlock, SimulatedPio};
use pio_spec::{
    encoding, Instruction, JmpCondition, MovDestination, MovSource, PioVersion, Program, SideSet,
};
use proptest::prelude::*;

// ============================================================================
// Assembler -> Disassembler
// ============================================================================

#[test]
fn test_builder_words_decode_to_same_instruction() {
    let side = SideSet::new(2, true, false);
    let asm = AssemblerV0::new(side);
    let word = asm.mov(MovDestination::X, MovSource::Osr).side(2).delay(3).encode();

    let decoded = decode(word, side).unwrap();
    assert_eq!(
        decoded.instruction,
        Instruction::Mov {
            destination: MovDestination::X,
            op: pio_spec::MovOperation::None,
            source: MovSource::Osr,
        }
    );
    assert_eq!(decoded.side, Some(2));
    assert_eq!(decoded.delay, 3);
    assert_eq!(format(&decoded), "mov x, osr side 2 [3]");
}

#[test]
fn test_trap_decodes_as_jump_to_itself() {
    let mut pio = PioBlock::new(SimulatedPio::default(), 0, PioVersion::V0);
    let loaded = pio.load(&Program::from_words(vec![0xA042; 4])).unwrap();
    pio.remove_program(&loaded);

    for addr in loaded.offset..loaded.offset + 4 {
        let word = pio.registers().instruction_memory()[addr as usize];
        let decoded = decode(word, SideSet::NONE).unwrap();
        assert_eq!(
            decoded.instruction,
            Instruction::Jmp { condition: JmpCondition::Always, address: loaded.offset }
        );
    }
}

proptest! {
    /// Loading relocates exactly the JMP targets and leaves other words alone
    #[test]
    fn test_load_relocates_only_jumps(
        words in prop::collection::vec(any::<u16>(), 1..16),
        offset in 0u8..16,
    ) {
        let program = Program::from_words(words.clone());
        prop_assume!(program.validate().is_ok());
        prop_assume!(program.check_version(PioVersion::V0).is_ok());

        let mut pio = PioBlock::new(SimulatedPio::default(), 0, PioVersion::V0);
        pio.add_program_at_offset(&program, offset).unwrap();
        let memory = pio.registers().instruction_memory();

        for (i, &word) in words.iter().enumerate() {
            let loaded = memory[offset as usize + i];
            if word >> 13 == 0 {
                prop_assert_eq!(loaded & 0x1F, ((word & 0x1F) as u8).wrapping_add(offset) as u16 & 0x1F);
                prop_assert_eq!(loaded & !0x1F, word & !0x1F);
            } else {
                prop_assert_eq!(loaded, word);
            }
            prop_assert_eq!(loaded, encoding::relocate_jump(word, offset));
        }
    }

    /// Every side-set value and delay the assembler accepts decodes back
    #[test]
    fn test_side_and_delay_survive(value in 0u8..4, delay in 0u8..8) {
        let side = SideSet::new(2, false, false);
        let asm = AssemblerV0::new(side);
        let word = asm.nop().side(value).delay(delay).encode();
        let decoded = decode(word, side).unwrap();
        prop_assert_eq!(decoded.side, Some(value));
        prop_assert_eq!(decoded.delay, delay);
    }
}
