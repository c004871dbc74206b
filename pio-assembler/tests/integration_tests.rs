//! Integration tests for the PIO assembler
//!
//! Whole programs assembled with the fluent API, checked word for word
//! against their known hardware encodings.

use pio_assembler::{AssemblerError, AssemblerV0, AssemblerV1, PioAssembler, ProgramBuilder, RxFifoIndex};
use pio_spec::encoding::apply_delay;
use pio_spec::{
    InSource, Instruction, IrqIndexMode, JmpCondition, MovDestination, MovOperation, MovSource,
    Origin, OutDestination, PioVersion, SetDestination, SideSet, WaitSource, Wrap,
};
use proptest::prelude::*;

// ============================================================================
// Known Programs
// ============================================================================

#[test]
fn test_three_wire_spi() {
    let side = SideSet::new(1, false, false);
    let asm = AssemblerV0::new(side);
    let mut builder = ProgramBuilder::new(side);
    builder
        .wrap_target()
        .unwrap()
        .label("write")
        .unwrap()
        .instr(asm.out(OutDestination::Pins, 1).side(0))
        .unwrap()
        .jmp_to(asm.jmp(JmpCondition::XDecNonZero, 0).side(1), "write")
        .unwrap()
        .jmp_to(asm.jmp(JmpCondition::YIsZero, 0).side(0), "end")
        .unwrap()
        .instr(asm.set(SetDestination::Pindirs, 0).side(0))
        .unwrap()
        .instr(asm.nop().side(0))
        .unwrap()
        .label("read")
        .unwrap()
        .instr(asm.in_(InSource::Pins, 1).side(1))
        .unwrap()
        .jmp_to(asm.jmp(JmpCondition::YDecNonZero, 0).side(0), "read")
        .unwrap()
        .label("end")
        .unwrap()
        .instr(asm.wait_pin(true, 0).side(0))
        .unwrap()
        .instr(asm.irq_set(false, 0).side(0))
        .unwrap()
        .wrap()
        .unwrap();

    let program = builder.build().unwrap();
    assert_eq!(
        program.code,
        vec![0x6001, 0x1040, 0x0067, 0xE080, 0xA042, 0x5001, 0x0085, 0x20A0, 0xC000]
    );
    assert_eq!(program.wrap, Wrap { target: 0, source: 8 });
}

#[test]
fn test_ws2812b_bit_banger() {
    let asm = AssemblerV0::new(SideSet::NONE);
    let mut code = vec![
        asm.pull(false, true).encode(),
        asm.set(SetDestination::X, 23).encode(),
        asm.set(SetDestination::Pins, 1).encode(),
        asm.out(OutDestination::Y, 1).encode(),
        asm.jmp(JmpCondition::YIsZero, 6).encode(),
        asm.jmp(JmpCondition::Always, 7).delay(2).encode(),
        asm.set(SetDestination::Pins, 0).delay(3).encode(),
        asm.set(SetDestination::Pins, 0).delay(1).encode(),
        asm.jmp(JmpCondition::XDecNonZero, 2).encode(),
    ];
    code.extend(std::iter::repeat(asm.nop().delay(31).encode()).take(11));
    code.push(asm.jmp(JmpCondition::Always, 0).delay(13).encode());

    assert_eq!(
        &code[..9],
        &[0x80A0, 0xE037, 0xE001, 0x6041, 0x0066, 0x0207, 0xE300, 0xE100, 0x0042]
    );
    assert!(code[9..20].iter().all(|&w| w == 0xBF42));
    assert_eq!(code[20], 0x0D00);
    assert_eq!(code.len(), 21);
}

#[test]
fn test_spi_cpha0() {
    let side = SideSet::new(1, false, false);
    let asm = AssemblerV0::new(side);
    let mut builder = ProgramBuilder::new(side);
    builder
        .instr(asm.out(OutDestination::Pins, 1).side(0).delay(1))
        .unwrap()
        .instr(asm.in_(InSource::Pins, 1).side(1).delay(1))
        .unwrap();
    assert_eq!(builder.build().unwrap().code, vec![0x6101, 0x5101]);
}

#[test]
fn test_v1_register_file_program() {
    let asm = AssemblerV1::default();
    let mut builder = ProgramBuilder::for_version(SideSet::NONE, PioVersion::V1);
    builder
        .origin(0)
        .instr(asm.mov_from_rx(RxFifoIndex::Immediate(0)))
        .unwrap()
        .instr(asm.out(OutDestination::Pins, 32))
        .unwrap()
        .instr(asm.mov(MovDestination::Pindirs, MovSource::Osr))
        .unwrap()
        .instr(asm.mov_to_rx(RxFifoIndex::Y))
        .unwrap();

    let program = builder.build().unwrap();
    assert_eq!(program.origin, Origin::Fixed(0));
    assert_eq!(program.code, vec![0x8098, 0x6000, 0xA067, 0x8010]);
    for &word in &program.code {
        assert!(Instruction::decode(word).unwrap().check_version(PioVersion::V1).is_ok());
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[test]
fn test_fixed_origin_past_end() {
    let asm = AssemblerV0::default();
    let mut builder = ProgramBuilder::new(SideSet::NONE);
    builder.origin(31);
    builder.instr(asm.nop()).unwrap().instr(asm.nop()).unwrap();
    assert!(matches!(builder.build(), Err(AssemblerError::Spec(_))));
}

#[test]
fn test_errors_display() {
    let err = AssemblerError::UndefinedLabel("loop".into());
    assert_eq!(err.to_string(), "Undefined label: loop");
    let err = AssemblerError::DuplicateWrap(3);
    assert_eq!(err.to_string(), "Wrap already set at 3");
}

// ============================================================================
// Property Tests
// ============================================================================

fn arb_shared_instruction() -> impl Strategy<Value = Instruction> {
    prop_oneof![
        (prop::sample::select(JmpCondition::ALL), 0u8..32)
            .prop_map(|(condition, address)| Instruction::Jmp { condition, address }),
        (any::<bool>(), 0u8..32)
            .prop_map(|(polarity, index)| Instruction::Wait {
                polarity,
                source: WaitSource::Gpio,
                index,
                mode: IrqIndexMode::Direct,
            }),
        (any::<bool>(), any::<bool>(), 0u8..8).prop_map(|(polarity, relative, index)| {
            let mode = if relative { IrqIndexMode::Relative } else { IrqIndexMode::Direct };
            Instruction::Wait { polarity, source: WaitSource::Irq, index, mode }
        }),
        (prop::sample::select(InSource::ALL), 1u8..=32)
            .prop_map(|(source, bit_count)| Instruction::In { source, bit_count }),
        (prop::sample::select(OutDestination::ALL), 1u8..=32)
            .prop_map(|(destination, bit_count)| Instruction::Out { destination, bit_count }),
        (any::<bool>(), any::<bool>())
            .prop_map(|(if_full, block)| Instruction::Push { if_full, block }),
        (any::<bool>(), any::<bool>())
            .prop_map(|(if_empty, block)| Instruction::Pull { if_empty, block }),
        (
            prop::sample::select(MovDestination::ALL),
            prop::sample::select(MovOperation::ALL),
            prop::sample::select(MovSource::ALL)
        )
            .prop_map(|(destination, op, source)| Instruction::Mov { destination, op, source }),
        (prop::sample::select(SetDestination::ALL), 0u8..32)
            .prop_map(|(destination, data)| Instruction::Set { destination, data }),
    ]
}

/// Side-set layouts that fit the 5-bit field
fn arb_side_set() -> impl Strategy<Value = SideSet> {
    (0u8..=5, any::<bool>(), any::<bool>()).prop_map(|(bits, optional, pindirs)| {
        SideSet::new(bits, optional && bits < 5, pindirs)
    })
}

proptest! {
    #[test]
    fn test_v0_and_v1_encode_shared_forms_alike(
        instr in arb_shared_instruction(),
        side_set in arb_side_set(),
        side in any::<u8>(),
        delay in any::<u8>()
    ) {
        prop_assume!(instr.check_version(PioVersion::V0).is_ok());
        let side = if side_set.bits > 0 { Some(side & side_set.max_value()) } else { None };
        let delay = delay % (side_set.max_delay() + 1);

        let mut expected = instr.encode();
        if let Some(value) = side {
            expected = side_set.apply(expected, value);
        }
        let expected = apply_delay(expected, delay, side_set.width());

        let v0 = AssemblerV0::new(side_set).instruction(instr).delay(delay);
        let v1 = AssemblerV1::new(side_set).instruction(instr).delay(delay);
        let (v0, v1) = match side {
            Some(value) => (v0.side(value), v1.side(value)),
            None => (v0, v1),
        };
        prop_assert_eq!(v0.encode(), expected);
        prop_assert_eq!(v1.encode(), expected);
    }
}
