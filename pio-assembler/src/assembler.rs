//! Fluent instruction assembler
//!
//! One method per instruction kind returns an [`InstructionBuilder`], a `Copy`
//! value that collects side-set and delay before producing the final word:
//!
//! ```rust
//! use pio_assembler::{AssemblerV0, PioAssembler};
//! use pio_spec::{JmpCondition, SideSet};
//!
//! let asm = AssemblerV0::new(SideSet::new(1, false, false));
//! assert_eq!(asm.jmp(JmpCondition::XDecNonZero, 0).side(1).encode(), 0x1040);
//! ```
//!
//! Operands, side-set values and delays outside their fields are contract
//! violations and panic. So does using a V1-only form through [`AssemblerV0`].

use pio_spec::encoding::MAX_SIDE_SET_WIDTH;
use pio_spec::{
    InSource, Instruction, IrqIndexMode, JmpCondition, MovDestination, MovOperation, MovSource,
    OutDestination, PioVersion, SetDestination, SideSet, WaitSource, INSTRUCTION_MEMORY_SIZE,
};

// ============================================================================
// InstructionBuilder
// ============================================================================

/// An instruction plus the side-set and delay to encode with it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstructionBuilder {
    instruction: Instruction,
    side_set: SideSet,
    side: Option<u8>,
    delay: u8,
}

impl InstructionBuilder {
    pub fn new(instruction: Instruction, side_set: SideSet) -> Self {
        check_side_set(side_set);
        InstructionBuilder { instruction, side_set, side: None, delay: 0 }
    }

    /// Drive the side-set pins to `value` when this instruction starts
    pub fn side(self, value: u8) -> Self {
        assert!(self.side_set.bits > 0, "side-set used by a program without side-set pins");
        assert!(
            value <= self.side_set.max_value(),
            "side-set value {} exceeds {} bits",
            value,
            self.side_set.bits
        );
        InstructionBuilder { side: Some(value), ..self }
    }

    /// Stall for `cycles` extra cycles after this instruction
    pub fn delay(self, cycles: u8) -> Self {
        assert!(
            cycles <= self.side_set.max_delay(),
            "delay {} exceeds maximum {} for side-set width {}",
            cycles,
            self.side_set.max_delay(),
            self.side_set.width()
        );
        InstructionBuilder { delay: cycles, ..self }
    }

    pub fn instruction(&self) -> Instruction {
        self.instruction
    }

    pub fn side_set(&self) -> SideSet {
        self.side_set
    }

    pub fn side_value(&self) -> Option<u8> {
        self.side
    }

    pub fn delay_cycles(&self) -> u8 {
        self.delay
    }

    /// Final 16-bit word. A non-optional side-set that was never given encodes as 0.
    pub fn encode(self) -> u16 {
        let width = self.side_set.width();
        let mut word = self.instruction.encode();
        if let Some(value) = self.side {
            word = self.side_set.apply(word, value);
        }
        pio_spec::encoding::apply_delay(word, self.delay, width)
    }
}

impl From<InstructionBuilder> for u16 {
    fn from(builder: InstructionBuilder) -> u16 {
        builder.encode()
    }
}

// ============================================================================
// Shared instruction set
// ============================================================================

/// Instruction methods common to both generations
pub trait PioAssembler {
    fn side_set(&self) -> SideSet;

    fn version(&self) -> PioVersion;

    /// Wrap an already-built instruction, rejecting forms this generation lacks
    fn instruction(&self, instruction: Instruction) -> InstructionBuilder {
        if let Err(e) = instruction.check_version(self.version()) {
            panic!("{}", e);
        }
        InstructionBuilder::new(instruction, self.side_set())
    }

    fn jmp(&self, condition: JmpCondition, address: u8) -> InstructionBuilder {
        assert!(
            (address as usize) < INSTRUCTION_MEMORY_SIZE,
            "jmp address {} out of range",
            address
        );
        self.instruction(Instruction::Jmp { condition, address })
    }

    fn wait_gpio(&self, polarity: bool, pin: u8) -> InstructionBuilder {
        check_index(pin, 32, "gpio");
        self.instruction(Instruction::Wait {
            polarity,
            source: WaitSource::Gpio,
            index: pin,
            mode: IrqIndexMode::Direct,
        })
    }

    /// Wait on a pin numbered relative to the IN pin base
    fn wait_pin(&self, polarity: bool, pin: u8) -> InstructionBuilder {
        check_index(pin, 32, "pin");
        self.instruction(Instruction::Wait {
            polarity,
            source: WaitSource::Pin,
            index: pin,
            mode: IrqIndexMode::Direct,
        })
    }

    fn wait_irq(&self, polarity: bool, relative: bool, index: u8) -> InstructionBuilder {
        check_index(index, 8, "irq");
        self.instruction(Instruction::Wait {
            polarity,
            source: WaitSource::Irq,
            index,
            mode: relative_mode(relative),
        })
    }

    fn in_(&self, source: InSource, bit_count: u8) -> InstructionBuilder {
        check_bit_count(bit_count);
        self.instruction(Instruction::In { source, bit_count })
    }

    fn out(&self, destination: OutDestination, bit_count: u8) -> InstructionBuilder {
        check_bit_count(bit_count);
        self.instruction(Instruction::Out { destination, bit_count })
    }

    fn push(&self, if_full: bool, block: bool) -> InstructionBuilder {
        self.instruction(Instruction::Push { if_full, block })
    }

    fn pull(&self, if_empty: bool, block: bool) -> InstructionBuilder {
        self.instruction(Instruction::Pull { if_empty, block })
    }

    fn mov(&self, destination: MovDestination, source: MovSource) -> InstructionBuilder {
        self.instruction(Instruction::Mov { destination, op: MovOperation::None, source })
    }

    fn mov_invert(&self, destination: MovDestination, source: MovSource) -> InstructionBuilder {
        self.instruction(Instruction::Mov { destination, op: MovOperation::Invert, source })
    }

    fn mov_reverse(&self, destination: MovDestination, source: MovSource) -> InstructionBuilder {
        self.instruction(Instruction::Mov { destination, op: MovOperation::BitReverse, source })
    }

    fn irq_set(&self, relative: bool, index: u8) -> InstructionBuilder {
        check_index(index, 8, "irq");
        self.instruction(Instruction::Irq {
            clear: false,
            wait: false,
            index,
            mode: relative_mode(relative),
        })
    }

    /// Set the flag, then stall until something clears it
    fn irq_wait(&self, relative: bool, index: u8) -> InstructionBuilder {
        check_index(index, 8, "irq");
        self.instruction(Instruction::Irq {
            clear: false,
            wait: true,
            index,
            mode: relative_mode(relative),
        })
    }

    fn irq_clear(&self, relative: bool, index: u8) -> InstructionBuilder {
        check_index(index, 8, "irq");
        self.instruction(Instruction::Irq {
            clear: true,
            wait: false,
            index,
            mode: relative_mode(relative),
        })
    }

    fn set(&self, destination: SetDestination, value: u8) -> InstructionBuilder {
        check_index(value, 32, "set value");
        self.instruction(Instruction::Set { destination, data: value })
    }

    /// `mov y, y`
    fn nop(&self) -> InstructionBuilder {
        self.instruction(Instruction::NOP)
    }
}

fn relative_mode(relative: bool) -> IrqIndexMode {
    if relative {
        IrqIndexMode::Relative
    } else {
        IrqIndexMode::Direct
    }
}

fn check_index(index: u8, limit: u8, what: &str) {
    assert!(index < limit, "{} index {} out of range 0..{}", what, index, limit);
}

fn check_side_set(side_set: SideSet) {
    assert!(
        side_set.width() <= MAX_SIDE_SET_WIDTH,
        "side-set width {} exceeds {}",
        side_set.width(),
        MAX_SIDE_SET_WIDTH
    );
}

fn check_bit_count(bit_count: u8) {
    assert!(
        (1..=32).contains(&bit_count),
        "bit count {} outside 1..=32",
        bit_count
    );
}

// ============================================================================
// Generations
// ============================================================================

/// Assembler for the first-generation instruction set
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssemblerV0 {
    pub side_set: SideSet,
}

impl AssemblerV0 {
    /// # Panics
    ///
    /// If the side-set with its enable bit is wider than 5 bits.
    pub fn new(side_set: SideSet) -> Self {
        check_side_set(side_set);
        AssemblerV0 { side_set }
    }
}

impl PioAssembler for AssemblerV0 {
    fn side_set(&self) -> SideSet {
        self.side_set
    }

    fn version(&self) -> PioVersion {
        PioVersion::V0
    }
}

/// RX FIFO entry addressed by `mov rxfifo[..]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RxFifoIndex {
    /// Entry selected by scratch Y at run time
    Y,
    /// Fixed entry 0-3
    Immediate(u8),
}

impl RxFifoIndex {
    fn split(self) -> (bool, u8) {
        match self {
            RxFifoIndex::Y => (false, 0),
            RxFifoIndex::Immediate(index) => {
                check_index(index, 4, "rx fifo");
                (true, index)
            }
        }
    }
}

/// Assembler for the extended instruction set. Bit-compatible with
/// [`AssemblerV0`] for every shared form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssemblerV1 {
    pub side_set: SideSet,
}

impl AssemblerV1 {
    /// # Panics
    ///
    /// If the side-set with its enable bit is wider than 5 bits.
    pub fn new(side_set: SideSet) -> Self {
        check_side_set(side_set);
        AssemblerV1 { side_set }
    }

    /// Wait on the JMP pin plus `offset` (0-3)
    pub fn wait_jmp_pin(&self, polarity: bool, offset: u8) -> InstructionBuilder {
        check_index(offset, 4, "jmppin offset");
        self.instruction(Instruction::Wait {
            polarity,
            source: WaitSource::JmpPin,
            index: offset,
            mode: IrqIndexMode::Direct,
        })
    }

    /// Wait on an IRQ flag of this block, a relative flag, or a neighbouring block
    pub fn wait_irq_mode(&self, polarity: bool, mode: IrqIndexMode, index: u8) -> InstructionBuilder {
        check_index(index, 8, "irq");
        self.instruction(Instruction::Wait { polarity, source: WaitSource::Irq, index, mode })
    }

    /// IRQ with an explicit index mode, including the neighbouring blocks
    pub fn irq_mode(&self, clear: bool, wait: bool, mode: IrqIndexMode, index: u8) -> InstructionBuilder {
        check_index(index, 8, "irq");
        self.instruction(Instruction::Irq { clear, wait, index, mode })
    }

    /// `mov rxfifo[index], isr`
    pub fn mov_to_rx(&self, index: RxFifoIndex) -> InstructionBuilder {
        let (index_by_immediate, index) = index.split();
        self.instruction(Instruction::MovToRx { index_by_immediate, index })
    }

    /// `mov osr, rxfifo[index]`
    pub fn mov_from_rx(&self, index: RxFifoIndex) -> InstructionBuilder {
        let (index_by_immediate, index) = index.split();
        self.instruction(Instruction::MovFromRx { index_by_immediate, index })
    }
}

impl PioAssembler for AssemblerV1 {
    fn side_set(&self) -> SideSet {
        self.side_set
    }

    fn version(&self) -> PioVersion {
        PioVersion::V1
    }
}
