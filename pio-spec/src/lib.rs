//! # PIO Instruction Set
//!
//! 16-bit instruction set of the programmable I/O block, plus the pure data the
//! control layer needs to drive it.
//!
//! ## Key Features
//! - Nine instruction kinds packed into 8 major opcodes (PUSH/PULL share one)
//! - 5-bit delay/side-set field split at a program-wide side-set width
//! - 32-word shared instruction memory, 4 state machines per block
//! - Fixed-point clock divider (16-bit integer, 8-bit fraction)
//! - State machine register images (CLKDIV, EXECCTRL, SHIFTCTRL, PINCTRL)
//! - Two hardware generations: [`PioVersion::V0`] and the extended [`PioVersion::V1`]

pub mod opcode;
pub mod operand;
pub mod encoding;
pub mod instruction;
pub mod clock;
pub mod config;
pub mod program;
pub mod error;

pub use opcode::Opcode;
pub use operand::{
    IrqIndexMode, InSource, JmpCondition, MovDestination, MovOperation, MovSource,
    OutDestination, SetDestination, WaitSource,
};
pub use instruction::Instruction;
pub use clock::{ClockDivError, ClockDivisor};
pub use config::{FifoJoin, MovStatus, StateMachineConfig};
pub use program::{LoadedProgram, Origin, Program, SideSet, Wrap};
pub use error::{Result, SpecError};

/// Number of words in a block's instruction memory
pub const INSTRUCTION_MEMORY_SIZE: usize = 32;

/// Number of state machines per block
pub const NUM_STATE_MACHINES: usize = 4;

/// Number of GPIOs a single block can address
pub const NUM_PINS: u8 = 32;

/// Instruction word
pub type Word = u16;

/// Hardware generation of the PIO block.
///
/// `V0` is the original block. `V1` adds the RX FIFO register file, `WAIT JMPPIN`,
/// `MOV PINDIRS`, IRQ flags of neighbouring blocks and a third block per chip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum PioVersion {
    #[default]
    V0,
    V1,
}

impl PioVersion {
    /// Decode the version field of DBG_CFGINFO (bits 31:28).
    pub fn from_cfginfo(cfginfo: u32) -> Self {
        match cfginfo >> 28 {
            0 => PioVersion::V0,
            _ => PioVersion::V1,
        }
    }

    /// Number of PIO blocks present on a chip of this generation.
    pub const fn block_count(self) -> u8 {
        match self {
            PioVersion::V0 => 2,
            PioVersion::V1 => 3,
        }
    }
}
