//! # PIO Runtime
//!
//! Control core for PIO blocks: instruction-memory allocation, state machine
//! claiming, configuration and lifecycle, FIFO access, pin bootstrap and DMA
//! transfers into and out of the FIFOs.
//!
//! Hardware is reached only through the [`PioRegisters`] and [`DmaRegisters`]
//! traits. [`sim::SimulatedPio`] and [`sim::SimulatedDma`] implement them in
//! memory for host-side use.
//!
//! ## Example
//!
//! ```rust
//! use pio_runtime::{PioBlock, SimulatedPio, SmIndex};
//! use pio_spec::{PioVersion, Program};
//!
//! let mut pio = PioBlock::new(SimulatedPio::default(), 0, PioVersion::V0);
//! let loaded = pio.load(&Program::from_words(vec![0xE081, 0x6001, 0x0001])).unwrap();
//!
//! let config = loaded.default_config().set_out_pins(0, 1);
//! let mut sm = pio.claim_state_machine().unwrap();
//! sm.init(loaded.entry(), config);
//! sm.set_enabled(true);
//! sm.put(0xFFFF_0000);
//!
//! assert_eq!(sm.index(), SmIndex::Sm0);
//! assert_eq!(sm.pc(), loaded.entry());
//! assert_eq!(sm.tx_level(), 1);
//! ```

pub mod allocator;
pub mod block;
pub mod dma;
pub mod error;
pub mod fifo;
pub mod regs;
pub mod sim;
pub mod state_machine;
pub mod testing;

pub use allocator::ProgramAllocator;
pub use block::{BlockIndex, PioBlock};
pub use dma::{DataSize, DmaArbiter, DmaChannelConfig, DmaRegister, DmaRegisters, Dreq};
pub use error::{PioError, Result};
pub use fifo::BlockingConfig;
pub use regs::{PioRegisters, Register};
pub use sim::{DmaTransfer, SimulatedDma, SimulatedPio};
pub use state_machine::{SmIndex, StateMachine};
