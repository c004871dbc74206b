//! PIO Assembler
//!
//! Build PIO instruction words and whole programs from Rust code.
//!
//! ## Example
//!
//! ```rust
//! use pio_assembler::{AssemblerV0, PioAssembler, ProgramBuilder};
//! use pio_spec::{OutDestination, SideSet};
//!
//! let side = SideSet::new(1, false, false);
//! let asm = AssemblerV0::new(side);
//!
//! let mut builder = ProgramBuilder::new(side);
//! builder
//!     .wrap_target().unwrap()
//!     .instr(asm.out(OutDestination::Pins, 1).side(0)).unwrap()
//!     .instr(asm.nop().side(1)).unwrap()
//!     .wrap().unwrap();
//!
//! let program = builder.build().unwrap();
//! assert_eq!(program.code, vec![0x6001, 0xB042]);
//! ```

pub mod error;
pub mod assembler;
pub mod builder;

pub use error::{AssemblerError, Result};
pub use assembler::{AssemblerV0, AssemblerV1, InstructionBuilder, PioAssembler, RxFifoIndex};
pub use builder::ProgramBuilder;
