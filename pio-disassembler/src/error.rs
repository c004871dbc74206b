//! Disassembler errors

use pio_spec::SpecError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisassemblerError {
    #[error("Invalid instruction at {address}: {source}")]
    InvalidInstruction { address: u8, source: SpecError },

    #[error(transparent)]
    Spec(#[from] SpecError),
}

pub type Result<T> = std::result::Result<T, DisassemblerError>;
