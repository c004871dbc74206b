//! Assembler errors

use pio_spec::{SideSet, SpecError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("Side-set mismatch: program uses {expected:?}, instruction built with {found:?}")]
    SideSetMismatch { expected: SideSet, found: SideSet },

    #[error("Wrap target already set at {0}")]
    DuplicateWrapTarget(u8),

    #[error("Wrap already set at {0}")]
    DuplicateWrap(u8),

    #[error("Wrap marked before any instruction")]
    WrapWithoutInstruction,

    #[error("Program has no instructions")]
    EmptyProgram,

    #[error("Duplicate label: {0}")]
    DuplicateLabel(String),

    #[error("Undefined label: {0}")]
    UndefinedLabel(String),

    #[error("Label {label} at {address} is past the end of a {len}-word program")]
    LabelOutOfRange { label: String, address: u8, len: usize },

    #[error("Label target needs a jmp, got {0}")]
    NotAJump(&'static str),
}

pub type Result<T> = std::result::Result<T, AssemblerError>;
