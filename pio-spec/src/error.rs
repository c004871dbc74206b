//! # Error Types for the PIO Instruction Set

use crate::PioVersion;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    // Instruction errors
    #[error("Invalid instruction encoding: {0:#06x}")]
    InvalidEncoding(u16),

    #[error("Reserved {field} value {value:#04x} in instruction {word:#06x}")]
    ReservedEncoding {
        word: u16,
        field: &'static str,
        value: u8,
    },

    #[error("{feature} requires PIO {required:?}, target is {actual:?}")]
    UnsupportedOnVersion {
        feature: &'static str,
        required: PioVersion,
        actual: PioVersion,
    },

    #[error("Side-set of {width} bits does not fit the 5-bit delay/side-set field")]
    InvalidSideSet { width: u8 },

    // Program errors
    #[error("Program is empty")]
    EmptyProgram,

    #[error("Program too long: {len} words (instruction memory holds {max})")]
    ProgramTooLong { len: usize, max: usize },

    #[error("Invalid wrap: target {target}, top {top} for a program of {len} words")]
    InvalidWrap { target: u8, top: u8, len: usize },

    #[error("Invalid origin {origin} for a program of {len} words")]
    InvalidOrigin { origin: u8, len: usize },

    #[error("Program image error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, SpecError>;
