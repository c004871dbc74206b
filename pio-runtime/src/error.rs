//! Runtime error types

use crate::state_machine::SmIndex;
use pio_spec::{ClockDivError, SpecError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PioError {
    #[error("Out of program space: no free range of {len} words")]
    OutOfProgramSpace { len: usize },

    #[error("Program space unavailable at offset {offset} for {len} words")]
    NoSpaceAtOffset { offset: u8, len: usize },

    #[error("State machine {0} already claimed")]
    StateMachineClaimed(SmIndex),

    #[error("No free state machine")]
    NoFreeStateMachine,

    #[error("DMA channel {0} already claimed")]
    DmaChannelClaimed(u8),

    #[error("No free DMA channel")]
    NoFreeDmaChannel,

    #[error("Timed out: {operation}")]
    Timeout { operation: &'static str },

    #[error(transparent)]
    ClockDiv(#[from] ClockDivError),

    #[error("Instruction set error: {0}")]
    Spec(#[from] SpecError),
}

impl PioError {
    /// Whether the caller can retry or work around the failure.
    ///
    /// Resource exhaustion, contention, timeouts and unrepresentable clock
    /// rates are recoverable. A malformed program is not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PioError::Spec(_))
    }
}

pub type Result<T> = std::result::Result<T, PioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_space_display() {
        let err = PioError::OutOfProgramSpace { len: 5 };
        assert_eq!(err.to_string(), "Out of program space: no free range of 5 words");
    }

    #[test]
    fn test_claimed_display() {
        let err = PioError::StateMachineClaimed(SmIndex::Sm2);
        assert_eq!(err.to_string(), "State machine 2 already claimed");
    }

    #[test]
    fn test_timeout_display() {
        let err = PioError::Timeout { operation: "put_blocking" };
        assert_eq!(err.to_string(), "Timed out: put_blocking");
    }

    #[test]
    fn test_from_conversions() {
        let err: PioError = ClockDivError::TooLarge.into();
        assert!(matches!(err, PioError::ClockDiv(ClockDivError::TooLarge)));
        assert!(err.is_recoverable());

        let err: PioError = SpecError::EmptyProgram.into();
        assert!(err.to_string().starts_with("Instruction set error"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_recoverable_variants() {
        let errors = vec![
            PioError::OutOfProgramSpace { len: 1 },
            PioError::NoSpaceAtOffset { offset: 0, len: 1 },
            PioError::StateMachineClaimed(SmIndex::Sm0),
            PioError::NoFreeStateMachine,
            PioError::DmaChannelClaimed(3),
            PioError::NoFreeDmaChannel,
            PioError::Timeout { operation: "dma" },
        ];
        for err in errors {
            assert!(err.is_recoverable(), "{} should be recoverable", err);
        }
    }
}
