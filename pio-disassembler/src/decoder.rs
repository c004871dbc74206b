//! Instruction decoder
//!
//! Splits the delay/side-set field with the program's side-set layout and
//! decodes the operand part through the shared codec.

use crate::error::{DisassemblerError, Result};
use pio_spec::encoding::extract_delay;
use pio_spec::{Instruction, SideSet};

/// A decoded word: instruction plus its side-set and delay
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub instruction: Instruction,
    /// `None` without side-set pins, or when an optional side-set is not enabled
    pub side: Option<u8>,
    pub delay: u8,
}

/// Decode a 16-bit instruction word
pub fn decode(word: u16, side_set: SideSet) -> Result<Decoded> {
    side_set.validate()?;
    Ok(Decoded {
        instruction: Instruction::decode(word)?,
        side: side_set.extract(word),
        delay: extract_delay(word, side_set.width()),
    })
}

/// Decode a run of words, failing on the first invalid one with its address
pub fn decode_all(code: &[u16], side_set: SideSet) -> Result<Vec<Decoded>> {
    side_set.validate()?;
    code.iter()
        .enumerate()
        .map(|(address, &word)| {
            let instruction = Instruction::decode(word).map_err(|source| {
                DisassemblerError::InvalidInstruction { address: address as u8, source }
            })?;
            Ok(Decoded {
                instruction,
                side: side_set.extract(word),
                delay: extract_delay(word, side_set.width()),
            })
        })
        .collect()
}
