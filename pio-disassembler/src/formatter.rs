//! Instruction formatter
//!
//! Renders decoded words in pioasm syntax: the instruction, then
//! `side N` and `[delay]` when present.

use crate::decoder::Decoded;

/// Format a decoded instruction as assembly text
pub fn format(decoded: &Decoded) -> String {
    let mut text = decoded.instruction.to_string();
    if let Some(side) = decoded.side {
        text.push_str(&format!(" side {}", side));
    }
    if decoded.delay > 0 {
        text.push_str(&format!(" [{}]", decoded.delay));
    }
    text
}
