//! # Instruction Encoding Constants and Helpers
//!
//! Centralized field layout of the 16-bit PIO instruction word.
//!
//! ## Instruction Format (16-bit)
//!
//! ```text
//! [15:13] major opcode
//! [12:8]  delay / side-set (split at the program's side-set width)
//! [7:5]   arg1
//! [4:0]   arg2
//! ```
//!
//! The side-set occupies the top `width` bits of the 5-bit field and the delay
//! the remaining low bits. With an optional side-set, bit 12 is the enable flag
//! and counts towards `width`.

use crate::Opcode;

// ============================================================================
// Bit Position Constants
// ============================================================================

/// Opcode field: bits 13-15 (3 bits)
pub const OPCODE_SHIFT: u16 = 13;

/// Delay/side-set field: bits 8-12 (5 bits)
pub const DELAY_SIDE_SET_SHIFT: u16 = 8;

/// First operand: bits 5-7 (3 bits)
pub const ARG1_SHIFT: u16 = 5;

/// Second operand: bits 0-4 (5 bits)
pub const ARG2_SHIFT: u16 = 0;

/// Top of the delay/side-set field plus one
pub const SIDE_SET_TOP: u16 = 13;

/// Enable flag of an optional side-set (top bit of the delay/side-set field)
pub const SIDE_SET_ENABLE_BIT: u16 = 1 << 12;

// ============================================================================
// Field Masks
// ============================================================================

/// Delay/side-set field mask (5 bits, unshifted)
pub const DELAY_SIDE_SET_MASK: u16 = 0x1F;

/// arg1 mask (3 bits, unshifted)
pub const ARG1_MASK: u16 = 0x7;

/// arg2 mask (5 bits, unshifted)
pub const ARG2_MASK: u16 = 0x1F;

/// JMP target address (arg2)
pub const JMP_ADDRESS_MASK: u16 = 0x1F;

/// Widest side-set, enable bit included
pub const MAX_SIDE_SET_WIDTH: u8 = 5;

/// Canonical no-op: `mov y, y`
pub const NOP: u16 = 0xA042;

// ============================================================================
// Field Extraction Functions
// ============================================================================

/// Extract the major opcode (bits 13-15)
#[inline]
pub const fn extract_opcode(word: u16) -> Opcode {
    Opcode::of_word(word)
}

/// Extract the raw delay/side-set field (bits 8-12)
#[inline]
pub const fn extract_delay_side_set(word: u16) -> u8 {
    ((word >> DELAY_SIDE_SET_SHIFT) & DELAY_SIDE_SET_MASK) as u8
}

/// Extract arg1 (bits 5-7)
#[inline]
pub const fn extract_arg1(word: u16) -> u8 {
    ((word >> ARG1_SHIFT) & ARG1_MASK) as u8
}

/// Extract arg2 (bits 0-4)
#[inline]
pub const fn extract_arg2(word: u16) -> u8 {
    ((word >> ARG2_SHIFT) & ARG2_MASK) as u8
}

// ============================================================================
// Encoding Functions
// ============================================================================

/// Pack an instruction word. Every field is masked to its width; bounding the
/// operands is left to the caller.
#[inline]
pub const fn encode_raw(opcode: Opcode, delay_side_set: u8, arg1: u8, arg2: u8) -> u16 {
    opcode.bits()
        | ((delay_side_set as u16 & DELAY_SIDE_SET_MASK) << DELAY_SIDE_SET_SHIFT)
        | ((arg1 as u16 & ARG1_MASK) << ARG1_SHIFT)
        | ((arg2 as u16 & ARG2_MASK) << ARG2_SHIFT)
}

/// Word bits taken by a side-set of `width` bits (enable bit included).
#[inline]
pub const fn side_set_mask(width: u8) -> u16 {
    if width == 0 {
        return 0;
    }
    let width = if width > MAX_SIDE_SET_WIDTH { MAX_SIDE_SET_WIDTH } else { width };
    ((1u16 << width) - 1) << (SIDE_SET_TOP - width as u16)
}

/// Word bits left for the delay when `width` bits go to side-set.
#[inline]
pub const fn delay_mask(width: u8) -> u16 {
    (DELAY_SIDE_SET_MASK << DELAY_SIDE_SET_SHIFT) & !side_set_mask(width)
}

/// Largest delay that fits next to a side-set of `width` bits.
#[inline]
pub const fn max_delay(width: u8) -> u8 {
    (delay_mask(width) >> DELAY_SIDE_SET_SHIFT) as u8
}

/// Replace the side-set sub-field with `value`, left-aligned at bit 12.
///
/// `value` already includes the enable bit when the side-set is optional.
#[inline]
pub const fn apply_side_set(word: u16, value: u8, width: u8) -> u16 {
    let mask = side_set_mask(width);
    if mask == 0 {
        return word;
    }
    (word & !mask) | (((value as u16) << (SIDE_SET_TOP - width as u16)) & mask)
}

/// Replace the delay sub-field with `delay`.
#[inline]
pub const fn apply_delay(word: u16, delay: u8, width: u8) -> u16 {
    let mask = delay_mask(width);
    (word & !mask) | (((delay as u16) << DELAY_SIDE_SET_SHIFT) & mask)
}

/// Extract the delay of `word` given the side-set width.
#[inline]
pub const fn extract_delay(word: u16, width: u8) -> u8 {
    ((word & delay_mask(width)) >> DELAY_SIDE_SET_SHIFT) as u8
}

/// Extract the raw side-set sub-field (enable bit included) of `word`.
#[inline]
pub const fn extract_side_set(word: u16, width: u8) -> u8 {
    let mask = side_set_mask(width);
    if mask == 0 {
        return 0;
    }
    ((word & mask) >> (SIDE_SET_TOP - width as u16)) as u8
}

// ============================================================================
// Program Memory Helpers
// ============================================================================

/// Shift a JMP target by `offset`, wrapping within the 32-word memory.
/// Words of every other opcode pass through untouched.
#[inline]
pub const fn relocate_jump(word: u16, offset: u8) -> u16 {
    match Opcode::of_word(word) {
        Opcode::Jmp => {
            let target = (word & JMP_ADDRESS_MASK).wrapping_add(offset as u16) & JMP_ADDRESS_MASK;
            (word & !JMP_ADDRESS_MASK) | target
        }
        _ => word,
    }
}

/// Unconditional jump to itself, written over freed program memory.
#[inline]
pub const fn trap(offset: u8) -> u16 {
    encode_raw(Opcode::Jmp, 0, 0, offset)
}
