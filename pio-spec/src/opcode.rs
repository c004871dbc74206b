//! # PIO Major Opcodes
//!
//! The top three bits of every instruction select one of eight major opcodes.
//! PUSH and PULL share major opcode `0b100` and are told apart by bit 7.
//!
//! ## Opcode Encoding
//!
//! ```text
//! 0b000  JMP
//! 0b001  WAIT
//! 0b010  IN
//! 0b011  OUT
//! 0b100  PUSH (bit 7 = 0) / PULL (bit 7 = 1), V1 MOV to/from RX FIFO (bit 4 = 1)
//! 0b101  MOV
//! 0b110  IRQ
//! 0b111  SET
//! ```

use serde::{Deserialize, Serialize};

/// Major opcode (3 bits, values 0-7)
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// JMP: conditional jump to an absolute address
    Jmp = 0b000,
    /// WAIT: stall until a GPIO, pin or IRQ flag reaches a polarity
    Wait = 0b001,
    /// IN: shift bits into the ISR
    In = 0b010,
    /// OUT: shift bits out of the OSR
    Out = 0b011,
    /// PUSH/PULL: move ISR to RX FIFO, or TX FIFO to OSR
    PushPull = 0b100,
    /// MOV: copy between sources and destinations
    Mov = 0b101,
    /// IRQ: set or clear an IRQ flag
    Irq = 0b110,
    /// SET: write an immediate to pins, pindirs or scratch registers
    Set = 0b111,
}

impl Opcode {
    /// Opcode width in bits
    pub const BITS: usize = 3;

    /// Opcode mask (0x7 for 3 bits)
    pub const MASK: u16 = 0x7;

    /// Opcode field position within the word
    pub const SHIFT: u16 = 13;

    /// Try to convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0b000 => Some(Opcode::Jmp),
            0b001 => Some(Opcode::Wait),
            0b010 => Some(Opcode::In),
            0b011 => Some(Opcode::Out),
            0b100 => Some(Opcode::PushPull),
            0b101 => Some(Opcode::Mov),
            0b110 => Some(Opcode::Irq),
            0b111 => Some(Opcode::Set),
            _ => None,
        }
    }

    /// Convert to u8
    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Extract the major opcode of an instruction word. Total over all words.
    #[inline]
    pub const fn of_word(word: u16) -> Self {
        match (word >> Self::SHIFT) & Self::MASK {
            0b000 => Opcode::Jmp,
            0b001 => Opcode::Wait,
            0b010 => Opcode::In,
            0b011 => Opcode::Out,
            0b100 => Opcode::PushPull,
            0b101 => Opcode::Mov,
            0b110 => Opcode::Irq,
            _ => Opcode::Set,
        }
    }

    /// Word bits contributed by this opcode
    #[inline]
    pub const fn bits(self) -> u16 {
        (self as u16) << Self::SHIFT
    }

    /// Get opcode mnemonic. PUSH/PULL reports `push`; see [`crate::Instruction::mnemonic`].
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Jmp => "jmp",
            Opcode::Wait => "wait",
            Opcode::In => "in",
            Opcode::Out => "out",
            Opcode::PushPull => "push",
            Opcode::Mov => "mov",
            Opcode::Irq => "irq",
            Opcode::Set => "set",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
