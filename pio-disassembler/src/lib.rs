//! # PIO Disassembler
//!
//! Turn PIO instruction words back into pioasm-style text.
//!
//! The delay/side-set field of a word can only be split with the program's
//! side-set layout, so decoding always takes a [`pio_spec::SideSet`].
//!
//! ## Example
//!
//! ```rust
//! use pio_spec::Program;
//! use pio_disassembler::disassemble;
//!
//! let program = Program::from_words(vec![0xE081, 0x6001]);
//! let asm = disassemble(&program).unwrap();
//! assert!(asm.contains("set pindirs, 1"));
//! assert!(asm.contains("out pins, 1"));
//! ```

pub mod decoder;
pub mod disassembler;
pub mod error;
pub mod formatter;

pub use decoder::{decode, decode_all, Decoded};
pub use disassembler::{disassemble, disassemble_words};
pub use error::{DisassemblerError, Result};
pub use formatter::format;

#[cfg(test)]
mod tests {
    use super::*;
    use pio_spec::SideSet;

    #[test]
    fn test_decode_and_format() {
        let decoded = decode(0x5001, SideSet::new(1, false, false)).unwrap();
        assert_eq!(format(&decoded), "in pins, 1 side 1");
    }
}
