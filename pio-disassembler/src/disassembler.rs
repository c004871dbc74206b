//! Main disassembler logic

use crate::decoder::decode;
use crate::error::Result;
use crate::formatter::format;
use pio_spec::{Origin, Program, SideSet};

/// Disassemble a program into an assembly listing.
///
/// Directives come first, then one line per word with its address and
/// encoding. Wrap marks are placed around the words they refer to. A word
/// that does not decode is listed with an inline error.
pub fn disassemble(program: &Program) -> Result<String> {
    program.side_set.validate()?;
    let mut output = String::new();

    output.push_str("; PIO Disassembly\n");
    output.push_str(&format!("; {}\n", program));
    if program.side_set.width() > 0 {
        output.push_str(&format!(".side_set {}", program.side_set.bits));
        if program.side_set.optional {
            output.push_str(" opt");
        }
        if program.side_set.pindirs {
            output.push_str(" pindirs");
        }
        output.push('\n');
    }
    if let Origin::Fixed(origin) = program.origin {
        output.push_str(&format!(".origin {}\n", origin));
    }
    output.push('\n');

    for (addr, &word) in program.code.iter().enumerate() {
        if addr == program.wrap.target as usize {
            output.push_str(".wrap_target\n");
        }
        output.push_str(&line(addr as u8, word, program.side_set));
        if addr == program.wrap.source as usize {
            output.push_str(".wrap\n");
        }
    }

    Ok(output)
}

/// Disassemble raw words without program metadata
pub fn disassemble_words(code: &[u16], side_set: SideSet) -> Result<String> {
    side_set.validate()?;
    Ok(code
        .iter()
        .enumerate()
        .map(|(addr, &word)| line(addr as u8, word, side_set))
        .collect())
}

fn line(addr: u8, word: u16, side_set: SideSet) -> String {
    let text = match decode(word, side_set) {
        Ok(decoded) => format(&decoded),
        Err(e) => format!("; ERROR: {}", e),
    };
    format!("{:>2}: 0x{:04X}  {}\n", addr, word, text)
}
