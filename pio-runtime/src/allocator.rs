//! # Program Allocator
//!
//! Tracks which of the 32 instruction-memory words are in use and writes
//! programs into them. Relocatable programs are placed top-down, first fit.
//! Loading relocates JMP targets by the load offset; clearing fills the range
//! with jumps to its own start so a state machine still running there traps
//! instead of executing stale code.

use crate::error::{PioError, Result};
use crate::regs::{PioRegisters, Register};
use pio_spec::encoding::trap;
use pio_spec::{Origin, Program, INSTRUCTION_MEMORY_SIZE};

/// Occupancy bitmap of one block's instruction memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramAllocator {
    used: u32,
}

/// Bits `offset..offset + len`
fn range_mask(offset: u8, len: usize) -> u32 {
    debug_assert!(offset as usize + len <= INSTRUCTION_MEMORY_SIZE);
    (((1u64 << len) - 1) << offset) as u32
}

impl ProgramAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// One bit per word, set when occupied
    pub fn used_mask(&self) -> u32 {
        self.used
    }

    /// Where `program` would be loaded, if anywhere
    pub fn find_offset(&self, program: &Program) -> Option<u8> {
        let len = program.len();
        if len == 0 || len > INSTRUCTION_MEMORY_SIZE {
            return None;
        }
        match program.origin {
            Origin::Fixed(origin) => self.can_add_at_offset(program, origin).then_some(origin),
            Origin::Relocatable => (0..=(INSTRUCTION_MEMORY_SIZE - len) as u8)
                .rev()
                .find(|&offset| self.used & range_mask(offset, len) == 0),
        }
    }

    /// Whether `program` fits at `offset`. A fixed-origin program fits only at
    /// its origin.
    pub fn can_add_at_offset(&self, program: &Program, offset: u8) -> bool {
        let len = program.len();
        if let Origin::Fixed(origin) = program.origin {
            if origin != offset {
                return false;
            }
        }
        len > 0
            && offset as usize + len <= INSTRUCTION_MEMORY_SIZE
            && self.used & range_mask(offset, len) == 0
    }

    /// Place `program` and return its offset
    pub fn add<R: PioRegisters>(&mut self, regs: &mut R, program: &Program) -> Result<u8> {
        program.validate()?;
        let offset = self
            .find_offset(program)
            .ok_or(PioError::OutOfProgramSpace { len: program.len() })?;
        self.add_at_offset(regs, program, offset)?;
        Ok(offset)
    }

    /// Write `program` at `offset`, relocating jumps
    pub fn add_at_offset<R: PioRegisters>(
        &mut self,
        regs: &mut R,
        program: &Program,
        offset: u8,
    ) -> Result<()> {
        program.validate()?;
        if !self.can_add_at_offset(program, offset) {
            return Err(PioError::NoSpaceAtOffset { offset, len: program.len() });
        }

        for (i, word) in program.relocated(offset).enumerate() {
            regs.write(Register::InstrMem(offset + i as u8), word as u32);
        }
        self.used |= range_mask(offset, program.len());

        tracing::debug!(offset, len = program.len(), "loaded program");
        Ok(())
    }

    /// Fill `offset..offset + len` with trap jumps and mark it free.
    ///
    /// # Panics
    ///
    /// If the range extends past the end of instruction memory.
    pub fn clear_section<R: PioRegisters>(&mut self, regs: &mut R, offset: u8, len: u8) {
        assert!(
            offset as usize + len as usize <= INSTRUCTION_MEMORY_SIZE,
            "invalid program bounds: {}+{}",
            offset,
            len
        );
        let word = trap(offset) as u32;
        for addr in offset..offset + len {
            regs.write(Register::InstrMem(addr), word);
        }
        self.used &= !range_mask(offset, len as usize);

        tracing::debug!(offset, len, "cleared program section");
    }
}
