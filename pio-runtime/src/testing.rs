//! Register access recording
//!
//! [`RecordingPio`] wraps another backend and logs every access in order, so
//! tests can check the exact register sequence an operation produces.

use crate::regs::{PioRegisters, Register};
use crate::sim::SimulatedPio;

/// One register access and the value read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(Register, u32),
    Write(Register, u32),
}

/// Backend wrapper that records every access
#[derive(Debug, Clone)]
pub struct RecordingPio<R = SimulatedPio> {
    inner: R,
    accesses: Vec<Access>,
}

impl<R: PioRegisters> RecordingPio<R> {
    pub fn new(inner: R) -> Self {
        RecordingPio { inner, accesses: Vec::new() }
    }

    pub fn accesses(&self) -> &[Access] {
        &self.accesses
    }

    /// Values written to `reg`, oldest first
    pub fn writes_to(&self, reg: Register) -> impl Iterator<Item = u32> + '_ {
        self.accesses.iter().filter_map(move |access| match *access {
            Access::Write(r, value) if r == reg => Some(value),
            _ => None,
        })
    }

    /// Forget recorded accesses
    pub fn clear(&mut self) {
        self.accesses.clear();
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

impl Default for RecordingPio<SimulatedPio> {
    fn default() -> Self {
        Self::new(SimulatedPio::default())
    }
}

impl<R: PioRegisters> PioRegisters for RecordingPio<R> {
    fn read(&mut self, reg: Register) -> u32 {
        let value = self.inner.read(reg);
        self.accesses.push(Access::Read(reg, value));
        value
    }

    fn write(&mut self, reg: Register, value: u32) {
        self.accesses.push(Access::Write(reg, value));
        self.inner.write(reg, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::SmIndex;

    #[test]
    fn test_records_in_order() {
        let mut regs = RecordingPio::new(SimulatedPio::default());
        regs.write(Register::Txf(SmIndex::Sm0), 5);
        regs.set_bits(Register::Ctrl, 0b10);
        assert_eq!(
            regs.accesses(),
            &[
                Access::Write(Register::Txf(SmIndex::Sm0), 5),
                Access::Read(Register::Ctrl, 0),
                Access::Write(Register::Ctrl, 0b10),
            ]
        );
        assert_eq!(regs.writes_to(Register::Ctrl).collect::<Vec<_>>(), vec![0b10]);

        regs.clear();
        assert!(regs.accesses().is_empty());
        assert_eq!(regs.inner_mut().pop_tx(SmIndex::Sm0), Some(5));
    }
}
