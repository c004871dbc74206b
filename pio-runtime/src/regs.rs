//! # Register Seam
//!
//! The PIO register block is reached only through [`PioRegisters`]: one method
//! reads a named register, one writes it. Hardware backends map [`Register`]
//! to memory-mapped addresses with [`Register::offset`]; host backends keep an
//! in-memory register file (see [`crate::sim::SimulatedPio`]).
//!
//! Reads take `&mut self` because some registers have read side effects
//! (reading an RX FIFO pops it).

use crate::state_machine::SmIndex;

// ============================================================================
// Register Names
// ============================================================================

/// A register of one PIO block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Ctrl,
    Fstat,
    Fdebug,
    Flevel,
    Txf(SmIndex),
    Rxf(SmIndex),
    Irq,
    IrqForce,
    InputSyncBypass,
    DbgPadout,
    DbgPadoe,
    DbgCfginfo,
    InstrMem(u8),
    SmClkdiv(SmIndex),
    SmExecctrl(SmIndex),
    SmShiftctrl(SmIndex),
    SmAddr(SmIndex),
    SmInstr(SmIndex),
    SmPinctrl(SmIndex),
    /// V1: direct access to RX FIFO entry `index` of a state machine
    RxfPutGet { sm: SmIndex, index: u8 },
    /// V1
    GpioBase,
}

impl Register {
    /// Byte offset from the block's base address
    pub const fn offset(self) -> u32 {
        const SM_STRIDE: u32 = 0x18;
        match self {
            Register::Ctrl => 0x000,
            Register::Fstat => 0x004,
            Register::Fdebug => 0x008,
            Register::Flevel => 0x00C,
            Register::Txf(sm) => 0x010 + 4 * sm.as_u8() as u32,
            Register::Rxf(sm) => 0x020 + 4 * sm.as_u8() as u32,
            Register::Irq => 0x030,
            Register::IrqForce => 0x034,
            Register::InputSyncBypass => 0x038,
            Register::DbgPadout => 0x03C,
            Register::DbgPadoe => 0x040,
            Register::DbgCfginfo => 0x044,
            Register::InstrMem(addr) => 0x048 + 4 * addr as u32,
            Register::SmClkdiv(sm) => 0x0C8 + SM_STRIDE * sm.as_u8() as u32,
            Register::SmExecctrl(sm) => 0x0CC + SM_STRIDE * sm.as_u8() as u32,
            Register::SmShiftctrl(sm) => 0x0D0 + SM_STRIDE * sm.as_u8() as u32,
            Register::SmAddr(sm) => 0x0D4 + SM_STRIDE * sm.as_u8() as u32,
            Register::SmInstr(sm) => 0x0D8 + SM_STRIDE * sm.as_u8() as u32,
            Register::SmPinctrl(sm) => 0x0DC + SM_STRIDE * sm.as_u8() as u32,
            Register::RxfPutGet { sm, index } => 0x128 + 0x10 * sm.as_u8() as u32 + 4 * index as u32,
            Register::GpioBase => 0x168,
        }
    }
}

// ============================================================================
// Register Access
// ============================================================================

/// Access to one PIO block's registers
pub trait PioRegisters {
    fn read(&mut self, reg: Register) -> u32;

    fn write(&mut self, reg: Register, value: u32);

    fn set_bits(&mut self, reg: Register, bits: u32) {
        let value = self.read(reg);
        self.write(reg, value | bits);
    }

    fn clear_bits(&mut self, reg: Register, bits: u32) {
        let value = self.read(reg);
        self.write(reg, value & !bits);
    }

    fn xor_bits(&mut self, reg: Register, bits: u32) {
        let value = self.read(reg);
        self.write(reg, value ^ bits);
    }

    /// Replace the bits under `mask` with the same bits of `value`
    fn write_masked(&mut self, reg: Register, value: u32, mask: u32) {
        let old = self.read(reg);
        self.write(reg, (old & !mask) | (value & mask));
    }
}

impl<R: PioRegisters + ?Sized> PioRegisters for &mut R {
    fn read(&mut self, reg: Register) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Register, value: u32) {
        (**self).write(reg, value)
    }
}

// ============================================================================
// Block Register Fields
// ============================================================================

/// CTRL bit fields
pub mod ctrl {
    pub const SM_ENABLE_SHIFT: u32 = 0;
    pub const SM_ENABLE_MASK: u32 = 0xF;
    pub const SM_RESTART_SHIFT: u32 = 4;
    pub const CLKDIV_RESTART_SHIFT: u32 = 8;
    /// V1
    pub const PREV_PIO_MASK_SHIFT: u32 = 16;
    /// V1
    pub const PREV_PIO_MASK: u32 = 0xF << PREV_PIO_MASK_SHIFT;
    /// V1
    pub const NEXT_PIO_MASK_SHIFT: u32 = 20;
    /// V1
    pub const NEXT_PIO_MASK: u32 = 0xF << NEXT_PIO_MASK_SHIFT;
}

/// FSTAT bit fields, one bit per state machine
pub mod fstat {
    pub const RXFULL_SHIFT: u32 = 0;
    pub const RXEMPTY_SHIFT: u32 = 8;
    pub const TXFULL_SHIFT: u32 = 16;
    pub const TXEMPTY_SHIFT: u32 = 24;
}

/// FDEBUG sticky flags, one bit per state machine, write 1 to clear
pub mod fdebug {
    pub const RXSTALL_SHIFT: u32 = 0;
    pub const RXUNDER_SHIFT: u32 = 8;
    pub const TXOVER_SHIFT: u32 = 16;
    pub const TXSTALL_SHIFT: u32 = 24;

    /// All four flags of state machine 0
    pub const SM0_ALL: u32 =
        1 << TXOVER_SHIFT | 1 << RXUNDER_SHIFT | 1 << TXSTALL_SHIFT | 1 << RXSTALL_SHIFT;
}

/// FLEVEL: 4-bit TX and RX levels, one byte per state machine
pub mod flevel {
    pub const SM_STRIDE: u32 = 8;
    pub const TX_SHIFT: u32 = 0;
    pub const RX_SHIFT: u32 = 4;
    pub const LEVEL_MASK: u32 = 0xF;
}

/// DBG_CFGINFO fields
pub mod cfginfo {
    pub const VERSION_SHIFT: u32 = 28;
    pub const IMEM_SIZE_SHIFT: u32 = 16;
    pub const SM_COUNT_SHIFT: u32 = 8;
    pub const FIFO_DEPTH_SHIFT: u32 = 0;
}
