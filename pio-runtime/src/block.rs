//! # PIO Block
//!
//! One PIO block: its register seam, the instruction-memory allocator and the
//! state-machine claim mask. All mutation goes through `&mut self`; sharing a
//! block across threads needs an external lock.

use crate::allocator::ProgramAllocator;
use crate::error::{PioError, Result};
use crate::regs::{ctrl, PioRegisters, Register};
use crate::state_machine::{SmIndex, StateMachine};
use pio_spec::{LoadedProgram, PioVersion, Program};
use std::fmt;

/// Which PIO block of the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockIndex {
    Pio0,
    Pio1,
    /// V1 only
    Pio2,
}

impl BlockIndex {
    /// # Panics
    ///
    /// If the chip generation has no block `index`.
    pub fn new(index: u8, version: PioVersion) -> Self {
        assert!(
            index < version.block_count(),
            "invalid PIO block {} for {:?}",
            index,
            version
        );
        match index {
            0 => BlockIndex::Pio0,
            1 => BlockIndex::Pio1,
            _ => BlockIndex::Pio2,
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Bus address of the block's register file
    pub const fn base_address(self) -> u32 {
        match self {
            BlockIndex::Pio0 => 0x5020_0000,
            BlockIndex::Pio1 => 0x5030_0000,
            BlockIndex::Pio2 => 0x5040_0000,
        }
    }
}

impl fmt::Display for BlockIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PIO{}", self.as_u8())
    }
}

/// A PIO block and the bookkeeping that goes with it
#[derive(Debug)]
pub struct PioBlock<R: PioRegisters> {
    pub(crate) regs: R,
    index: BlockIndex,
    version: PioVersion,
    allocator: ProgramAllocator,
    pub(crate) claimed: u8,
}

impl<R: PioRegisters> PioBlock<R> {
    /// # Panics
    ///
    /// If `index` does not exist on a chip of `version`.
    pub fn new(regs: R, index: u8, version: PioVersion) -> Self {
        PioBlock {
            regs,
            index: BlockIndex::new(index, version),
            version,
            allocator: ProgramAllocator::new(),
            claimed: 0,
        }
    }

    /// Build a block whose generation is read from DBG_CFGINFO
    pub fn from_hardware(mut regs: R, index: u8) -> Self {
        let version = PioVersion::from_cfginfo(regs.read(Register::DbgCfginfo));
        Self::new(regs, index, version)
    }

    pub fn index(&self) -> BlockIndex {
        self.index
    }

    pub fn version(&self) -> PioVersion {
        self.version
    }

    /// Generation reported by the hardware itself
    pub fn hardware_version(&mut self) -> PioVersion {
        PioVersion::from_cfginfo(self.regs.read(Register::DbgCfginfo))
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn into_registers(self) -> R {
        self.regs
    }

    // ========================================================================
    // Instruction Memory
    // ========================================================================

    /// Load `program` and return its offset
    pub fn add_program(&mut self, program: &Program) -> Result<u8> {
        program.check_version(self.version)?;
        self.allocator.add(&mut self.regs, program)
    }

    /// Load `program` and keep it together with its offset
    pub fn load(&mut self, program: &Program) -> Result<LoadedProgram> {
        let offset = self.add_program(program)?;
        Ok(LoadedProgram::new(program.clone(), offset, self.version))
    }

    pub fn add_program_at_offset(&mut self, program: &Program, offset: u8) -> Result<()> {
        program.check_version(self.version)?;
        self.allocator.add_at_offset(&mut self.regs, program, offset)
    }

    pub fn can_add_program_at_offset(&self, program: &Program, offset: u8) -> bool {
        self.allocator.can_add_at_offset(program, offset)
    }

    /// Trap-fill and free a range of instruction memory. Use `(0, 32)` to
    /// clear everything.
    ///
    /// # Panics
    ///
    /// If `offset + len > 32`.
    pub fn clear_program_section(&mut self, offset: u8, len: u8) {
        self.allocator.clear_section(&mut self.regs, offset, len);
    }

    /// Free the words a loaded program occupies
    pub fn remove_program(&mut self, loaded: &LoadedProgram) {
        self.clear_program_section(loaded.offset, loaded.len() as u8);
    }

    pub fn used_instruction_mask(&self) -> u32 {
        self.allocator.used_mask()
    }

    // ========================================================================
    // State Machines
    // ========================================================================

    pub fn state_machine(&mut self, index: SmIndex) -> StateMachine<'_, R> {
        StateMachine::new(self, index)
    }

    /// Claim the lowest-numbered free state machine
    pub fn claim_state_machine(&mut self) -> Result<StateMachine<'_, R>> {
        let index = SmIndex::ALL
            .into_iter()
            .find(|sm| self.claimed & sm.mask() == 0)
            .ok_or(PioError::NoFreeStateMachine)?;
        let mut sm = self.state_machine(index);
        sm.claim()?;
        Ok(sm)
    }

    /// Bitmask of claimed state machines
    pub fn claimed_mask(&self) -> u8 {
        self.claimed
    }

    /// Enable or disable several state machines in one write
    pub fn set_enabled_mask(&mut self, mask: u8, enabled: bool) {
        let bits = (mask as u32 & ctrl::SM_ENABLE_MASK) << ctrl::SM_ENABLE_SHIFT;
        if enabled {
            self.regs.set_bits(Register::Ctrl, bits);
        } else {
            self.regs.clear_bits(Register::Ctrl, bits);
        }
    }

    // ========================================================================
    // Block Registers
    // ========================================================================

    /// The eight state-machine IRQ flags
    pub fn irq(&mut self) -> u8 {
        self.regs.read(Register::Irq) as u8
    }

    /// Clear the IRQ flags set in `mask`
    pub fn clear_irq(&mut self, mask: u8) {
        self.regs.write(Register::Irq, mask as u32);
    }

    /// Bypass the input synchronizer for the pins in `pins` where the
    /// corresponding `bypass` bit is set
    pub fn set_input_sync_bypass_masked(&mut self, bypass: u32, pins: u32) {
        self.regs.write_masked(Register::InputSyncBypass, bypass, pins);
    }

    /// Output levels the block currently drives
    pub fn gpio_states(&mut self) -> u32 {
        self.regs.read(Register::DbgPadout)
    }

    /// Output enables the block currently drives
    pub fn gpio_directions(&mut self) -> u32 {
        self.regs.read(Register::DbgPadoe)
    }

    /// Select which GPIO the block sees as pin 0 (V1).
    ///
    /// # Panics
    ///
    /// On a V0 block, or if `base` is not 0 or 16.
    pub fn set_gpio_base(&mut self, base: u8) {
        self.require_v1("GPIO base");
        assert!(base == 0 || base == 16, "invalid GPIO base {}", base);
        self.regs.write(Register::GpioBase, base as u32);
    }

    /// State machines of the next block that follow this block's enable and
    /// clock-divider restart writes (V1)
    pub fn set_next_pio_mask(&mut self, mask: u8) {
        self.require_v1("next PIO mask");
        self.regs
            .write_masked(Register::Ctrl, (mask as u32) << ctrl::NEXT_PIO_MASK_SHIFT, ctrl::NEXT_PIO_MASK);
    }

    /// State machines of the previous block that follow this block's enable
    /// and clock-divider restart writes (V1)
    pub fn set_prev_pio_mask(&mut self, mask: u8) {
        self.require_v1("previous PIO mask");
        self.regs
            .write_masked(Register::Ctrl, (mask as u32) << ctrl::PREV_PIO_MASK_SHIFT, ctrl::PREV_PIO_MASK);
    }

    pub(crate) fn require_v1(&self, feature: &str) {
        assert!(
            self.version >= PioVersion::V1,
            "{} requires PIO V1, block is {:?}",
            feature,
            self.version
        );
    }
}
