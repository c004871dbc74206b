//! # State Machine Controller
//!
//! A [`StateMachine`] is a short-lived handle borrowing its [`PioBlock`]
//! mutably. Every operation is a register access on the block; the only state
//! kept on the host side is the block's claim mask.

use crate::block::PioBlock;
use crate::error::{PioError, Result};
use crate::regs::{ctrl, fdebug, flevel, fstat, PioRegisters, Register};
use pio_spec::config::{execctrl, pinctrl, shiftctrl};
use pio_spec::{
    ClockDivisor, Instruction, JmpCondition, SetDestination, StateMachineConfig,
    INSTRUCTION_MEMORY_SIZE, NUM_PINS,
};
use std::fmt;

/// One of the four state machines of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SmIndex {
    Sm0,
    Sm1,
    Sm2,
    Sm3,
}

impl SmIndex {
    pub const ALL: [SmIndex; 4] = [SmIndex::Sm0, SmIndex::Sm1, SmIndex::Sm2, SmIndex::Sm3];

    pub const fn from_u8(index: u8) -> Option<Self> {
        match index {
            0 => Some(SmIndex::Sm0),
            1 => Some(SmIndex::Sm1),
            2 => Some(SmIndex::Sm2),
            3 => Some(SmIndex::Sm3),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// This state machine's bit in 4-bit per-SM masks
    pub const fn mask(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for SmIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Handle to one state machine of a block
pub struct StateMachine<'a, R: PioRegisters> {
    pub(crate) block: &'a mut PioBlock<R>,
    index: SmIndex,
}

impl<'a, R: PioRegisters> StateMachine<'a, R> {
    pub(crate) fn new(block: &'a mut PioBlock<R>, index: SmIndex) -> Self {
        StateMachine { block, index }
    }

    pub fn index(&self) -> SmIndex {
        self.index
    }

    pub fn block(&self) -> &PioBlock<R> {
        &*self.block
    }

    fn bit(&self) -> u32 {
        self.index.as_u8() as u32
    }

    pub(crate) fn regs(&mut self) -> &mut R {
        &mut self.block.regs
    }

    // ========================================================================
    // Claiming
    // ========================================================================

    pub fn is_claimed(&self) -> bool {
        self.block.claimed & self.index.mask() != 0
    }

    pub fn claim(&mut self) -> Result<()> {
        if self.try_claim() {
            Ok(())
        } else {
            Err(PioError::StateMachineClaimed(self.index))
        }
    }

    /// Claim if free; `false` when already claimed
    pub fn try_claim(&mut self) -> bool {
        if self.is_claimed() {
            return false;
        }
        self.block.claimed |= self.index.mask();
        tracing::debug!(block = %self.block.index(), sm = %self.index, "claimed state machine");
        true
    }

    pub fn release(&mut self) {
        self.block.claimed &= !self.index.mask();
        tracing::debug!(block = %self.block.index(), sm = %self.index, "released state machine");
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Reset the state machine into a known state and point it at
    /// `initial_pc`. The state machine is left disabled.
    ///
    /// Passing [`StateMachineConfig::ZERO`] applies the block's default
    /// configuration.
    ///
    /// # Panics
    ///
    /// If `initial_pc` is outside instruction memory.
    pub fn init(&mut self, initial_pc: u8, config: StateMachineConfig) {
        assert!((initial_pc as usize) < INSTRUCTION_MEMORY_SIZE, "bad initial pc {}", initial_pc);
        tracing::debug!(sm = %self.index, initial_pc, "init state machine");

        self.set_enabled(false);

        let config = if config.is_placeholder() {
            StateMachineConfig::default_for(self.block.version())
        } else {
            config
        };
        self.set_config(&config);

        self.clear_fifos();

        let fdebug_bits = fdebug::SM0_ALL << self.bit();
        self.regs().write(Register::Fdebug, fdebug_bits);

        self.restart();
        self.clkdiv_restart();
        self.exec(Instruction::Jmp { condition: JmpCondition::Always, address: initial_pc }.encode());
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        let bit = 1 << (ctrl::SM_ENABLE_SHIFT + self.bit());
        if enabled {
            self.regs().set_bits(Register::Ctrl, bit);
        } else {
            self.regs().clear_bits(Register::Ctrl, bit);
        }
    }

    pub fn is_enabled(&mut self) -> bool {
        self.regs().read(Register::Ctrl) & 1 << (ctrl::SM_ENABLE_SHIFT + self.bit()) != 0
    }

    /// Clear internal state (shift counters, delay, stall) without touching
    /// configuration or the program counter
    pub fn restart(&mut self) {
        let bit = 1 << (ctrl::SM_RESTART_SHIFT + self.bit());
        self.regs().set_bits(Register::Ctrl, bit);
    }

    /// Restart the fractional clock divider phase
    pub fn clkdiv_restart(&mut self) {
        let bit = 1 << (ctrl::CLKDIV_RESTART_SHIFT + self.bit());
        self.regs().set_bits(Register::Ctrl, bit);
    }

    /// Write all four configuration registers without resetting the state
    /// machine.
    ///
    /// # Panics
    ///
    /// If the configuration targets a newer generation than the block.
    pub fn set_config(&mut self, config: &StateMachineConfig) {
        assert!(
            config.version <= self.block.version(),
            "configuration for {:?} applied to {:?} block",
            config.version,
            self.block.version()
        );
        let sm = self.index;
        let regs = self.regs();
        regs.write(Register::SmClkdiv(sm), config.clkdiv);
        regs.write(Register::SmExecctrl(sm), config.execctrl);
        regs.write(Register::SmShiftctrl(sm), config.shiftctrl);
        regs.write(Register::SmPinctrl(sm), config.pinctrl);
    }

    /// Change the clock divisor, also while running
    pub fn set_clock_divisor(&mut self, divisor: ClockDivisor) {
        let sm = self.index;
        self.regs().write(Register::SmClkdiv(sm), divisor.to_register());
    }

    /// Derive and apply a divisor for `target_hz`
    pub fn set_frequency(&mut self, target_hz: u32, system_hz: u32) -> Result<ClockDivisor> {
        let divisor = ClockDivisor::from_frequency(target_hz, system_hz)?;
        self.set_clock_divisor(divisor);
        Ok(divisor)
    }

    /// Execute one instruction immediately
    pub fn exec(&mut self, word: u16) {
        let sm = self.index;
        self.regs().write(Register::SmInstr(sm), word as u32);
    }

    /// Current program counter
    pub fn pc(&mut self) -> u8 {
        let sm = self.index;
        (self.regs().read(Register::SmAddr(sm)) & 0x1F) as u8
    }

    /// Whether an instruction written with [`exec`](Self::exec) is still stalled
    pub fn is_exec_stalled(&mut self) -> bool {
        let sm = self.index;
        self.regs().read(Register::SmExecctrl(sm)) & execctrl::EXEC_STALLED != 0
    }

    // ========================================================================
    // FIFOs
    // ========================================================================

    /// Drop the contents of both FIFOs. Toggling the RX join bit twice
    /// flushes them without changing the configuration.
    pub fn clear_fifos(&mut self) {
        let sm = self.index;
        let regs = self.regs();
        regs.xor_bits(Register::SmShiftctrl(sm), shiftctrl::FJOIN_RX);
        regs.xor_bits(Register::SmShiftctrl(sm), shiftctrl::FJOIN_RX);
    }

    /// Write to the TX FIFO without checking for space
    pub fn put(&mut self, value: u32) {
        let sm = self.index;
        self.regs().write(Register::Txf(sm), value);
    }

    /// Read from the RX FIFO without checking for data
    pub fn get(&mut self) -> u32 {
        let sm = self.index;
        self.regs().read(Register::Rxf(sm))
    }

    pub fn tx_level(&mut self) -> u8 {
        self.level(flevel::TX_SHIFT)
    }

    pub fn rx_level(&mut self) -> u8 {
        self.level(flevel::RX_SHIFT)
    }

    fn level(&mut self, shift: u32) -> u8 {
        let shift = shift + flevel::SM_STRIDE * self.bit();
        ((self.regs().read(Register::Flevel) >> shift) & flevel::LEVEL_MASK) as u8
    }

    pub fn is_tx_full(&mut self) -> bool {
        self.fstat(fstat::TXFULL_SHIFT)
    }

    pub fn is_tx_empty(&mut self) -> bool {
        self.fstat(fstat::TXEMPTY_SHIFT)
    }

    pub fn is_rx_full(&mut self) -> bool {
        self.fstat(fstat::RXFULL_SHIFT)
    }

    pub fn is_rx_empty(&mut self) -> bool {
        self.fstat(fstat::RXEMPTY_SHIFT)
    }

    fn fstat(&mut self, shift: u32) -> bool {
        let bit = 1 << (shift + self.bit());
        self.regs().read(Register::Fstat) & bit != 0
    }

    /// Sticky FDEBUG flags of this state machine as
    /// `(tx_over, rx_under, tx_stall, rx_stall)`
    pub fn debug_flags(&mut self) -> (bool, bool, bool, bool) {
        let bit = self.bit();
        let flags = self.regs().read(Register::Fdebug);
        let test = |shift: u32| flags & 1 << (shift + bit) != 0;
        (
            test(fdebug::TXOVER_SHIFT),
            test(fdebug::RXUNDER_SHIFT),
            test(fdebug::TXSTALL_SHIFT),
            test(fdebug::RXSTALL_SHIFT),
        )
    }

    /// Read RX FIFO entry `index` directly (V1, with a `TxGet` or `PutGet` join)
    pub fn rx_fifo_get_at(&mut self, index: u8) -> u32 {
        self.block.require_v1("RX FIFO register access");
        assert!(index < 4, "bad RX FIFO index {}", index);
        let sm = self.index;
        self.regs().read(Register::RxfPutGet { sm, index })
    }

    /// Write RX FIFO entry `index` directly (V1, with a `TxPut` or `PutGet` join)
    pub fn rx_fifo_put_at(&mut self, index: u8, value: u32) {
        self.block.require_v1("RX FIFO register access");
        assert!(index < 4, "bad RX FIFO index {}", index);
        let sm = self.index;
        self.regs().write(Register::RxfPutGet { sm, index }, value);
    }

    // ========================================================================
    // Pin Bootstrap
    // ========================================================================

    /// Drive the pins in `mask` to the matching bits of `values` by executing
    /// `set pins` once per pin
    pub fn set_pins_masked(&mut self, values: u32, mask: u32) {
        self.set_pin_exec(SetDestination::Pins, values, mask);
    }

    /// Set the directions of the pins in `mask` (1 = output)
    pub fn set_pindirs_masked(&mut self, dirs: u32, mask: u32) {
        self.set_pin_exec(SetDestination::Pindirs, dirs, mask);
    }

    /// Drive `count` pins from `base` all high or all low
    pub fn set_pins_consecutive(&mut self, base: u8, count: u8, level: bool) {
        let (values, mask) = consecutive_mask(base, count, level);
        self.set_pins_masked(values, mask);
    }

    /// Make `count` pins from `base` all outputs or all inputs
    pub fn set_pindirs_consecutive(&mut self, base: u8, count: u8, is_out: bool) {
        let (dirs, mask) = consecutive_mask(base, count, is_out);
        self.set_pindirs_masked(dirs, mask);
    }

    fn set_pin_exec(&mut self, destination: SetDestination, values: u32, mut mask: u32) {
        let sm = self.index;
        let saved_pinctrl = self.regs().read(Register::SmPinctrl(sm));
        let saved_execctrl = self.regs().read(Register::SmExecctrl(sm));
        self.regs().clear_bits(Register::SmExecctrl(sm), execctrl::OUT_STICKY);

        while mask != 0 {
            let pin = mask.trailing_zeros();
            self.regs().write(
                Register::SmPinctrl(sm),
                1 << pinctrl::SET_COUNT_SHIFT | pin << pinctrl::SET_BASE_SHIFT,
            );
            let data = ((values >> pin) & 1) as u8;
            let word = Instruction::Set { destination, data }.encode();
            tracing::trace!(sm = %sm, pin, word, "pin bootstrap");
            self.exec(word);
            mask &= mask - 1;
        }

        self.regs().write(Register::SmPinctrl(sm), saved_pinctrl);
        self.regs().write(Register::SmExecctrl(sm), saved_execctrl);
    }
}

/// `(values, mask)` covering `count` pins from `base`
fn consecutive_mask(base: u8, count: u8, level: bool) -> (u32, u32) {
    assert!(base < NUM_PINS, "bad pin {}", base);
    assert!(base as u32 + count as u32 <= NUM_PINS as u32, "pin count {} too large", count);
    let mask = (((1u64 << count) - 1) << base) as u32;
    (if level { mask } else { 0 }, mask)
}

impl<R: PioRegisters> fmt::Debug for StateMachine<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("block", &self.block.index())
            .field("index", &self.index)
            .finish()
    }
}
