//! # DMA Arbiter
//!
//! Moves word buffers between memory and a state machine's FIFOs using DMA
//! channels paced by the state machine's DREQ. Channels are claimed from a
//! per-arbiter set. Every transfer is bounded by a [`BlockingConfig`]; when
//! the budget runs out the channel is aborted and the call returns
//! [`PioError::Timeout`].
//!
//! The channel control layout is the first-generation one (EN at bit 0
//! through BUSY at bit 24).

use crate::block::BlockIndex;
use crate::error::{PioError, Result};
use crate::fifo::{BlockingConfig, Deadline};
use crate::regs::{PioRegisters, Register};
use crate::state_machine::{SmIndex, StateMachine};

// ============================================================================
// Registers
// ============================================================================

/// A register of the DMA controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmaRegister {
    ReadAddr(u8),
    WriteAddr(u8),
    TransCount(u8),
    CtrlTrig(u8),
    /// One bit per channel; write 1 to abort, reads back 1 until flushed
    ChanAbort,
}

/// Access to the DMA controller's registers
pub trait DmaRegisters {
    fn read(&mut self, reg: DmaRegister) -> u32;

    fn write(&mut self, reg: DmaRegister, value: u32);
}

/// CTRL_TRIG bit fields
pub mod dma_ctrl {
    pub const EN: u32 = 1 << 0;
    pub const HIGH_PRIORITY: u32 = 1 << 1;
    pub const DATA_SIZE_SHIFT: u32 = 2;
    pub const DATA_SIZE_MASK: u32 = 0x3 << DATA_SIZE_SHIFT;
    pub const INCR_READ: u32 = 1 << 4;
    pub const INCR_WRITE: u32 = 1 << 5;
    pub const RING_SIZE_SHIFT: u32 = 6;
    pub const RING_SIZE_MASK: u32 = 0xF << RING_SIZE_SHIFT;
    pub const RING_SEL: u32 = 1 << 10;
    pub const CHAIN_TO_SHIFT: u32 = 11;
    pub const CHAIN_TO_MASK: u32 = 0xF << CHAIN_TO_SHIFT;
    pub const TREQ_SEL_SHIFT: u32 = 15;
    pub const TREQ_SEL_MASK: u32 = 0x3F << TREQ_SEL_SHIFT;
    pub const IRQ_QUIET: u32 = 1 << 21;
    pub const BSWAP: u32 = 1 << 22;
    pub const SNIFF_EN: u32 = 1 << 23;
    pub const BUSY: u32 = 1 << 24;
}

/// Maximum number of channels a controller can have
pub const MAX_DMA_CHANNELS: u8 = 16;

// ============================================================================
// Channel Configuration
// ============================================================================

/// Transfer element size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSize {
    Byte = 0,
    HalfWord = 1,
    Word = 2,
}

/// Transfer request signal pacing a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dreq(pub u8);

impl Dreq {
    /// Unpaced: transfer as fast as possible
    pub const PERMANENT: Dreq = Dreq(0x3F);

    /// DREQ of a state machine's TX or RX FIFO
    pub const fn pio(block: BlockIndex, sm: SmIndex, rx: bool) -> Self {
        Dreq(block.as_u8() * 8 + if rx { 4 } else { 0 } + sm.as_u8())
    }
}

/// CTRL_TRIG image built with consuming setters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaChannelConfig {
    pub ctrl: u32,
}

impl DmaChannelConfig {
    /// Unpaced 32-bit memory copy with read increment, chained to itself
    /// (no chaining), enabled
    pub fn default_for(channel: u8) -> Self {
        DmaChannelConfig { ctrl: 0 }
            .set_ring(false, 0)
            .set_bswap(false)
            .set_irq_quiet(false)
            .set_write_increment(false)
            .set_sniff_enable(false)
            .set_high_priority(false)
            .set_chain_to(channel)
            .set_treq_sel(Dreq::PERMANENT)
            .set_read_increment(true)
            .set_data_size(DataSize::Word)
            .set_enable(true)
    }

    fn set_field(mut self, mask: u32, shift: u32, value: u32) -> Self {
        self.ctrl = (self.ctrl & !mask) | ((value << shift) & mask);
        self
    }

    fn set_flag(mut self, bit: u32, on: bool) -> Self {
        if on {
            self.ctrl |= bit;
        } else {
            self.ctrl &= !bit;
        }
        self
    }

    pub fn set_treq_sel(self, dreq: Dreq) -> Self {
        self.set_field(dma_ctrl::TREQ_SEL_MASK, dma_ctrl::TREQ_SEL_SHIFT, dreq.0 as u32)
    }

    /// Chaining a channel to itself disables chaining
    pub fn set_chain_to(self, channel: u8) -> Self {
        assert!(channel < MAX_DMA_CHANNELS, "bad DMA channel {}", channel);
        self.set_field(dma_ctrl::CHAIN_TO_MASK, dma_ctrl::CHAIN_TO_SHIFT, channel as u32)
    }

    pub fn set_data_size(self, size: DataSize) -> Self {
        self.set_field(dma_ctrl::DATA_SIZE_MASK, dma_ctrl::DATA_SIZE_SHIFT, size as u32)
    }

    /// Wrap the read (or write) address on a `1 << size_bits` byte boundary;
    /// 0 disables wrapping
    pub fn set_ring(self, write: bool, size_bits: u8) -> Self {
        assert!(size_bits < 16, "ring size {} out of range", size_bits);
        self.set_field(dma_ctrl::RING_SIZE_MASK, dma_ctrl::RING_SIZE_SHIFT, size_bits as u32)
            .set_flag(dma_ctrl::RING_SEL, write)
    }

    pub fn set_read_increment(self, on: bool) -> Self {
        self.set_flag(dma_ctrl::INCR_READ, on)
    }

    pub fn set_write_increment(self, on: bool) -> Self {
        self.set_flag(dma_ctrl::INCR_WRITE, on)
    }

    pub fn set_bswap(self, on: bool) -> Self {
        self.set_flag(dma_ctrl::BSWAP, on)
    }

    pub fn set_irq_quiet(self, on: bool) -> Self {
        self.set_flag(dma_ctrl::IRQ_QUIET, on)
    }

    pub fn set_high_priority(self, on: bool) -> Self {
        self.set_flag(dma_ctrl::HIGH_PRIORITY, on)
    }

    pub fn set_enable(self, on: bool) -> Self {
        self.set_flag(dma_ctrl::EN, on)
    }

    pub fn set_sniff_enable(self, on: bool) -> Self {
        self.set_flag(dma_ctrl::SNIFF_EN, on)
    }
}

// ============================================================================
// Arbiter
// ============================================================================

/// Claims DMA channels and runs FIFO transfers on them
#[derive(Debug)]
pub struct DmaArbiter<D: DmaRegisters> {
    regs: D,
    channels: u8,
    claimed: u16,
}

impl<D: DmaRegisters> DmaArbiter<D> {
    /// # Panics
    ///
    /// If `channels` exceeds [`MAX_DMA_CHANNELS`].
    pub fn new(regs: D, channels: u8) -> Self {
        assert!(channels <= MAX_DMA_CHANNELS, "too many DMA channels: {}", channels);
        DmaArbiter { regs, channels, claimed: 0 }
    }

    pub fn registers(&self) -> &D {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut D {
        &mut self.regs
    }

    pub fn channel_count(&self) -> u8 {
        self.channels
    }

    fn check_channel(&self, channel: u8) {
        assert!(channel < self.channels, "bad DMA channel {}", channel);
    }

    pub fn is_claimed(&self, channel: u8) -> bool {
        self.check_channel(channel);
        self.claimed & (1 << channel) != 0
    }

    pub fn claim(&mut self, channel: u8) -> Result<()> {
        if self.is_claimed(channel) {
            return Err(PioError::DmaChannelClaimed(channel));
        }
        self.claimed |= 1 << channel;
        tracing::debug!(channel, "claimed DMA channel");
        Ok(())
    }

    /// Claim the lowest-numbered free channel
    pub fn claim_unused(&mut self) -> Result<u8> {
        let channel = (0..self.channels)
            .find(|&ch| self.claimed & (1 << ch) == 0)
            .ok_or(PioError::NoFreeDmaChannel)?;
        self.claim(channel)?;
        Ok(channel)
    }

    pub fn release(&mut self, channel: u8) {
        self.check_channel(channel);
        self.claimed &= !(1 << channel);
        tracing::debug!(channel, "released DMA channel");
    }

    pub fn is_busy(&mut self, channel: u8) -> bool {
        self.regs.read(DmaRegister::CtrlTrig(channel)) & dma_ctrl::BUSY != 0
    }

    /// Copy `src` word by word into the fixed address `dst` (a TX FIFO),
    /// paced by `dreq`, and wait for completion.
    ///
    /// The buffer address is programmed as-is, so it is only meaningful when
    /// the buffer lives on the DMA's 32-bit bus. Off-target backends see the
    /// truncated host address.
    ///
    /// # Panics
    ///
    /// If `channel` is not claimed.
    pub fn push32(
        &mut self,
        channel: u8,
        dst: u32,
        src: &[u32],
        dreq: Dreq,
        config: &BlockingConfig,
    ) -> Result<()> {
        let transfer = Transfer {
            read_addr: bus_address(src.as_ptr()),
            write_addr: dst,
            count: src.len(),
            from_memory: true,
        };
        self.run(channel, transfer, dreq, config, "dma push32")
    }

    /// Copy words from the fixed address `src` (an RX FIFO) into `dst`,
    /// paced by `dreq`, and wait for completion. Same bus-address caveat as
    /// [`DmaArbiter::push32`].
    ///
    /// # Panics
    ///
    /// If `channel` is not claimed.
    pub fn pull32(
        &mut self,
        channel: u8,
        dst: &mut [u32],
        src: u32,
        dreq: Dreq,
        config: &BlockingConfig,
    ) -> Result<()> {
        let transfer = Transfer {
            read_addr: src,
            write_addr: bus_address(dst.as_ptr()),
            count: dst.len(),
            from_memory: false,
        };
        self.run(channel, transfer, dreq, config, "dma pull32")
    }

    fn run(
        &mut self,
        channel: u8,
        transfer: Transfer,
        dreq: Dreq,
        config: &BlockingConfig,
        operation: &'static str,
    ) -> Result<()> {
        assert!(self.is_claimed(channel), "DMA channel {} not claimed", channel);
        if transfer.count == 0 {
            return Ok(());
        }

        self.regs.write(DmaRegister::ReadAddr(channel), transfer.read_addr);
        self.regs.write(DmaRegister::WriteAddr(channel), transfer.write_addr);
        self.regs.write(DmaRegister::TransCount(channel), transfer.count as u32);

        let ctrl = DmaChannelConfig { ctrl: self.regs.read(DmaRegister::CtrlTrig(channel)) }
            .set_treq_sel(dreq)
            .set_data_size(DataSize::Word)
            .set_chain_to(channel)
            .set_read_increment(transfer.from_memory)
            .set_write_increment(!transfer.from_memory)
            .set_enable(true);
        self.regs.write(DmaRegister::CtrlTrig(channel), ctrl.ctrl);

        let mut deadline = Deadline::start(config);
        if deadline.wait(|| !self.is_busy(channel)) {
            return Ok(());
        }

        tracing::warn!(channel, count = transfer.count, operation, "DMA transfer timed out, aborting");
        self.abort_within(channel, &mut deadline);
        Err(PioError::Timeout { operation })
    }

    /// Abort whatever the channel is doing and wait for in-flight transfers
    /// to flush
    pub fn abort(&mut self, channel: u8, config: &BlockingConfig) {
        self.check_channel(channel);
        let mut deadline = Deadline::start(config);
        self.abort_within(channel, &mut deadline);
    }

    fn abort_within(&mut self, channel: u8, deadline: &mut Deadline) {
        let mask = 1u32 << channel;
        self.regs.write(DmaRegister::ChanAbort, mask);
        if !deadline.wait(|| self.regs.read(DmaRegister::ChanAbort) & mask == 0) {
            tracing::warn!(channel, "DMA abort did not complete");
        }
    }
}

/// One memory/FIFO transfer; exactly one side increments
struct Transfer {
    read_addr: u32,
    write_addr: u32,
    count: usize,
    from_memory: bool,
}

/// Address of a buffer as seen by the DMA. Only valid on a 32-bit bus;
/// on a 64-bit host the upper half is dropped.
fn bus_address(ptr: *const u32) -> u32 {
    ptr as usize as u32
}

// ============================================================================
// State Machine FIFO Endpoints
// ============================================================================

impl<R: PioRegisters> StateMachine<'_, R> {
    /// Bus address of the TX FIFO
    pub fn tx_fifo_address(&self) -> u32 {
        self.block().index().base_address() + Register::Txf(self.index()).offset()
    }

    /// Bus address of the RX FIFO
    pub fn rx_fifo_address(&self) -> u32 {
        self.block().index().base_address() + Register::Rxf(self.index()).offset()
    }

    pub fn tx_dreq(&self) -> Dreq {
        Dreq::pio(self.block().index(), self.index(), false)
    }

    pub fn rx_dreq(&self) -> Dreq {
        Dreq::pio(self.block().index(), self.index(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::PioBlock;
    use crate::sim::{SimulatedDma, SimulatedPio};
    use pio_spec::PioVersion;

    #[test]
    fn test_dreq_numbers() {
        assert_eq!(Dreq::pio(BlockIndex::Pio0, SmIndex::Sm0, false), Dreq(0));
        assert_eq!(Dreq::pio(BlockIndex::Pio0, SmIndex::Sm3, true), Dreq(7));
        assert_eq!(Dreq::pio(BlockIndex::Pio1, SmIndex::Sm2, false), Dreq(10));
        assert_eq!(Dreq::pio(BlockIndex::Pio2, SmIndex::Sm1, true), Dreq(21));
    }

    #[test]
    fn test_default_channel_config() {
        let cfg = DmaChannelConfig::default_for(3);
        assert_eq!(
            cfg.ctrl,
            dma_ctrl::EN
                | 2 << dma_ctrl::DATA_SIZE_SHIFT
                | dma_ctrl::INCR_READ
                | 3 << dma_ctrl::CHAIN_TO_SHIFT
                | 0x3F << dma_ctrl::TREQ_SEL_SHIFT
        );
    }

    #[test]
    fn test_config_setters_replace_fields() {
        let cfg = DmaChannelConfig::default_for(0)
            .set_treq_sel(Dreq(5))
            .set_ring(true, 4)
            .set_enable(false);
        assert_eq!((cfg.ctrl & dma_ctrl::TREQ_SEL_MASK) >> dma_ctrl::TREQ_SEL_SHIFT, 5);
        assert_eq!((cfg.ctrl & dma_ctrl::RING_SIZE_MASK) >> dma_ctrl::RING_SIZE_SHIFT, 4);
        assert_ne!(cfg.ctrl & dma_ctrl::RING_SEL, 0);
        assert_eq!(cfg.ctrl & dma_ctrl::EN, 0);
    }

    #[test]
    fn test_claims() {
        let mut dma = DmaArbiter::new(SimulatedDma::new(12), 12);
        assert_eq!(dma.claim_unused().unwrap(), 0);
        dma.claim(1).unwrap();
        assert_eq!(dma.claim(1).unwrap_err(), PioError::DmaChannelClaimed(1));
        assert_eq!(dma.claim_unused().unwrap(), 2);
        dma.release(0);
        assert_eq!(dma.claim_unused().unwrap(), 0);

        for _ in 3..12 {
            dma.claim_unused().unwrap();
        }
        assert_eq!(dma.claim_unused().unwrap_err(), PioError::NoFreeDmaChannel);
    }

    #[test]
    fn test_push32_programs_channel() {
        let mut pio = PioBlock::new(SimulatedPio::default(), 1, PioVersion::V0);
        let sm = pio.state_machine(SmIndex::Sm2);
        let (dst, dreq) = (sm.tx_fifo_address(), sm.tx_dreq());
        assert_eq!(dst, 0x5030_0018);

        let mut dma = DmaArbiter::new(SimulatedDma::new(12), 12);
        let channel = dma.claim_unused().unwrap();
        let words = [1u32, 2, 3];
        dma.push32(channel, dst, &words, dreq, &BlockingConfig::default()).unwrap();

        let transfer = dma.registers().transfers()[0];
        assert_eq!(transfer.channel, channel);
        assert_eq!(transfer.write_addr, dst);
        assert_eq!(transfer.count, 3);
        assert_eq!((transfer.ctrl & dma_ctrl::TREQ_SEL_MASK) >> dma_ctrl::TREQ_SEL_SHIFT, 10);
        assert_ne!(transfer.ctrl & dma_ctrl::INCR_READ, 0);
        assert_eq!(transfer.ctrl & dma_ctrl::INCR_WRITE, 0);
        // Buffer address is the low 32 bits of the pointer
        assert_eq!(transfer.read_addr, words.as_ptr() as usize as u32);
    }

    #[test]
    fn test_pull32_increments_write() {
        let mut dma = DmaArbiter::new(SimulatedDma::new(4), 4);
        dma.claim(2).unwrap();
        let mut buf = [0u32; 8];
        dma.pull32(2, &mut buf, 0x5020_0020, Dreq(4), &BlockingConfig::default()).unwrap();
        let transfer = dma.registers().transfers()[0];
        assert_eq!(transfer.read_addr, 0x5020_0020);
        assert_eq!(transfer.count, 8);
        assert_eq!(transfer.ctrl & dma_ctrl::INCR_READ, 0);
        assert_ne!(transfer.ctrl & dma_ctrl::INCR_WRITE, 0);
    }

    #[test]
    fn test_timeout_aborts_channel() {
        let mut dma = DmaArbiter::new(SimulatedDma::new(4).never_completes(), 4);
        dma.claim(1).unwrap();
        let err = dma
            .push32(1, 0x5020_0010, &[9], Dreq(0), &BlockingConfig::with_retries(5))
            .unwrap_err();
        assert_eq!(err, PioError::Timeout { operation: "dma push32" });
        assert_eq!(dma.registers().aborts(), &[1]);
        assert!(!dma.is_busy(1));
    }

    #[test]
    fn test_stuck_abort_returns() {
        let mut dma = DmaArbiter::new(SimulatedDma::new(4).never_completes().abort_sticks(), 4);
        dma.claim(0).unwrap();
        assert!(dma
            .push32(0, 0, &[1, 2], Dreq(0), &BlockingConfig::with_retries(3))
            .is_err());
    }

    #[test]
    fn test_empty_buffer_is_noop() {
        let mut dma = DmaArbiter::new(SimulatedDma::new(4), 4);
        dma.claim(0).unwrap();
        dma.push32(0, 0, &[], Dreq(0), &BlockingConfig::default()).unwrap();
        assert!(dma.registers().transfers().is_empty());
    }

    #[test]
    #[should_panic(expected = "not claimed")]
    fn test_transfer_on_unclaimed_channel() {
        let mut dma = DmaArbiter::new(SimulatedDma::new(4), 4);
        let _ = dma.push32(0, 0, &[1], Dreq(0), &BlockingConfig::default());
    }
}
