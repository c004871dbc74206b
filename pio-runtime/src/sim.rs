//! # Simulated Hardware
//!
//! In-memory register files for host-side use. [`SimulatedPio`] models the
//! parts of a PIO block that the control core can observe: FIFOs with their
//! status and sticky debug flags, instruction memory, the IRQ flags, the pad
//! debug registers and the effect of the few instructions the control core
//! executes directly (`jmp` to set the program counter, `set pins` and
//! `set pindirs` for pin bootstrap). State machines never run programs.
//!
//! [`SimulatedDma`] records every triggered transfer and completes it after a
//! configurable number of status polls.

use crate::dma::{dma_ctrl, DmaRegister, DmaRegisters, MAX_DMA_CHANNELS};
use crate::regs::{cfginfo, ctrl, fdebug, flevel, fstat, PioRegisters, Register};
use crate::state_machine::SmIndex;
use pio_spec::config::{pinctrl, shiftctrl};
use pio_spec::{
    Instruction, JmpCondition, PioVersion, SetDestination, INSTRUCTION_MEMORY_SIZE,
};
use std::collections::VecDeque;

const FIFO_DEPTH: usize = 4;
const NUM_SM: usize = 4;

// ============================================================================
// PIO
// ============================================================================

/// Per-state-machine registers and FIFOs
#[derive(Debug, Clone)]
struct SmState {
    clkdiv: u32,
    execctrl: u32,
    shiftctrl: u32,
    pinctrl: u32,
    pc: u8,
    tx: VecDeque<u32>,
    rx: VecDeque<u32>,
    rx_registers: [u32; 4],
    executed: Vec<u16>,
}

impl Default for SmState {
    fn default() -> Self {
        SmState {
            clkdiv: 1 << 16,
            execctrl: 0x1F << 12,
            shiftctrl: shiftctrl::OUT_SHIFTDIR | shiftctrl::IN_SHIFTDIR,
            pinctrl: 0,
            pc: 0,
            tx: VecDeque::new(),
            rx: VecDeque::new(),
            rx_registers: [0; 4],
            executed: Vec::new(),
        }
    }
}

impl SmState {
    fn tx_depth(&self) -> usize {
        if self.shiftctrl & shiftctrl::FJOIN_TX != 0 {
            2 * FIFO_DEPTH
        } else {
            FIFO_DEPTH
        }
    }

    fn rx_depth(&self) -> usize {
        if self.shiftctrl & shiftctrl::FJOIN_RX != 0 {
            2 * FIFO_DEPTH
        } else {
            FIFO_DEPTH
        }
    }

    fn write_shiftctrl(&mut self, value: u32) {
        let joins = shiftctrl::FJOIN_TX | shiftctrl::FJOIN_RX;
        if (self.shiftctrl ^ value) & joins != 0 {
            self.tx.clear();
            self.rx.clear();
        }
        self.shiftctrl = value;
    }
}

/// Register-level model of one PIO block
#[derive(Debug, Clone)]
pub struct SimulatedPio {
    version: PioVersion,
    ctrl: u32,
    fdebug: u32,
    irq: u8,
    input_sync_bypass: u32,
    padout: u32,
    padoe: u32,
    gpio_base: u32,
    instr_mem: [u16; INSTRUCTION_MEMORY_SIZE],
    sms: [SmState; NUM_SM],
}

impl SimulatedPio {
    pub fn new(version: PioVersion) -> Self {
        SimulatedPio {
            version,
            ctrl: 0,
            fdebug: 0,
            irq: 0,
            input_sync_bypass: 0,
            padout: 0,
            padoe: 0,
            gpio_base: 0,
            instr_mem: [0; INSTRUCTION_MEMORY_SIZE],
            sms: Default::default(),
        }
    }

    pub fn version(&self) -> PioVersion {
        self.version
    }

    pub fn instruction_memory(&self) -> &[u16; INSTRUCTION_MEMORY_SIZE] {
        &self.instr_mem
    }

    /// Push a word into an RX FIFO as if the state machine had pushed it.
    /// A full FIFO drops the word.
    pub fn push_rx(&mut self, sm: SmIndex, value: u32) {
        let state = &mut self.sms[sm.as_u8() as usize];
        if state.rx.len() < state.rx_depth() {
            state.rx.push_back(value);
        }
    }

    /// Take a word from a TX FIFO as if the state machine had pulled it
    pub fn pop_tx(&mut self, sm: SmIndex) -> Option<u32> {
        self.sms[sm.as_u8() as usize].tx.pop_front()
    }

    /// Instructions written to SMx_INSTR, oldest first
    pub fn executed(&self, sm: SmIndex) -> &[u16] {
        &self.sms[sm.as_u8() as usize].executed
    }

    fn sm(&mut self, sm: SmIndex) -> &mut SmState {
        &mut self.sms[sm.as_u8() as usize]
    }

    fn fstat(&self) -> u32 {
        self.sms.iter().enumerate().fold(0, |acc, (i, sm)| {
            let mut bits = 0u32;
            if sm.rx.len() >= sm.rx_depth() {
                bits |= 1 << fstat::RXFULL_SHIFT;
            }
            if sm.rx.is_empty() {
                bits |= 1 << fstat::RXEMPTY_SHIFT;
            }
            if sm.tx.len() >= sm.tx_depth() {
                bits |= 1 << fstat::TXFULL_SHIFT;
            }
            if sm.tx.is_empty() {
                bits |= 1 << fstat::TXEMPTY_SHIFT;
            }
            acc | bits << i
        })
    }

    fn flevel(&self) -> u32 {
        self.sms.iter().enumerate().fold(0, |acc, (i, sm)| {
            let tx = (sm.tx.len() as u32).min(flevel::LEVEL_MASK);
            let rx = (sm.rx.len() as u32).min(flevel::LEVEL_MASK);
            acc | (tx << flevel::TX_SHIFT | rx << flevel::RX_SHIFT) << (flevel::SM_STRIDE * i as u32)
        })
    }

    fn cfginfo(&self) -> u32 {
        (self.version as u32) << cfginfo::VERSION_SHIFT
            | (INSTRUCTION_MEMORY_SIZE as u32) << cfginfo::IMEM_SIZE_SHIFT
            | (NUM_SM as u32) << cfginfo::SM_COUNT_SHIFT
            | (FIFO_DEPTH as u32) << cfginfo::FIFO_DEPTH_SHIFT
    }

    fn write_ctrl(&mut self, value: u32) {
        let mut kept = ctrl::SM_ENABLE_MASK << ctrl::SM_ENABLE_SHIFT;
        if self.version >= PioVersion::V1 {
            kept |= ctrl::NEXT_PIO_MASK | ctrl::PREV_PIO_MASK;
        }
        // Restart bits act on write and read back as zero
        self.ctrl = value & kept;
    }

    fn write_txf(&mut self, sm: SmIndex, value: u32) {
        let state = self.sm(sm);
        if state.tx.len() < state.tx_depth() {
            state.tx.push_back(value);
        } else {
            self.fdebug |= 1 << (fdebug::TXOVER_SHIFT + sm.as_u8() as u32);
        }
    }

    fn read_rxf(&mut self, sm: SmIndex) -> u32 {
        match self.sm(sm).rx.pop_front() {
            Some(value) => value,
            None => {
                self.fdebug |= 1 << (fdebug::RXUNDER_SHIFT + sm.as_u8() as u32);
                0
            }
        }
    }

    fn exec(&mut self, sm: SmIndex, word: u16) {
        let state = self.sm(sm);
        state.executed.push(word);
        let pins = state.pinctrl;

        match Instruction::decode(word) {
            Ok(Instruction::Jmp { condition: JmpCondition::Always, address }) => {
                self.sm(sm).pc = address;
            }
            Ok(Instruction::Set { destination, data }) => {
                let base = (pins & pinctrl::SET_BASE_MASK) >> pinctrl::SET_BASE_SHIFT;
                let count = (pins & pinctrl::SET_COUNT_MASK) >> pinctrl::SET_COUNT_SHIFT;
                let target = match destination {
                    SetDestination::Pins => &mut self.padout,
                    SetDestination::Pindirs => &mut self.padoe,
                    _ => return,
                };
                for i in 0..count {
                    let pin = (base + i) % 32;
                    if (data >> i) & 1 != 0 {
                        *target |= 1 << pin;
                    } else {
                        *target &= !(1 << pin);
                    }
                }
            }
            _ => {}
        }
    }
}

impl Default for SimulatedPio {
    fn default() -> Self {
        Self::new(PioVersion::V0)
    }
}

impl PioRegisters for SimulatedPio {
    fn read(&mut self, reg: Register) -> u32 {
        match reg {
            Register::Ctrl => self.ctrl,
            Register::Fstat => self.fstat(),
            Register::Fdebug => self.fdebug,
            Register::Flevel => self.flevel(),
            // Write-only
            Register::Txf(_) | Register::IrqForce | Register::SmInstr(_) => 0,
            Register::Rxf(sm) => self.read_rxf(sm),
            Register::Irq => self.irq as u32,
            Register::InputSyncBypass => self.input_sync_bypass,
            Register::DbgPadout => self.padout,
            Register::DbgPadoe => self.padoe,
            Register::DbgCfginfo => self.cfginfo(),
            Register::InstrMem(addr) => self.instr_mem[addr as usize] as u32,
            Register::SmClkdiv(sm) => self.sm(sm).clkdiv,
            Register::SmExecctrl(sm) => self.sm(sm).execctrl,
            Register::SmShiftctrl(sm) => self.sm(sm).shiftctrl,
            Register::SmAddr(sm) => self.sm(sm).pc as u32,
            Register::SmPinctrl(sm) => self.sm(sm).pinctrl,
            Register::RxfPutGet { sm, index } => self.sm(sm).rx_registers[index as usize],
            Register::GpioBase => self.gpio_base,
        }
    }

    fn write(&mut self, reg: Register, value: u32) {
        match reg {
            Register::Ctrl => self.write_ctrl(value),
            Register::Fdebug => self.fdebug &= !value,
            Register::Txf(sm) => self.write_txf(sm, value),
            Register::Irq => self.irq &= !(value as u8),
            Register::IrqForce => self.irq |= value as u8,
            Register::InputSyncBypass => self.input_sync_bypass = value,
            Register::InstrMem(addr) => self.instr_mem[addr as usize] = value as u16,
            Register::SmClkdiv(sm) => self.sm(sm).clkdiv = value,
            Register::SmExecctrl(sm) => self.sm(sm).execctrl = value,
            Register::SmShiftctrl(sm) => self.sm(sm).write_shiftctrl(value),
            Register::SmInstr(sm) => self.exec(sm, value as u16),
            Register::SmPinctrl(sm) => self.sm(sm).pinctrl = value,
            Register::RxfPutGet { sm, index } => self.sm(sm).rx_registers[index as usize] = value,
            Register::GpioBase => self.gpio_base = value,
            // Read-only
            Register::Fstat
            | Register::Flevel
            | Register::Rxf(_)
            | Register::DbgPadout
            | Register::DbgPadoe
            | Register::DbgCfginfo
            | Register::SmAddr(_) => {}
        }
    }
}

// ============================================================================
// DMA
// ============================================================================

/// A transfer as it was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaTransfer {
    pub channel: u8,
    pub read_addr: u32,
    pub write_addr: u32,
    pub count: u32,
    pub ctrl: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    read_addr: u32,
    write_addr: u32,
    trans_count: u32,
    ctrl: u32,
    /// Status polls left before the transfer completes
    polls_left: Option<u32>,
}

/// Register-level model of a DMA controller
#[derive(Debug, Clone)]
pub struct SimulatedDma {
    channels: Vec<Channel>,
    completes_after: Option<u32>,
    abort_sticks: bool,
    abort_pending: u32,
    transfers: Vec<DmaTransfer>,
    aborts: Vec<u8>,
}

impl SimulatedDma {
    /// Transfers complete on the first status poll
    pub fn new(channels: u8) -> Self {
        assert!(channels <= MAX_DMA_CHANNELS, "too many DMA channels: {}", channels);
        SimulatedDma {
            channels: vec![Channel::default(); channels as usize],
            completes_after: Some(0),
            abort_sticks: false,
            abort_pending: 0,
            transfers: Vec::new(),
            aborts: Vec::new(),
        }
    }

    /// Report busy for `polls` status reads before completing
    pub fn completes_after(mut self, polls: u32) -> Self {
        self.completes_after = Some(polls);
        self
    }

    /// Transfers stay busy until aborted
    pub fn never_completes(mut self) -> Self {
        self.completes_after = None;
        self
    }

    /// Aborts never finish flushing
    pub fn abort_sticks(mut self) -> Self {
        self.abort_sticks = true;
        self
    }

    pub fn transfers(&self) -> &[DmaTransfer] {
        &self.transfers
    }

    /// Channels aborted, in order
    pub fn aborts(&self) -> &[u8] {
        &self.aborts
    }

    fn trigger(&mut self, channel: u8) {
        let completes_after = self.completes_after;
        let ch = &mut self.channels[channel as usize];
        if ch.ctrl & dma_ctrl::EN == 0 {
            return;
        }
        self.transfers.push(DmaTransfer {
            channel,
            read_addr: ch.read_addr,
            write_addr: ch.write_addr,
            count: ch.trans_count,
            ctrl: ch.ctrl,
        });
        ch.polls_left = completes_after;
        ch.ctrl |= dma_ctrl::BUSY;
    }

    fn poll_ctrl(&mut self, channel: u8) -> u32 {
        let ch = &mut self.channels[channel as usize];
        if ch.ctrl & dma_ctrl::BUSY != 0 {
            match ch.polls_left {
                Some(0) => ch.ctrl &= !dma_ctrl::BUSY,
                Some(ref mut n) => *n -= 1,
                None => {}
            }
        }
        ch.ctrl
    }

    fn abort(&mut self, mask: u32) {
        for (i, ch) in self.channels.iter_mut().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            self.aborts.push(i as u8);
            if !self.abort_sticks {
                ch.ctrl &= !dma_ctrl::BUSY;
                ch.polls_left = Some(0);
            }
        }
        if self.abort_sticks {
            self.abort_pending |= mask;
        }
    }
}

impl DmaRegisters for SimulatedDma {
    fn read(&mut self, reg: DmaRegister) -> u32 {
        match reg {
            DmaRegister::ReadAddr(ch) => self.channels[ch as usize].read_addr,
            DmaRegister::WriteAddr(ch) => self.channels[ch as usize].write_addr,
            DmaRegister::TransCount(ch) => self.channels[ch as usize].trans_count,
            DmaRegister::CtrlTrig(ch) => self.poll_ctrl(ch),
            DmaRegister::ChanAbort => self.abort_pending,
        }
    }

    fn write(&mut self, reg: DmaRegister, value: u32) {
        match reg {
            DmaRegister::ReadAddr(ch) => self.channels[ch as usize].read_addr = value,
            DmaRegister::WriteAddr(ch) => self.channels[ch as usize].write_addr = value,
            DmaRegister::TransCount(ch) => self.channels[ch as usize].trans_count = value,
            DmaRegister::CtrlTrig(ch) => {
                let channel = &mut self.channels[ch as usize];
                channel.ctrl = value & !dma_ctrl::BUSY;
                self.trigger(ch);
            }
            DmaRegister::ChanAbort => self.abort(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_values() {
        let mut pio = SimulatedPio::default();
        assert_eq!(pio.read(Register::SmClkdiv(SmIndex::Sm0)), 0x0001_0000);
        assert_eq!(pio.read(Register::SmExecctrl(SmIndex::Sm1)), 0x0001_F000);
        assert_eq!(pio.read(Register::SmShiftctrl(SmIndex::Sm2)), 0x000C_0000);
        assert_eq!(pio.read(Register::Fstat), 0x0F00_0F00);
    }

    #[test]
    fn test_cfginfo() {
        assert_eq!(SimulatedPio::new(PioVersion::V0).read(Register::DbgCfginfo), 0x0020_0404);
        assert_eq!(SimulatedPio::new(PioVersion::V1).read(Register::DbgCfginfo), 0x1020_0404);
    }

    #[test]
    fn test_tx_overflow_sets_sticky_flag() {
        let mut pio = SimulatedPio::default();
        for value in 0..5 {
            pio.write(Register::Txf(SmIndex::Sm1), value);
        }
        assert_eq!(pio.read(Register::Fdebug), 1 << 17);
        assert_eq!(pio.read(Register::Flevel), 4 << 8);
        assert_eq!(pio.pop_tx(SmIndex::Sm1), Some(0));

        pio.write(Register::Fdebug, 1 << 17);
        assert_eq!(pio.read(Register::Fdebug), 0);
    }

    #[test]
    fn test_rx_underflow_reads_zero() {
        let mut pio = SimulatedPio::default();
        assert_eq!(pio.read(Register::Rxf(SmIndex::Sm3)), 0);
        assert_eq!(pio.read(Register::Fdebug), 1 << 11);
    }

    #[test]
    fn test_join_change_flushes() {
        let mut pio = SimulatedPio::default();
        let sm = SmIndex::Sm0;
        pio.write(Register::Txf(sm), 1);
        pio.push_rx(sm, 2);
        let value = pio.read(Register::SmShiftctrl(sm));
        pio.write(Register::SmShiftctrl(sm), value);
        assert_eq!(pio.read(Register::Flevel), 0x11);

        pio.write(Register::SmShiftctrl(sm), value | shiftctrl::FJOIN_RX);
        assert_eq!(pio.read(Register::Flevel), 0);
        for value in 0..8 {
            pio.push_rx(sm, value);
        }
        assert_eq!(pio.read(Register::Fstat) & 1, 1);
    }

    #[test]
    fn test_restart_bits_self_clear() {
        let mut pio = SimulatedPio::default();
        pio.write(Register::Ctrl, 0x0000_0FF3);
        assert_eq!(pio.read(Register::Ctrl), 0x3);
    }

    #[test]
    fn test_exec_records_and_jumps() {
        let mut pio = SimulatedPio::default();
        pio.write(Register::SmInstr(SmIndex::Sm2), 0x0013);
        pio.write(Register::SmInstr(SmIndex::Sm2), 0xA042);
        assert_eq!(pio.executed(SmIndex::Sm2), &[0x0013, 0xA042]);
        assert_eq!(pio.read(Register::SmAddr(SmIndex::Sm2)), 0x13);
    }

    #[test]
    fn test_set_pins_uses_set_field() {
        let mut pio = SimulatedPio::default();
        let sm = SmIndex::Sm0;
        pio.write(Register::SmPinctrl(sm), 3 << pinctrl::SET_COUNT_SHIFT | 30 << pinctrl::SET_BASE_SHIFT);
        // set pindirs, 0b101 wraps from pin 31 to pin 0
        pio.write(Register::SmInstr(sm), 0xE085);
        assert_eq!(pio.read(Register::DbgPadoe), 1 << 30 | 1);
    }

    #[test]
    fn test_dma_completes_after_polls() {
        let mut dma = SimulatedDma::new(2).completes_after(2);
        dma.write(DmaRegister::TransCount(1), 4);
        dma.write(DmaRegister::CtrlTrig(1), dma_ctrl::EN);
        assert_ne!(dma.read(DmaRegister::CtrlTrig(1)) & dma_ctrl::BUSY, 0);
        assert_ne!(dma.read(DmaRegister::CtrlTrig(1)) & dma_ctrl::BUSY, 0);
        assert_eq!(dma.read(DmaRegister::CtrlTrig(1)) & dma_ctrl::BUSY, 0);
        assert_eq!(dma.transfers()[0].count, 4);
    }

    #[test]
    fn test_dma_disabled_trigger_ignored() {
        let mut dma = SimulatedDma::new(1);
        dma.write(DmaRegister::CtrlTrig(0), 0);
        assert!(dma.transfers().is_empty());
    }

    #[test]
    fn test_dma_abort() {
        let mut dma = SimulatedDma::new(4).never_completes();
        dma.write(DmaRegister::CtrlTrig(3), dma_ctrl::EN);
        assert_ne!(dma.read(DmaRegister::CtrlTrig(3)) & dma_ctrl::BUSY, 0);
        dma.write(DmaRegister::ChanAbort, 1 << 3);
        assert_eq!(dma.read(DmaRegister::ChanAbort), 0);
        assert_eq!(dma.read(DmaRegister::CtrlTrig(3)) & dma_ctrl::BUSY, 0);
        assert_eq!(dma.aborts(), &[3]);
    }
}
