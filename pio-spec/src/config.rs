//! # State Machine Configuration
//!
//! Four 32-bit register images (CLKDIV, EXECCTRL, SHIFTCTRL, PINCTRL) built
//! with consuming setters. Each setter clears its own field and ORs in the new
//! value, so setters on disjoint fields commute. Nothing here touches hardware;
//! the runtime applies the images to a state machine.
//!
//! Out-of-range arguments are contract violations and panic.

use crate::clock::ClockDivisor;
use crate::{PioVersion, INSTRUCTION_MEMORY_SIZE, NUM_PINS};
use serde::{Deserialize, Serialize};

// ============================================================================
// Register Fields
// ============================================================================

/// EXECCTRL bit fields
pub mod execctrl {
    pub const EXEC_STALLED: u32 = 1 << 31;
    pub const SIDE_EN: u32 = 1 << 30;
    pub const SIDE_PINDIR: u32 = 1 << 29;
    pub const JMP_PIN_SHIFT: u32 = 24;
    pub const JMP_PIN_MASK: u32 = 0x1F << JMP_PIN_SHIFT;
    pub const OUT_EN_SEL_SHIFT: u32 = 19;
    pub const OUT_EN_SEL_MASK: u32 = 0x1F << OUT_EN_SEL_SHIFT;
    pub const INLINE_OUT_EN: u32 = 1 << 18;
    pub const OUT_STICKY: u32 = 1 << 17;
    pub const WRAP_TOP_SHIFT: u32 = 12;
    pub const WRAP_TOP_MASK: u32 = 0x1F << WRAP_TOP_SHIFT;
    pub const WRAP_BOTTOM_SHIFT: u32 = 7;
    pub const WRAP_BOTTOM_MASK: u32 = 0x1F << WRAP_BOTTOM_SHIFT;

    /// V0: STATUS_SEL is bit 4, STATUS_N bits 3:0
    pub const V0_STATUS_SEL_SHIFT: u32 = 4;
    pub const V0_STATUS_SEL_MASK: u32 = 0x1 << V0_STATUS_SEL_SHIFT;
    pub const V0_STATUS_N_MASK: u32 = 0xF;

    /// V1: STATUS_SEL is bits 6:5, STATUS_N bits 4:0
    pub const V1_STATUS_SEL_SHIFT: u32 = 5;
    pub const V1_STATUS_SEL_MASK: u32 = 0x3 << V1_STATUS_SEL_SHIFT;
    pub const V1_STATUS_N_MASK: u32 = 0x1F;
}

/// SHIFTCTRL bit fields
pub mod shiftctrl {
    pub const FJOIN_RX: u32 = 1 << 31;
    pub const FJOIN_TX: u32 = 1 << 30;
    pub const FJOIN_SHIFT: u32 = 30;
    pub const PULL_THRESH_SHIFT: u32 = 25;
    pub const PULL_THRESH_MASK: u32 = 0x1F << PULL_THRESH_SHIFT;
    pub const PUSH_THRESH_SHIFT: u32 = 20;
    pub const PUSH_THRESH_MASK: u32 = 0x1F << PUSH_THRESH_SHIFT;
    pub const OUT_SHIFTDIR: u32 = 1 << 19;
    pub const IN_SHIFTDIR: u32 = 1 << 18;
    pub const AUTOPULL: u32 = 1 << 17;
    pub const AUTOPUSH: u32 = 1 << 16;

    /// V1 only
    pub const FJOIN_RX_PUT: u32 = 1 << 15;
    /// V1 only
    pub const FJOIN_RX_GET: u32 = 1 << 14;
    /// V1 only
    pub const IN_COUNT_MASK: u32 = 0x1F;
}

/// PINCTRL bit fields
pub mod pinctrl {
    pub const SIDESET_COUNT_SHIFT: u32 = 29;
    pub const SIDESET_COUNT_MASK: u32 = 0x7 << SIDESET_COUNT_SHIFT;
    pub const SET_COUNT_SHIFT: u32 = 26;
    pub const SET_COUNT_MASK: u32 = 0x7 << SET_COUNT_SHIFT;
    pub const OUT_COUNT_SHIFT: u32 = 20;
    pub const OUT_COUNT_MASK: u32 = 0x3F << OUT_COUNT_SHIFT;
    pub const IN_BASE_SHIFT: u32 = 15;
    pub const IN_BASE_MASK: u32 = 0x1F << IN_BASE_SHIFT;
    pub const SIDESET_BASE_SHIFT: u32 = 10;
    pub const SIDESET_BASE_MASK: u32 = 0x1F << SIDESET_BASE_SHIFT;
    pub const SET_BASE_SHIFT: u32 = 5;
    pub const SET_BASE_MASK: u32 = 0x1F << SET_BASE_SHIFT;
    pub const OUT_BASE_SHIFT: u32 = 0;
    pub const OUT_BASE_MASK: u32 = 0x1F;
}

// ============================================================================
// Modes
// ============================================================================

/// FIFO joining mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FifoJoin {
    /// Separate 4-deep TX and RX FIFOs
    #[default]
    None,
    /// One 8-deep TX FIFO
    Tx,
    /// One 8-deep RX FIFO
    Rx,
    /// V1: TX FIFO only; RX FIFO readable by the state machine as registers
    TxGet,
    /// V1: TX FIFO only; RX FIFO writable by the state machine as registers
    TxPut,
    /// V1: no host FIFOs; RX FIFO is a register file the state machine reads and writes
    PutGet,
}

impl FifoJoin {
    pub const fn min_version(self) -> PioVersion {
        match self {
            FifoJoin::None | FifoJoin::Tx | FifoJoin::Rx => PioVersion::V0,
            _ => PioVersion::V1,
        }
    }

    /// SHIFTCTRL bits selecting this mode
    pub const fn shiftctrl_bits(self) -> u32 {
        match self {
            FifoJoin::None => 0,
            FifoJoin::Tx => 1 << shiftctrl::FJOIN_SHIFT,
            FifoJoin::Rx => 2 << shiftctrl::FJOIN_SHIFT,
            FifoJoin::TxGet => shiftctrl::FJOIN_RX_GET,
            FifoJoin::TxPut => shiftctrl::FJOIN_RX_PUT,
            FifoJoin::PutGet => shiftctrl::FJOIN_RX_GET | shiftctrl::FJOIN_RX_PUT,
        }
    }
}

/// Source of `mov x, status`
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovStatus {
    /// All ones while the TX FIFO level is below N
    TxLessThan = 0,
    /// All ones while the RX FIFO level is below N
    RxLessThan = 1,
    /// V1: all ones while IRQ flag N is set
    Irq = 2,
}

// ============================================================================
// StateMachineConfig
// ============================================================================

/// Register images for one state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateMachineConfig {
    pub clkdiv: u32,
    pub execctrl: u32,
    pub shiftctrl: u32,
    pub pinctrl: u32,
    /// Generation whose register layout the images follow
    pub version: PioVersion,
}

impl StateMachineConfig {
    /// All-zero images. `init` replaces this placeholder with the default.
    pub const ZERO: StateMachineConfig = StateMachineConfig {
        clkdiv: 0,
        execctrl: 0,
        shiftctrl: 0,
        pinctrl: 0,
        version: PioVersion::V0,
    };

    /// Default configuration for a generation: divisor 1, wrap 0..31,
    /// both shifts right, no autopush/autopull, thresholds 32.
    pub fn default_for(version: PioVersion) -> Self {
        StateMachineConfig { version, ..Self::ZERO }
            .set_clkdiv_int_frac(1, 0)
            .set_wrap(0, 31)
            .set_in_shift(true, false, 32)
            .set_out_shift(true, false, 32)
    }

    /// Check whether all four images are zero
    pub fn is_placeholder(&self) -> bool {
        self.clkdiv == 0 && self.execctrl == 0 && self.shiftctrl == 0 && self.pinctrl == 0
    }

    fn require(&self, required: PioVersion, what: &str) {
        assert!(
            self.version >= required,
            "{} requires PIO {:?}, config targets {:?}",
            what,
            required,
            self.version
        );
    }

    // ========== Clock ==========

    pub fn set_clock_divisor(mut self, divisor: ClockDivisor) -> Self {
        self.clkdiv = divisor.to_register();
        self
    }

    /// Frequency = clock freq / (whole + frac / 256)
    pub fn set_clkdiv_int_frac(self, whole: u16, frac: u8) -> Self {
        self.set_clock_divisor(ClockDivisor::new(whole, frac))
    }

    pub fn clock_divisor(&self) -> ClockDivisor {
        ClockDivisor::from_register(self.clkdiv)
    }

    // ========== EXECCTRL ==========

    /// Wrap from `top` back to `target` (both absolute addresses)
    pub fn set_wrap(mut self, target: u8, top: u8) -> Self {
        assert!(
            (target as usize) < INSTRUCTION_MEMORY_SIZE && (top as usize) < INSTRUCTION_MEMORY_SIZE,
            "wrap bounds out of range: target {}, top {}",
            target,
            top
        );
        self.execctrl = (self.execctrl & !(execctrl::WRAP_TOP_MASK | execctrl::WRAP_BOTTOM_MASK))
            | (target as u32) << execctrl::WRAP_BOTTOM_SHIFT
            | (top as u32) << execctrl::WRAP_TOP_SHIFT;
        self
    }

    /// Wrap `(target, top)`
    pub fn wrap(&self) -> (u8, u8) {
        (
            ((self.execctrl & execctrl::WRAP_BOTTOM_MASK) >> execctrl::WRAP_BOTTOM_SHIFT) as u8,
            ((self.execctrl & execctrl::WRAP_TOP_MASK) >> execctrl::WRAP_TOP_SHIFT) as u8,
        )
    }

    /// Side-set parameters
    ///   - `bit_count` is the number of bits taken from the delay field, enable bit included (max 5)
    ///   - `optional` makes the top side-set bit an enable flag
    ///   - `pindirs` applies side-set to pin directions instead of values
    pub fn set_sideset_params(mut self, bit_count: u8, optional: bool, pindirs: bool) -> Self {
        assert!(bit_count <= 5, "side-set bit count {} exceeds 5", bit_count);
        self.pinctrl = (self.pinctrl & !pinctrl::SIDESET_COUNT_MASK)
            | (bit_count as u32) << pinctrl::SIDESET_COUNT_SHIFT;
        self.execctrl = (self.execctrl & !(execctrl::SIDE_EN | execctrl::SIDE_PINDIR))
            | if optional { execctrl::SIDE_EN } else { 0 }
            | if pindirs { execctrl::SIDE_PINDIR } else { 0 };
        self
    }

    /// GPIO used by `jmp pin` and `wait jmppin`
    pub fn set_jmp_pin(mut self, pin: u8) -> Self {
        check_pin_base_and_count(pin, 1);
        self.execctrl = (self.execctrl & !execctrl::JMP_PIN_MASK)
            | (pin as u32) << execctrl::JMP_PIN_SHIFT;
        self
    }

    /// Special OUT behaviour
    ///   - `sticky` re-asserts the most recent OUT/SET pin values on later cycles
    ///   - `has_enable_pin` uses a bit of OUT data as an auxiliary output enable
    ///   - `enable_pin` is the OUT data bit used as that enable
    pub fn set_out_special(mut self, sticky: bool, has_enable_pin: bool, enable_pin: u8) -> Self {
        check_pin_base_and_count(enable_pin, 1);
        self.execctrl = (self.execctrl
            & !(execctrl::OUT_STICKY | execctrl::INLINE_OUT_EN | execctrl::OUT_EN_SEL_MASK))
            | if sticky { execctrl::OUT_STICKY } else { 0 }
            | if has_enable_pin { execctrl::INLINE_OUT_EN } else { 0 }
            | (enable_pin as u32) << execctrl::OUT_EN_SEL_SHIFT;
        self
    }

    /// Source for `mov x, status`; `n` is a FIFO level or, on V1, an IRQ flag
    pub fn set_mov_status(mut self, status: MovStatus, n: u8) -> Self {
        let (sel_shift, sel_mask, n_mask) = match self.version {
            PioVersion::V0 => {
                assert!(status != MovStatus::Irq, "mov status IRQ requires PIO V1");
                (
                    execctrl::V0_STATUS_SEL_SHIFT,
                    execctrl::V0_STATUS_SEL_MASK,
                    execctrl::V0_STATUS_N_MASK,
                )
            }
            PioVersion::V1 => (
                execctrl::V1_STATUS_SEL_SHIFT,
                execctrl::V1_STATUS_SEL_MASK,
                execctrl::V1_STATUS_N_MASK,
            ),
        };
        assert!((n as u32) <= n_mask, "mov status N {} out of range", n);
        self.execctrl = (self.execctrl & !(sel_mask | n_mask))
            | (status as u32) << sel_shift
            | n as u32;
        self
    }

    // ========== SHIFTCTRL ==========

    /// IN shift parameters. `threshold` is 1..=32; 32 is stored as 0.
    pub fn set_in_shift(mut self, shift_right: bool, autopush: bool, threshold: u8) -> Self {
        check_threshold(threshold);
        self.shiftctrl = (self.shiftctrl
            & !(shiftctrl::IN_SHIFTDIR | shiftctrl::AUTOPUSH | shiftctrl::PUSH_THRESH_MASK))
            | if shift_right { shiftctrl::IN_SHIFTDIR } else { 0 }
            | if autopush { shiftctrl::AUTOPUSH } else { 0 }
            | ((threshold as u32) & 0x1F) << shiftctrl::PUSH_THRESH_SHIFT;
        self
    }

    /// OUT shift parameters. `threshold` is 1..=32; 32 is stored as 0.
    pub fn set_out_shift(mut self, shift_right: bool, autopull: bool, threshold: u8) -> Self {
        check_threshold(threshold);
        self.shiftctrl = (self.shiftctrl
            & !(shiftctrl::OUT_SHIFTDIR | shiftctrl::AUTOPULL | shiftctrl::PULL_THRESH_MASK))
            | if shift_right { shiftctrl::OUT_SHIFTDIR } else { 0 }
            | if autopull { shiftctrl::AUTOPULL } else { 0 }
            | ((threshold as u32) & 0x1F) << shiftctrl::PULL_THRESH_SHIFT;
        self
    }

    pub fn set_fifo_join(mut self, join: FifoJoin) -> Self {
        self.require(join.min_version(), "FIFO join mode");
        self.shiftctrl = (self.shiftctrl
            & !(shiftctrl::FJOIN_TX
                | shiftctrl::FJOIN_RX
                | shiftctrl::FJOIN_RX_PUT
                | shiftctrl::FJOIN_RX_GET))
            | join.shiftctrl_bits();
        self
    }

    pub fn fifo_join(&self) -> FifoJoin {
        let get = self.shiftctrl & shiftctrl::FJOIN_RX_GET != 0;
        let put = self.shiftctrl & shiftctrl::FJOIN_RX_PUT != 0;
        match (put, get) {
            (true, true) => FifoJoin::PutGet,
            (true, false) => FifoJoin::TxPut,
            (false, true) => FifoJoin::TxGet,
            (false, false) => match self.shiftctrl >> shiftctrl::FJOIN_SHIFT {
                1 => FifoJoin::Tx,
                2 => FifoJoin::Rx,
                _ => FifoJoin::None,
            },
        }
    }

    // ========== PINCTRL ==========

    /// Lowest pin driven by side-set. The side-set width itself comes from
    /// [`StateMachineConfig::set_sideset_params`]; `count` is only range checked.
    pub fn set_sideset_pins(mut self, base: u8, count: u8) -> Self {
        check_pin_base_and_count(base, count);
        assert!(count <= 5, "side-set pin count {} exceeds 5", count);
        self.pinctrl = (self.pinctrl & !pinctrl::SIDESET_BASE_MASK)
            | (base as u32) << pinctrl::SIDESET_BASE_SHIFT;
        self
    }

    /// Pins written by OUT PINS, OUT PINDIRS and MOV PINS (count 0..=32)
    pub fn set_out_pins(mut self, base: u8, count: u8) -> Self {
        check_pin_base_and_count(base, count);
        self.pinctrl = (self.pinctrl & !(pinctrl::OUT_BASE_MASK | pinctrl::OUT_COUNT_MASK))
            | (base as u32) << pinctrl::OUT_BASE_SHIFT
            | (count as u32) << pinctrl::OUT_COUNT_SHIFT;
        self
    }

    /// Pins written by SET PINS and SET PINDIRS (count 0..=5)
    pub fn set_set_pins(mut self, base: u8, count: u8) -> Self {
        check_pin_base_and_count(base, count);
        assert!(count <= 5, "set pin count {} exceeds 5", count);
        self.pinctrl = (self.pinctrl & !(pinctrl::SET_BASE_MASK | pinctrl::SET_COUNT_MASK))
            | (base as u32) << pinctrl::SET_BASE_SHIFT
            | (count as u32) << pinctrl::SET_COUNT_SHIFT;
        self
    }

    /// Pins read by IN PINS and WAIT PIN. V1 also masks reads to `count` pins;
    /// V0 reads all 32 and only range checks `count`.
    pub fn set_in_pins(mut self, base: u8, count: u8) -> Self {
        check_pin_base_and_count(base, count);
        self.pinctrl = (self.pinctrl & !pinctrl::IN_BASE_MASK)
            | (base as u32) << pinctrl::IN_BASE_SHIFT;
        if self.version >= PioVersion::V1 {
            self.shiftctrl = (self.shiftctrl & !shiftctrl::IN_COUNT_MASK)
                | (count as u32 & shiftctrl::IN_COUNT_MASK);
        }
        self
    }
}

impl Default for StateMachineConfig {
    fn default() -> Self {
        Self::default_for(PioVersion::V0)
    }
}

impl std::fmt::Display for StateMachineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "clkdiv={:#010x} execctrl={:#010x} shiftctrl={:#010x} pinctrl={:#010x}",
            self.clkdiv, self.execctrl, self.shiftctrl, self.pinctrl
        )
    }
}

fn check_pin_base_and_count(base: u8, count: u8) {
    assert!(base < NUM_PINS, "bad pin {}", base);
    assert!(count <= NUM_PINS, "pin count {} too large", count);
}

fn check_threshold(threshold: u8) {
    assert!(
        (1..=32).contains(&threshold),
        "shift threshold {} outside 1..=32",
        threshold
    );
}
