//! # Clock Divider
//!
//! Each state machine runs at `f_sys / (whole + frac / 256)`. The divisor is a
//! 16.8 fixed-point number; all derivations work on the raw value
//! `256 * divisor` and floor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Divisor could not be represented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClockDivError {
    /// Requested state machine clock is faster than the system clock
    #[error("Clock divisor too small: target frequency exceeds system frequency")]
    TooSmall,

    /// Requested state machine clock needs a divisor above 65535
    #[error("Clock divisor too large: target frequency below system frequency / 65535")]
    TooLarge,
}

/// State machine clock divisor: 16-bit integer part, 8-bit fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClockDivisor {
    pub whole: u16,
    pub frac: u8,
}

impl ClockDivisor {
    /// Run at the system clock
    pub const ONE: ClockDivisor = ClockDivisor { whole: 1, frac: 0 };

    /// Slowest divisor the derivations produce
    pub const MAX: ClockDivisor = ClockDivisor { whole: u16::MAX, frac: 0 };

    /// Raw value of [`ClockDivisor::ONE`]
    pub const RAW_MIN: u64 = 256;

    /// Raw value of [`ClockDivisor::MAX`]
    pub const RAW_MAX: u64 = 256 * u16::MAX as u64;

    /// INT field: bits 31:16 of CLKDIV
    pub const INT_SHIFT: u32 = 16;

    /// FRAC field: bits 15:8 of CLKDIV
    pub const FRAC_SHIFT: u32 = 8;

    pub const fn new(whole: u16, frac: u8) -> Self {
        ClockDivisor { whole, frac }
    }

    /// Split a raw `256 * divisor` value, rejecting values outside `1.0..=65535.0`.
    pub fn from_raw(raw: u64) -> Result<Self, ClockDivError> {
        if raw < Self::RAW_MIN {
            return Err(ClockDivError::TooSmall);
        }
        if raw > Self::RAW_MAX {
            return Err(ClockDivError::TooLarge);
        }
        Ok(ClockDivisor {
            whole: (raw / 256) as u16,
            frac: (raw % 256) as u8,
        })
    }

    /// Divisor that runs a state machine at `target_hz` from `system_hz`.
    ///
    /// A zero target would need an infinite divisor and reports `TooLarge`.
    pub fn from_frequency(target_hz: u32, system_hz: u32) -> Result<Self, ClockDivError> {
        if target_hz == 0 {
            return Err(ClockDivError::TooLarge);
        }
        let raw = 256 * system_hz as u64 / target_hz as u64;
        Self::from_raw(raw)
    }

    /// Divisor that makes one state machine cycle last `period_ns`.
    pub fn from_period(period_ns: u32, system_hz: u32) -> Result<Self, ClockDivError> {
        // 256 * u32 * u32 overflows u64
        let raw = 256 * period_ns as u128 * system_hz as u128 / 1_000_000_000;
        match u64::try_from(raw) {
            Ok(raw) => Self::from_raw(raw),
            Err(_) => Err(ClockDivError::TooLarge),
        }
    }

    /// `256 * divisor`. A zero integer part divides by 65536.
    pub const fn raw(self) -> u64 {
        let whole = if self.whole == 0 { 65536 } else { self.whole as u64 };
        whole * 256 + self.frac as u64
    }

    /// State machine clock resulting from this divisor
    pub fn effective_frequency(self, system_hz: u32) -> u32 {
        (256 * system_hz as u64 / self.raw()) as u32
    }

    /// CLKDIV register image
    pub const fn to_register(self) -> u32 {
        (self.whole as u32) << Self::INT_SHIFT | (self.frac as u32) << Self::FRAC_SHIFT
    }

    pub const fn from_register(clkdiv: u32) -> Self {
        ClockDivisor {
            whole: (clkdiv >> Self::INT_SHIFT) as u16,
            frac: (clkdiv >> Self::FRAC_SHIFT) as u8,
        }
    }
}

impl Default for ClockDivisor {
    fn default() -> Self {
        Self::ONE
    }
}

impl std::fmt::Display for ClockDivisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} + {}/256", self.whole, self.frac)
    }
}
