//! Blocking FIFO access
//!
//! Polls FIFO status and yields the thread between polls until the FIFO is
//! ready, the retry budget runs out, or the wall-clock deadline passes.

use crate::error::{PioError, Result};
use crate::regs::PioRegisters;
use crate::state_machine::StateMachine;
use std::time::{Duration, Instant};

/// Bounds for blocking waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockingConfig {
    /// Status polls after the first one before giving up
    pub max_retries: u32,

    /// Wall-clock limit; `None` waits on the retry budget alone
    pub timeout: Option<Duration>,
}

impl BlockingConfig {
    pub const DEFAULT_RETRIES: u32 = 65535 * 8;

    /// Only a wall-clock limit
    pub fn with_timeout(timeout: Duration) -> Self {
        BlockingConfig { max_retries: u32::MAX, timeout: Some(timeout) }
    }

    /// Only a retry budget
    pub fn with_retries(max_retries: u32) -> Self {
        BlockingConfig { max_retries, timeout: None }
    }
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            max_retries: Self::DEFAULT_RETRIES,
            timeout: None,
        }
    }
}

/// Remaining budget of one blocking operation
#[derive(Debug)]
pub(crate) struct Deadline {
    retries: u32,
    until: Option<Instant>,
}

impl Deadline {
    pub(crate) fn start(config: &BlockingConfig) -> Self {
        Deadline {
            retries: config.max_retries,
            until: config.timeout.map(|timeout| Instant::now() + timeout),
        }
    }

    /// Poll `ready` until it returns true. Returns false once the budget is
    /// spent; the remaining budget carries over to the next wait.
    pub(crate) fn wait(&mut self, mut ready: impl FnMut() -> bool) -> bool {
        loop {
            if ready() {
                return true;
            }
            if self.retries == 0 || self.until.is_some_and(|until| Instant::now() >= until) {
                return false;
            }
            self.retries -= 1;
            std::thread::yield_now();
        }
    }
}

impl<R: PioRegisters> StateMachine<'_, R> {
    /// Write to the TX FIFO once it has space
    pub fn put_blocking(&mut self, value: u32, config: &BlockingConfig) -> Result<()> {
        let mut deadline = Deadline::start(config);
        if !deadline.wait(|| !self.is_tx_full()) {
            tracing::warn!(sm = %self.index(), "TX FIFO full, put timed out");
            return Err(PioError::Timeout { operation: "put_blocking" });
        }
        self.put(value);
        Ok(())
    }

    /// Read from the RX FIFO once it has data
    pub fn get_blocking(&mut self, config: &BlockingConfig) -> Result<u32> {
        let mut deadline = Deadline::start(config);
        if !deadline.wait(|| !self.is_rx_empty()) {
            tracing::warn!(sm = %self.index(), "RX FIFO empty, get timed out");
            return Err(PioError::Timeout { operation: "get_blocking" });
        }
        Ok(self.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::PioBlock;
    use crate::sim::SimulatedPio;
    use crate::state_machine::SmIndex;
    use pio_spec::PioVersion;

    fn block() -> PioBlock<SimulatedPio> {
        PioBlock::new(SimulatedPio::default(), 0, PioVersion::V0)
    }

    #[test]
    fn test_default_budget() {
        let config = BlockingConfig::default();
        assert_eq!(config.max_retries, 524_280);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_deadline_counts_retries() {
        let mut polls = 0;
        let mut deadline = Deadline::start(&BlockingConfig::with_retries(3));
        assert!(!deadline.wait(|| {
            polls += 1;
            false
        }));
        assert_eq!(polls, 4);

        // Budget is spent, one more check only
        polls = 0;
        assert!(!deadline.wait(|| {
            polls += 1;
            false
        }));
        assert_eq!(polls, 1);
    }

    #[test]
    fn test_deadline_wall_clock() {
        let mut deadline = Deadline::start(&BlockingConfig::with_timeout(Duration::from_millis(5)));
        let started = Instant::now();
        assert!(!deadline.wait(|| false));
        assert!(started.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn test_put_blocking_when_space() {
        let mut pio = block();
        let mut sm = pio.state_machine(SmIndex::Sm0);
        sm.put_blocking(42, &BlockingConfig::default()).unwrap();
        assert_eq!(sm.tx_level(), 1);
    }

    #[test]
    fn test_put_blocking_times_out_when_full() {
        let mut pio = block();
        let mut sm = pio.state_machine(SmIndex::Sm0);
        for value in 0..4 {
            sm.put(value);
        }
        let err = sm.put_blocking(4, &BlockingConfig::with_retries(10)).unwrap_err();
        assert_eq!(err, PioError::Timeout { operation: "put_blocking" });
        assert_eq!(sm.tx_level(), 4);
        assert!(!sm.debug_flags().0);
    }

    #[test]
    fn test_get_blocking() {
        let mut pio = block();
        pio.registers_mut().push_rx(SmIndex::Sm1, 7);
        let mut sm = pio.state_machine(SmIndex::Sm1);
        assert_eq!(sm.get_blocking(&BlockingConfig::default()).unwrap(), 7);
        assert!(matches!(
            sm.get_blocking(&BlockingConfig::with_timeout(Duration::from_millis(1))),
            Err(PioError::Timeout { .. })
        ));
    }
}
