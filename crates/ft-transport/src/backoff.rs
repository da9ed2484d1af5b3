//! Capped exponential reconnect backoff.

use std::time::Duration;

use ft_core::TransportConfig;

/// Delay before reconnect attempt `n` (0-based) is
/// `min(base * 2^n, max)`.  After `max_attempts` delays have been handed out
/// the budget is spent and [`next_delay`][Self::next_delay] returns `None`.
#[derive(Clone, Debug)]
pub struct Backoff {
    base:         Duration,
    max:          Duration,
    max_attempts: u32,
    attempt:      u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Self { base, max, max_attempts, attempt: 0 }
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(config.base_delay(), config.max_delay(), config.max_attempts)
    }

    /// Delay for attempt `n`, without consuming it.
    pub fn delay_for(&self, n: u32) -> Duration {
        match 1u32.checked_shl(n).and_then(|f| self.base.checked_mul(f)) {
            Some(d) => d.min(self.max),
            None    => self.max,
        }
    }

    /// Consume one attempt.  `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.exhausted() {
            return None;
        }
        let d = self.delay_for(self.attempt);
        self.attempt += 1;
        Some(d)
    }

    #[inline]
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Attempts consumed since the last reset.
    #[inline]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    #[inline]
    pub fn exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}
