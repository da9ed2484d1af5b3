//! Simulation time model.
//!
//! Time is a monotonically increasing `Tick` counter.  `TickClock` maps it to
//! simulated elapsed time at the configured tick interval:
//!
//!   elapsed_ms = tick * tick_interval_ms
//!
//! The tick count stamps every roster update so renderers can drop stale
//! batches.  The `dt` handed to the motion step is *not* derived from the
//! tick: the foreground driver measures real frame time instead.

use std::fmt;
use std::time::Duration;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    #[inline]
    pub fn next(self) -> Tick {
        Tick(self.0 + 1)
    }

    /// Ticks elapsed from `earlier` to `self` (saturating).
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── TickClock ─────────────────────────────────────────────────────────────────

/// Tracks the current tick and the nominal tick interval.
#[derive(Clone, Debug)]
pub struct TickClock {
    /// Nominal length of one tick.
    pub interval: Duration,
    /// The current tick, advanced by [`TickClock::advance`] after each step.
    pub current_tick: Tick,
}

impl TickClock {
    pub fn new(interval: Duration) -> Self {
        Self { interval, current_tick: Tick::ZERO }
    }

    /// Build a clock for `hz` ticks per second.  `hz` is floored at 1e-3 so a
    /// zero frequency cannot produce an infinite interval.
    pub fn from_hz(hz: f64) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / hz.max(1e-3)))
    }

    #[inline]
    pub fn advance(&mut self) -> Tick {
        self.current_tick = self.current_tick.next();
        self.current_tick
    }

    /// Nominal `dt` in seconds.
    #[inline]
    pub fn dt_secs(&self) -> f64 {
        self.interval.as_secs_f64()
    }

    /// Nominal simulated time since tick 0.
    pub fn elapsed(&self) -> Duration {
        self.interval.saturating_mul(self.current_tick.0.min(u32::MAX as u64) as u32)
    }
}

impl fmt::Display for TickClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (+{:.2}s)", self.current_tick, self.elapsed().as_secs_f64())
    }
}
