//! Foreground tick driver: frame-paced stepping on the owner's thread.

use std::time::{Duration, Instant};

use ft_core::RosterUpdate;

use crate::PositionSimulator;

/// Runs the simulator from the host's render loop.
///
/// [`on_frame`][Self::on_frame] performs at most one tick per call, and
/// only once a full tick interval has elapsed since the previous tick.  The
/// step covers the real elapsed time, capped at `max_frame_dt` so a stalled
/// host does not teleport entities.
pub struct ForegroundDriver {
    sim:      PositionSimulator,
    interval: Duration,
    max_dt:   Duration,
    last:     Option<Instant>,
}

impl ForegroundDriver {
    pub fn new(sim: PositionSimulator) -> Self {
        let interval = sim.config().tick_interval();
        let max_dt = sim.config().max_frame_dt();
        Self { sim, interval, max_dt, last: None }
    }

    /// Called once per host frame.  Returns the new roster when a tick ran.
    ///
    /// The first frame only records the time.
    pub fn on_frame(&mut self, now: Instant) -> Option<RosterUpdate> {
        let Some(last) = self.last else {
            self.last = Some(now);
            return None;
        };
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.interval {
            return None;
        }
        self.last = Some(now);
        Some(self.sim.step(elapsed.min(self.max_dt)))
    }

    #[inline]
    pub fn simulator(&self) -> &PositionSimulator {
        &self.sim
    }

    #[inline]
    pub fn simulator_mut(&mut self) -> &mut PositionSimulator {
        &mut self.sim
    }

    pub fn into_simulator(self) -> PositionSimulator {
        self.sim
    }
}
