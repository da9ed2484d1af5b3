//! Engine configuration.
//!
//! Every field has a default, so callers only override what they care about.
//! With the `serde` feature the whole tree deserialises from a partial JSON
//! document (missing fields fall back to [`Default`]).

use std::time::Duration;

use crate::{CoreError, CoreResult, GeoBounds};

/// Accepted `tick_hz` range.
pub const TICK_HZ_RANGE: std::ops::RangeInclusive<f64> = 0.01..=1_000.0;

/// Longest timer any transport setting may ask for (one day).
pub const MAX_TIMER_MS: u64 = 86_400_000;

// ── Policies ──────────────────────────────────────────────────────────────────

/// What a routed entity does when it reaches the end of its route.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum LoopPolicy {
    /// Wrap progress back to the start of the route.
    #[default]
    Loop,
    /// Clamp to the final stop and set speed to zero.
    StopAtEnd,
}

impl LoopPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            LoopPolicy::Loop      => "loop",
            LoopPolicy::StopAtEnd => "stop-at-end",
        }
    }

    /// Parse the wire/CSV spelling (`loop`, `stop-at-end`).
    pub fn parse(s: &str) -> Option<LoopPolicy> {
        match s.trim() {
            "loop"                      => Some(LoopPolicy::Loop),
            "stop-at-end" | "stop_at_end" => Some(LoopPolicy::StopAtEnd),
            _                           => None,
        }
    }
}

impl std::fmt::Display for LoopPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How unrouted entities with zero speed behave.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ParkedPolicy {
    /// Zero-speed entities still receive the base jitter step.
    #[default]
    Jitter,
    /// Zero-speed entities do not move.
    Still,
}

/// What happens to per-entity route progress when a new roster arrives.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ProgressPolicy {
    /// Every entity restarts at progress 0.
    #[default]
    Reset,
    /// Entities whose id and route are unchanged keep their progress.
    PreserveById,
}

/// Where the tick loop runs.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ExecutionMode {
    /// Background thread if one can be spawned, otherwise foreground.
    #[default]
    Auto,
    /// Background thread only; failing to spawn is an error.
    Background,
    /// Always tick on the owner's frame callback.
    Foreground,
}

// ── WalkConfig ────────────────────────────────────────────────────────────────

/// Random-walk parameters for unrouted entities.
///
/// Step per tick, in degrees:
///
///   step = base_step_deg + speed_step_deg * min(speed_kph, 120) / 120
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WalkConfig {
    /// Minimum jitter applied every tick.  Default 0.000005° (≈0.5 m).
    pub base_step_deg: f64,
    /// Extra step at 120 km/h and above.  Default 0.000015° (≈1.7 m).
    pub speed_step_deg: f64,
    /// Optional service-area box the walk is clamped to.
    pub bounds: Option<GeoBounds>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            base_step_deg:  0.000_005,
            speed_step_deg: 0.000_015,
            bounds:         None,
        }
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Position-simulator configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Ticks per second.  Default: 20 (50 ms).
    pub tick_hz: f64,

    /// Loop policy for entities that do not carry their own.
    pub default_loop_policy: LoopPolicy,

    pub parked_policy: ParkedPolicy,

    pub progress_policy: ProgressPolicy,

    pub walk: WalkConfig,

    /// Master RNG seed.  `None` seeds from OS entropy.
    pub seed: Option<u64>,

    pub execution: ExecutionMode,

    /// Upper bound on the `dt` of a single foreground tick.  A frame that
    /// arrives late (tab hidden, debugger pause) advances at most this much.
    pub max_frame_dt_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_hz:             20.0,
            default_loop_policy: LoopPolicy::Loop,
            parked_policy:       ParkedPolicy::Jitter,
            progress_policy:     ProgressPolicy::Reset,
            walk:                WalkConfig::default(),
            seed:                None,
            execution:           ExecutionMode::Auto,
            max_frame_dt_ms:     250,
        }
    }
}

impl SimConfig {
    /// Nominal tick interval.  Falls back to the default 50 ms for a rate
    /// that [`validate`][Self::validate] would reject.
    pub fn tick_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.tick_hz)
            .ok()
            .filter(|_| TICK_HZ_RANGE.contains(&self.tick_hz))
            .unwrap_or(Duration::from_millis(50))
    }

    #[inline]
    pub fn max_frame_dt(&self) -> Duration {
        Duration::from_millis(self.max_frame_dt_ms)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if !TICK_HZ_RANGE.contains(&self.tick_hz) {
            return Err(CoreError::Config(format!(
                "tick_hz must be within {}..={}, got {}",
                TICK_HZ_RANGE.start(),
                TICK_HZ_RANGE.end(),
                self.tick_hz
            )));
        }
        if self.max_frame_dt_ms == 0 {
            return Err(CoreError::Config("max_frame_dt_ms must be > 0".into()));
        }
        if self.walk.base_step_deg < 0.0 || self.walk.speed_step_deg < 0.0 {
            return Err(CoreError::Config("walk steps must be non-negative".into()));
        }
        if let Some(b) = &self.walk.bounds {
            if b.lat_min > b.lat_max || b.lng_min > b.lng_max {
                return Err(CoreError::Config(format!("inverted walk bounds {b:?}")));
            }
        }
        Ok(())
    }
}

// ── TransportConfig ───────────────────────────────────────────────────────────

/// Transport-client configuration.  Durations are milliseconds so the JSON
/// form stays flat.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransportConfig {
    /// Ping interval while open.  Default: 30 s.
    pub keepalive_interval_ms: u64,

    /// First reconnect delay.  Default: 1 s.
    pub base_delay_ms: u64,

    /// Reconnect delay cap.  Default: 30 s.
    pub max_delay_ms: u64,

    /// Reconnect attempts before giving up with `reconnect_failed`.  Default: 10.
    pub max_attempts: u32,

    /// Give up on a single connection attempt after this long.  Default: 10 s.
    pub connect_timeout_ms: u64,

    /// Treat the channel as dead after this long without inbound traffic.
    /// `None` disables the check.  Default: 75 s (two missed pongs).
    pub liveness_timeout_ms: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            keepalive_interval_ms: 30_000,
            base_delay_ms:         1_000,
            max_delay_ms:          30_000,
            max_attempts:          10,
            connect_timeout_ms:    10_000,
            liveness_timeout_ms:   Some(75_000),
        }
    }
}

impl TransportConfig {
    #[inline]
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    #[inline]
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    #[inline]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[inline]
    pub fn liveness_timeout(&self) -> Option<Duration> {
        self.liveness_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.keepalive_interval_ms == 0 {
            return Err(CoreError::Config("keepalive_interval_ms must be > 0".into()));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(CoreError::Config(format!(
                "base_delay_ms ({}) exceeds max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        let timers = [
            ("keepalive_interval_ms", Some(self.keepalive_interval_ms)),
            ("max_delay_ms", Some(self.max_delay_ms)),
            ("connect_timeout_ms", Some(self.connect_timeout_ms)),
            ("liveness_timeout_ms", self.liveness_timeout_ms),
        ];
        for (name, ms) in timers {
            if ms.is_some_and(|ms| ms > MAX_TIMER_MS) {
                return Err(CoreError::Config(format!("{name} exceeds {MAX_TIMER_MS} ms")));
            }
        }
        Ok(())
    }
}

// ── EngineConfig ──────────────────────────────────────────────────────────────

/// Top-level configuration: one section per subsystem.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    pub sim:       SimConfig,
    pub transport: TransportConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> CoreResult<()> {
        self.sim.validate()?;
        self.transport.validate()
    }
}
