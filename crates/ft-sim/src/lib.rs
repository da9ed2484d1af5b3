//! `ft-sim` — position simulator for the ft fleet engine.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                   |
//! |----------------|------------------------------------------------------------|
//! | [`motion`]     | `step_entity` — the one per-entity step both drivers share |
//! | [`state`]      | `EntityState` — roster entry + progress, profile, RNG      |
//! | [`simulator`]  | `PositionSimulator` — roster ownership and the tick        |
//! | [`worker`]     | `BackgroundWorker` — the simulator on its own OS thread    |
//! | [`foreground`] | `ForegroundDriver` — frame-paced stepping                  |
//! | [`driver`]     | `SimDriver` — driver choice, fallback, bus publishing      |
//! | [`loader`]     | CSV → roster                                               |
//! | [`error`]      | `SimError`, `MotionError`, `SimResult<T>`                  |
//!
//! # Tick
//!
//! ```text
//! for every entity:
//!   parked            → unchanged
//!   usable profile    → progress += speed·dt, Loop wraps / StopAtEnd clamps,
//!                       position = profile.locate(progress)
//!   otherwise         → random-walk step (uniform heading, speed-scaled)
//! emit RosterUpdate { tick, entities }
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `parallel` | Runs the per-entity step on Rayon's thread pool.        |
//! | `fx-hash`  | FxHash for the route-profile cache.                     |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use ft_bus::EngineBus;
//! use ft_core::SimConfig;
//! use ft_sim::SimDriver;
//!
//! let bus = EngineBus::new();
//! let mut driver = SimDriver::start(SimConfig::default(), routes, bus.clone())?;
//! driver.set_roster(roster)?;
//! loop {
//!     driver.on_frame(std::time::Instant::now());
//!     // render …
//! }
//! ```

pub mod driver;
pub mod error;
pub mod foreground;
pub mod loader;
pub mod motion;
pub mod simulator;
pub mod state;
pub mod worker;


pub use driver::{DriverMode, SimDriver};
pub use error::{MotionError, SimError, SimResult};
pub use foreground::ForegroundDriver;
pub use loader::{load_roster_csv, load_roster_reader};
pub use motion::{advance_on_route, random_walk, step_entity, MotionParams, RouteAdvance};
pub use simulator::PositionSimulator;
pub use state::{EntityState, ProfileSlot};
pub use worker::{BackgroundWorker, OsThreads, Spawn};
