//! `ft-core` — foundational types for the `ft` fleet engine.
//!
//! This crate is a dependency of every other `ft-*` crate.  It has no `ft-*`
//! dependencies and minimal external ones (only `rand` and `thiserror`, plus
//! optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                  |
//! |-----------------|-----------------------------------------------------------|
//! | [`ids`]         | `EntityId`, `RouteId`                                     |
//! | [`geo`]         | `LatLng`, haversine distance, `GeoBounds`                 |
//! | [`time`]        | `Tick`, `TickClock`                                       |
//! | [`rng`]         | `EntityRng` (per-entity), `SimRng` (global)               |
//! | [`entity`]      | `TrackedEntity`, `RouteRef`, `RosterUpdate`               |
//! | [`config`]      | `EngineConfig`, `SimConfig`, `TransportConfig`, policies  |
//! | [`error`]       | `CoreError`, `CoreResult`                                 |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod entity;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{
    EngineConfig, ExecutionMode, LoopPolicy, ParkedPolicy, ProgressPolicy, SimConfig,
    TransportConfig, WalkConfig,
};
pub use entity::{RosterUpdate, RouteRef, TrackedEntity};
pub use error::{CoreError, CoreResult};
pub use geo::{GeoBounds, LatLng, EARTH_RADIUS_M};
pub use ids::{EntityId, RouteId};
pub use rng::{EntityRng, SimRng};
pub use time::{Tick, TickClock};
