//! `ft-route` — route geometry for the position simulator.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                      |
//! |-------------|---------------------------------------------------------------|
//! | [`profile`] | `RouteProfile` — stops, segment lengths, cumulative distance  |
//! | [`cache`]   | `RouteKey`, `ProfileCache` — build each profile once          |
//! | [`set`]     | `RouteSet` — named stop lists                                 |
//! | [`loader`]  | CSV → `RouteSet`                                              |
//! | [`error`]   | `RouteError`, `RouteResult<T>`                                |
//!
//! Routes are never computed here.  The route collaborator hands over stop
//! lists; this crate only measures them (haversine, via
//! [`ft_core::LatLng::distance_m`]) and maps "metres travelled" back to a
//! coordinate.
//!
//! # Cargo features
//!
//! | Feature   | Effect                                          |
//! |-----------|-------------------------------------------------|
//! | `fx-hash` | FxHash instead of SipHash for the profile cache |

pub mod cache;
pub mod error;
pub mod loader;
pub mod profile;
pub mod set;


pub use cache::{fingerprint, ProfileCache, RouteKey};
pub use error::{RouteError, RouteResult};
pub use loader::{load_routes_csv, load_routes_reader};
pub use profile::RouteProfile;
pub use set::RouteSet;
