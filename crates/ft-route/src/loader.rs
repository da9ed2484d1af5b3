//! CSV route loader.
//!
//! # CSV format
//!
//! One row per stop.  Rows of the same route may appear in any order; they
//! are sorted by `seq` before the stop list is assembled.
//!
//! ```csv
//! route_id,seq,lat,lng
//! R1,0,12.9716,77.5946
//! R1,1,12.9750,77.6010
//! R2,0,12.9352,77.6245
//! R2,1,12.9279,77.6271
//! ```
//!
//! Duplicate `(route_id, seq)` pairs and non-finite coordinates are parse
//! errors.  A route with a single stop is accepted; the simulator treats it
//! as degenerate.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use ft_core::{LatLng, RouteId};

use crate::{RouteError, RouteSet};

// ── CSV record ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RouteRecord {
    route_id: String,
    seq:      u32,
    lat:      f64,
    lng:      f64,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a [`RouteSet`] from a CSV file.
pub fn load_routes_csv(path: &Path) -> Result<RouteSet, RouteError> {
    let file = std::fs::File::open(path).map_err(RouteError::Io)?;
    load_routes_reader(file)
}

/// Like [`load_routes_csv`] but accepts any `Read` source.
pub fn load_routes_reader<R: Read>(reader: R) -> Result<RouteSet, RouteError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut by_route: HashMap<String, Vec<(u32, LatLng)>> = HashMap::new();

    for (line, result) in csv_reader.deserialize::<RouteRecord>().enumerate() {
        let row = result.map_err(|e| RouteError::Parse(e.to_string()))?;
        let p = LatLng::new(row.lat, row.lng);
        if !p.is_finite() {
            return Err(RouteError::Parse(format!(
                "record {}: non-finite coordinate in route {:?}",
                line + 1,
                row.route_id
            )));
        }
        by_route.entry(row.route_id).or_default().push((row.seq, p));
    }

    let mut set = RouteSet::new();
    for (id, mut stops) in by_route {
        stops.sort_by_key(|&(seq, _)| seq);
        if let Some(w) = stops.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(RouteError::Parse(format!(
                "route {id:?}: duplicate seq {}",
                w[0].0
            )));
        }
        let points: Vec<LatLng> = stops.into_iter().map(|(_, p)| p).collect();
        tracing::debug!(route = %id, stops = points.len(), "loaded route");
        set.insert(RouteId::from(id), points);
    }

    Ok(set)
}
