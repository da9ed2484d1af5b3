//! CSV roster loader.
//!
//! # CSV format
//!
//! ```csv
//! id,lat,lng,speed_kph,route_id,loop_policy,parked
//! V001,12.9716,77.5946,36,R1,loop,
//! V002,12.9352,77.6245,18,R2,stop-at-end,
//! V003,12.9279,77.6271,0,,,true
//! ```
//!
//! `route_id`, `loop_policy` and `parked` may be empty.  An empty
//! `route_id` makes the entity random-walk; an empty `loop_policy` uses the
//! simulator default.  Duplicate ids, negative or non-finite speeds and
//! unknown loop policies are parse errors.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use ft_core::{LatLng, LoopPolicy, RouteId, RouteRef, TrackedEntity};

use crate::{SimError, SimResult};

#[derive(Deserialize)]
struct RosterRecord {
    id:          String,
    lat:         f64,
    lng:         f64,
    speed_kph:   f64,
    route_id:    Option<String>,
    loop_policy: Option<String>,
    parked:      Option<bool>,
}

/// Load a roster from a CSV file.
pub fn load_roster_csv(path: &Path) -> SimResult<Vec<TrackedEntity>> {
    let file = std::fs::File::open(path)?;
    load_roster_reader(file)
}

/// Like [`load_roster_csv`] but accepts any `Read` source.
pub fn load_roster_reader<R: Read>(reader: R) -> SimResult<Vec<TrackedEntity>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut seen = HashSet::new();
    let mut roster = Vec::new();

    for (line, result) in csv_reader.deserialize::<RosterRecord>().enumerate() {
        let row = result.map_err(|e| SimError::Roster(e.to_string()))?;
        let record = line + 1;

        let position = LatLng::new(row.lat, row.lng);
        if !position.is_finite() {
            return Err(SimError::Roster(format!(
                "record {record}: non-finite coordinate for {:?}",
                row.id
            )));
        }
        if !row.speed_kph.is_finite() || row.speed_kph < 0.0 {
            return Err(SimError::Roster(format!(
                "record {record}: invalid speed {} for {:?}",
                row.speed_kph, row.id
            )));
        }
        if !seen.insert(row.id.clone()) {
            return Err(SimError::Roster(format!("record {record}: duplicate id {:?}", row.id)));
        }

        let mut entity = TrackedEntity::new(row.id, position, row.speed_kph);
        if let Some(route) = row.route_id.filter(|s| !s.is_empty()) {
            entity = entity.with_route(RouteRef::Id(RouteId::from(route)));
        }
        if let Some(policy) = row.loop_policy.filter(|s| !s.is_empty()) {
            let parsed = LoopPolicy::parse(&policy).ok_or_else(|| {
                SimError::Roster(format!("record {record}: unknown loop policy {policy:?}"))
            })?;
            entity = entity.with_loop_policy(parsed);
        }
        if row.parked.unwrap_or(false) {
            entity = entity.parked();
        }
        roster.push(entity);
    }

    tracing::debug!(entities = roster.len(), "loaded roster");
    Ok(roster)
}
