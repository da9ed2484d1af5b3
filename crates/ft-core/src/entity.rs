//! The roster data model shared by the simulator and the renderer.

use std::sync::Arc;

use crate::{EntityId, LatLng, LoopPolicy, RouteId, Tick};

/// Route assignment of a tracked entity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum RouteRef {
    /// Foreign key into a `RouteSet`.
    Id(RouteId),
    /// Stop list carried by the entity itself.
    Inline(Arc<[LatLng]>),
}

/// One simulated (or real) vehicle.
///
/// While a simulation runs, `position` and `speed_kph` are owned by the
/// simulator; the copies handed out in [`RosterUpdate`]s are snapshots.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackedEntity {
    pub id:          EntityId,
    /// Non-negative speed.  Forced to 0 when a `StopAtEnd` entity arrives.
    pub speed_kph:   f64,
    pub position:    LatLng,
    #[cfg_attr(feature = "serde", serde(default))]
    pub route:       Option<RouteRef>,
    /// `None` uses the simulator's configured default.
    #[cfg_attr(feature = "serde", serde(default))]
    pub loop_policy: Option<LoopPolicy>,
    /// A parked entity never moves, regardless of speed or route.
    #[cfg_attr(feature = "serde", serde(default))]
    pub parked:      bool,
}

impl TrackedEntity {
    /// An unrouted entity at `position`.
    pub fn new(id: impl Into<EntityId>, position: LatLng, speed_kph: f64) -> Self {
        Self {
            id: id.into(),
            speed_kph,
            position,
            route:       None,
            loop_policy: None,
            parked:      false,
        }
    }

    pub fn with_route(mut self, route: RouteRef) -> Self {
        self.route = Some(route);
        self
    }

    pub fn with_loop_policy(mut self, policy: LoopPolicy) -> Self {
        self.loop_policy = Some(policy);
        self
    }

    pub fn parked(mut self) -> Self {
        self.parked = true;
        self
    }

    /// Speed in metres per second.
    #[inline]
    pub fn speed_mps(&self) -> f64 {
        self.speed_kph * 1000.0 / 3600.0
    }
}

/// One tick's worth of simulator output: the whole roster, freshly copied.
///
/// Consumers replace their view state wholesale with `entities`.
#[derive(Clone, Debug)]
pub struct RosterUpdate {
    pub tick:     Tick,
    pub entities: Arc<[TrackedEntity]>,
}

impl RosterUpdate {
    pub fn get(&self, id: &str) -> Option<&TrackedEntity> {
        self.entities.iter().find(|e| e.id.as_str() == id)
    }
}
