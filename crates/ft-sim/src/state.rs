//! Per-entity simulation state.

use std::sync::Arc;

use ft_core::{EntityRng, TrackedEntity};
use ft_route::{RouteKey, RouteProfile};

/// Where an entity's route profile stands.
#[derive(Clone, Debug)]
pub enum ProfileSlot {
    /// Not looked up yet (new roster, or the route set changed).
    Unresolved,
    /// Looked up.  `None` means no route, or a route id missing from the set.
    Resolved(Option<Arc<RouteProfile>>),
}

/// One roster entry plus everything the simulator tracks about it.
///
/// `entity.position` and `entity.speed_kph` are written by the motion step;
/// everything else in `entity` is as the caller supplied it.
#[derive(Clone, Debug)]
pub struct EntityState {
    pub entity:     TrackedEntity,
    /// Metres travelled along the route profile since the last reset.
    pub progress_m: f64,
    /// Memoisation key of the entity's route, `None` when unrouted.
    pub route_key:  Option<RouteKey>,
    pub profile:    ProfileSlot,
    pub rng:        EntityRng,
}

impl EntityState {
    pub fn new(entity: TrackedEntity, route_key: Option<RouteKey>, rng: EntityRng) -> Self {
        Self {
            entity,
            progress_m: 0.0,
            route_key,
            profile: ProfileSlot::Unresolved,
            rng,
        }
    }

    /// The resolved profile if it is usable for interpolation.
    pub fn usable_profile(&self) -> Option<&RouteProfile> {
        match &self.profile {
            ProfileSlot::Resolved(Some(p)) if p.is_usable() => Some(p.as_ref()),
            _                                               => None,
        }
    }
}
