//! `PositionSimulator` — owns the roster and advances it one tick at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ft_core::{
    EntityRng, ProgressPolicy, RosterUpdate, RouteRef, SimConfig, SimRng, Tick, TickClock,
    TrackedEntity,
};
use ft_route::{ProfileCache, RouteKey, RouteSet};

use crate::motion::{step_entity, MotionParams};
use crate::state::{EntityState, ProfileSlot};
use crate::SimResult;

/// The tick engine.
///
/// Holds every entity's state, the route set and the profile cache.  Knows
/// nothing about threads or timers: the drivers in [`crate::worker`] and
/// [`crate::foreground`] decide when [`step`][Self::step] runs.
///
/// # Tick phases
///
/// 1. **Resolve** (sequential): entities whose profile slot is unresolved
///    look their route up in the [`ProfileCache`], building it on a miss.
/// 2. **Move** (parallel with the `parallel` feature): [`step_entity`] per
///    entity.  A failing entity is logged and keeps its prior position.
/// 3. **Snapshot**: the roster is copied into a fresh [`RosterUpdate`].
pub struct PositionSimulator {
    config: SimConfig,
    clock:  TickClock,
    seed:   u64,
    routes: RouteSet,
    cache:  ProfileCache,
    states: Vec<EntityState>,
    faults: u64,
}

impl PositionSimulator {
    /// Create an empty simulator.  Fails if `config` does not validate.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let seed = match config.seed {
            Some(s) => s,
            None    => SimRng::from_entropy().next_seed(),
        };
        Ok(Self {
            clock: TickClock::new(config.tick_interval()),
            config,
            seed,
            routes: RouteSet::new(),
            cache:  ProfileCache::new(),
            states: Vec::new(),
            faults: 0,
        })
    }

    pub fn with_routes(mut self, routes: RouteSet) -> Self {
        self.set_routes(routes);
        self
    }

    // ── Inputs ────────────────────────────────────────────────────────────

    /// Replace the named route set.  Every entity re-resolves its profile on
    /// the next tick; routes whose stops did not change hit the cache.
    pub fn set_routes(&mut self, routes: RouteSet) {
        self.routes = routes;
        for s in &mut self.states {
            if matches!(s.route_key, Some(RouteKey::Id(_))) {
                s.profile = ProfileSlot::Unresolved;
            }
        }
    }

    /// Replace the roster wholesale.
    ///
    /// Progress restarts at 0 unless the config says
    /// [`ProgressPolicy::PreserveById`], in which case an entity whose id
    /// and route key both match an old entry keeps that entry's progress.
    pub fn set_roster(&mut self, roster: Vec<TrackedEntity>) {
        let carried: HashMap<_, _> = match self.config.progress_policy {
            ProgressPolicy::Reset        => HashMap::new(),
            ProgressPolicy::PreserveById => self
                .states
                .drain(..)
                .map(|s| (s.entity.id, (s.route_key, s.progress_m)))
                .collect(),
        };

        self.states = roster
            .into_iter()
            .enumerate()
            .map(|(slot, entity)| {
                let key = route_key(&entity);
                let mut state = EntityState::new(entity, key, EntityRng::new(self.seed, slot));
                if let Some((old_key, progress)) = carried.get(&state.entity.id) {
                    if *old_key == state.route_key {
                        state.progress_m = *progress;
                    }
                }
                state
            })
            .collect();

        // Drop profiles nothing references any more.
        let live: Vec<RouteKey> = self.states.iter().filter_map(|s| s.route_key.clone()).collect();
        self.cache.retain(|k| live.contains(k));

        tracing::debug!(
            entities = self.states.len(),
            routed = live.len(),
            "roster replaced"
        );
    }

    // ── Ticking ───────────────────────────────────────────────────────────

    /// Advance every entity by the nominal tick interval.
    pub fn tick(&mut self) -> RosterUpdate {
        self.step(self.clock.interval)
    }

    /// Advance every entity by `dt` and return the new roster snapshot.
    pub fn step(&mut self, dt: Duration) -> RosterUpdate {
        self.resolve_profiles();

        let params = MotionParams {
            dt_secs:       dt.as_secs_f64(),
            default_loop:  self.config.default_loop_policy,
            parked_policy: self.config.parked_policy,
            walk:          &self.config.walk,
        };

        #[cfg(not(feature = "parallel"))]
        let failures: Vec<(usize, crate::MotionError)> = self
            .states
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| step_entity(s, &params).err().map(|e| (i, e)))
            .collect();

        #[cfg(feature = "parallel")]
        let failures: Vec<(usize, crate::MotionError)> = {
            use rayon::prelude::*;
            self.states
                .par_iter_mut()
                .enumerate()
                .filter_map(|(i, s)| step_entity(s, &params).err().map(|e| (i, e)))
                .collect()
        };

        let tick = self.clock.advance();
        for (i, err) in failures {
            self.faults += 1;
            tracing::warn!(
                entity = %self.states[i].entity.id,
                %tick,
                error = %err,
                "entity step failed, keeping previous position"
            );
        }

        self.snapshot()
    }

    fn resolve_profiles(&mut self) {
        for s in &mut self.states {
            if !matches!(s.profile, ProfileSlot::Unresolved) {
                continue;
            }
            let resolved = match (&s.route_key, &s.entity.route) {
                (Some(key), Some(RouteRef::Inline(stops))) => {
                    Some(self.cache.get_or_build(key, stops))
                }
                (Some(key), Some(RouteRef::Id(id))) => match self.routes.get(id) {
                    Some(stops) => Some(self.cache.get_or_build(key, stops)),
                    None => {
                        tracing::warn!(entity = %s.entity.id, route = %id, "unknown route id, entity will random-walk");
                        None
                    }
                },
                _ => None,
            };
            if let Some(p) = &resolved {
                if !p.is_usable() {
                    tracing::debug!(entity = %s.entity.id, stops = p.stops.len(), "degenerate route, entity will random-walk");
                }
            }
            s.profile = ProfileSlot::Resolved(resolved);
        }
    }

    // ── Outputs ───────────────────────────────────────────────────────────

    /// Copy of the current roster, stamped with the current tick.
    pub fn snapshot(&self) -> RosterUpdate {
        let entities: Vec<TrackedEntity> = self.states.iter().map(|s| s.entity.clone()).collect();
        RosterUpdate {
            tick:     self.clock.current_tick,
            entities: Arc::from(entities),
        }
    }

    /// Route progress in metres for entity `id`.
    pub fn progress(&self, id: &str) -> Option<f64> {
        self.states
            .iter()
            .find(|s| s.entity.id.as_str() == id)
            .map(|s| s.progress_m)
    }

    /// Route progress of every entity, in roster order.
    pub fn progress_by_slot(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.progress_m).collect()
    }

    /// Put back progress taken with [`progress_by_slot`][Self::progress_by_slot]
    /// for the same roster.  Non-finite or negative entries are skipped.
    pub fn restore_progress(&mut self, progress: &[f64]) {
        for (state, &p) in self.states.iter_mut().zip(progress) {
            if p.is_finite() && p >= 0.0 {
                state.progress_m = p;
            }
        }
    }

    pub fn entity(&self, id: &str) -> Option<&TrackedEntity> {
        self.states.iter().find(|s| s.entity.id.as_str() == id).map(|s| &s.entity)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    #[inline]
    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick
    }

    #[inline]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Entity-steps that failed since creation.
    #[inline]
    pub fn faults(&self) -> u64 {
        self.faults
    }

    /// Profiles built since creation (cache misses).
    #[inline]
    pub fn profile_builds(&self) -> u64 {
        self.cache.builds()
    }
}

fn route_key(entity: &TrackedEntity) -> Option<RouteKey> {
    match &entity.route {
        None                         => None,
        Some(RouteRef::Id(id))       => Some(RouteKey::Id(id.clone())),
        Some(RouteRef::Inline(stops)) => Some(RouteKey::inline(stops)),
    }
}
