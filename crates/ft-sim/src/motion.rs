//! The per-entity motion step.
//!
//! Both tick drivers (background worker and foreground frame loop) call
//! [`step_entity`]; nothing else moves an entity.  Every function here is
//! pure apart from the entity's own RNG.

use ft_core::{LatLng, LoopPolicy, ParkedPolicy, WalkConfig};
use ft_route::RouteProfile;

use crate::{EntityState, MotionError};

/// Speed above which the random-walk step stops growing.
const WALK_SPEED_CAP_KPH: f64 = 120.0;

/// Inputs shared by every entity in one tick.
#[derive(Clone, Copy, Debug)]
pub struct MotionParams<'a> {
    pub dt_secs:       f64,
    pub default_loop:  LoopPolicy,
    pub parked_policy: ParkedPolicy,
    pub walk:          &'a WalkConfig,
}

/// Result of advancing along a route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteAdvance {
    pub progress_m: f64,
    pub position:   LatLng,
    /// Speed after the step: unchanged, or 0 once a `StopAtEnd` entity arrives.
    pub speed_kph:  f64,
    pub arrived:    bool,
}

#[inline]
pub fn kph_to_mps(kph: f64) -> f64 {
    kph * 1000.0 / 3600.0
}

/// Advance `progress_m` by `speed_kph` for `dt_secs` and locate the result.
pub fn advance_on_route(
    profile:    &RouteProfile,
    progress_m: f64,
    speed_kph:  f64,
    dt_secs:    f64,
    policy:     LoopPolicy,
) -> Result<RouteAdvance, MotionError> {
    if !progress_m.is_finite() {
        return Err(MotionError::NonFiniteProgress(progress_m));
    }
    if !profile.is_usable() {
        return Err(MotionError::DegenerateRoute);
    }

    let total = profile.total_length;
    let mut progress = progress_m + kph_to_mps(speed_kph.max(0.0)) * dt_secs.max(0.0);
    let mut speed_kph = speed_kph;
    let mut arrived = false;

    match policy {
        LoopPolicy::Loop => progress = progress.rem_euclid(total),
        LoopPolicy::StopAtEnd => {
            if progress >= total {
                progress = total;
                speed_kph = 0.0;
                arrived = true;
            }
        }
    }

    let position = profile.locate(progress).ok_or(MotionError::DegenerateRoute)?;
    if !position.is_finite() {
        return Err(MotionError::NonFinitePosition);
    }

    Ok(RouteAdvance { progress_m: progress, position, speed_kph, arrived })
}

/// Walk step length in degrees for `speed_kph`.
#[inline]
pub fn walk_step_deg(walk: &WalkConfig, speed_kph: f64) -> f64 {
    walk.base_step_deg
        + walk.speed_step_deg * speed_kph.clamp(0.0, WALK_SPEED_CAP_KPH) / WALK_SPEED_CAP_KPH
}

/// One bounded random-walk step: uniform heading, speed-scaled length.
pub fn random_walk(
    position:  LatLng,
    speed_kph: f64,
    rng:       &mut ft_core::EntityRng,
    params:    &MotionParams<'_>,
) -> Result<LatLng, MotionError> {
    if speed_kph <= 0.0 && params.parked_policy == ParkedPolicy::Still {
        return Ok(position);
    }

    let step = walk_step_deg(params.walk, speed_kph);
    let mut next = position.offset_deg(rng.heading(), step);
    if let Some(bounds) = &params.walk.bounds {
        next = bounds.clamp(next);
    }

    if !next.is_finite() {
        return Err(MotionError::NonFinitePosition);
    }
    Ok(next)
}

/// Advance one entity by one tick.
///
/// Routed entities with a usable profile follow the route; everything else
/// (no route, unknown route id, degenerate geometry) random-walks.  On error
/// the state is left exactly as it was.
pub fn step_entity(state: &mut EntityState, params: &MotionParams<'_>) -> Result<(), MotionError> {
    let speed = state.entity.speed_kph;
    if !speed.is_finite() {
        return Err(MotionError::NonFiniteSpeed(speed));
    }
    if state.entity.parked {
        return Ok(());
    }

    let policy = state.entity.loop_policy.unwrap_or(params.default_loop);
    let routed = match state.usable_profile() {
        Some(profile) => Some(advance_on_route(
            profile,
            state.progress_m,
            speed,
            params.dt_secs,
            policy,
        )?),
        None => None,
    };

    match routed {
        Some(adv) => {
            state.progress_m = adv.progress_m;
            state.entity.position = adv.position;
            state.entity.speed_kph = adv.speed_kph;
        }
        None => {
            state.entity.position =
                random_walk(state.entity.position, speed, &mut state.rng, params)?;
        }
    }
    Ok(())
}
