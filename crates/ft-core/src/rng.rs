//! Deterministic per-entity and engine-level RNG wrappers.
//!
//! # Determinism strategy
//!
//! Each entity gets its own independent `SmallRng` seeded by:
//!
//!   seed = global_seed XOR (slot * MIXING_CONSTANT)
//!
//! where `slot` is the entity's position in the roster.  The mixing constant
//! is the 64-bit fractional part of the golden ratio, which spreads
//! consecutive slots uniformly across the seed space.  Entities never share
//! RNG state, so the per-entity step can run in parallel without changing
//! results.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

// ── EntityRng ─────────────────────────────────────────────────────────────────

/// Per-entity deterministic RNG, owned by the entity's simulation state.
#[derive(Clone, Debug)]
pub struct EntityRng(SmallRng);

impl EntityRng {
    /// Seed deterministically from the run's global seed and a roster slot.
    pub fn new(global_seed: u64, slot: usize) -> Self {
        let seed = global_seed ^ (slot as u64).wrapping_mul(MIXING_CONSTANT);
        EntityRng(SmallRng::seed_from_u64(seed))
    }

    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Uniform heading in radians, `[0, 2π)`.
    #[inline]
    pub fn heading(&mut self) -> f64 {
        self.0.gen_range(0.0..std::f64::consts::TAU)
    }

    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }
}

// ── SimRng ────────────────────────────────────────────────────────────────────

/// Engine-level RNG.  Used to draw the global seed when none is configured
/// and to derive child seeds.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Seed from OS entropy.  Runs are not reproducible.
    pub fn from_entropy() -> Self {
        SimRng(SmallRng::from_entropy())
    }

    /// Derive a fresh 64-bit seed (e.g. for a new roster generation).
    pub fn next_seed(&mut self) -> u64 {
        self.0.r#gen::<u64>()
    }

    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }
}
