//! Deterministic Mersenne-Twister RNG wrapper.
//!
//! # Determinism strategy
//!
//! Each simulation instance owns one `SimRng` seeded from its run
//! configuration; the same seed always produces identical timing streams.
//! Derived generators come from `child`:
//!
//!   child_seed = next_u64() XOR (offset * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive offsets uniformly across the seed space, so
//! per-entity streams stay independent even for adjacent entity indices.

use rand::{Rng, RngCore};
use rand_mt::Mt64;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

// ── SimRng ────────────────────────────────────────────────────────────────────

/// Simulation-level deterministic RNG (MT19937-64).
///
/// Used only in single-threaded or explicitly synchronised contexts.  If
/// several entities need their own randomness, derive one child generator
/// per entity with [`SimRng::child`].
pub struct SimRng(Mt64);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(Mt64::new(seed))
    }

    /// Derive a child `SimRng` with a different seed offset — useful for
    /// seeding per-entity generators deterministically from the root seed.
    pub fn child(&mut self, offset: u64) -> SimRng {
        let child_seed = self.0.next_u64() ^ offset.wrapping_mul(MIXING_CONSTANT);
        SimRng(Mt64::new(child_seed))
    }

    /// Expose the inner `Mt64` for use with `rand` distribution types
    /// (`rng.inner().sample(...)`, `rng.inner().gen_range(...)`, etc.)
    #[inline]
    pub fn inner(&mut self) -> &mut Mt64 {
        &mut self.0
    }

    /// Sample a uniformly distributed value of any `Standard`-distributed type.
    #[inline]
    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.r#gen()
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }
}
