//! Injected randomness.
//!
//! Every random draw in the engine (tie-break jitter, recent-item demotion,
//! mixed exercise type) goes through one `SeedSource`. Seeded sources make
//! orderings reproducible in tests; the production default is unseeded.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Shared random source
pub struct SeedSource {
    rng: Mutex<StdRng>,
}

impl SeedSource {
    /// Unseeded source (production default)
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seeded source, for deterministic orderings
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Seeded when `seed` is set, entropy otherwise
    pub fn from_config(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::from_entropy(),
        }
    }

    /// Draw a seed for a derived generator.
    ///
    /// Repositories rebuild a `StdRng` from this value, so the lock is never
    /// held across an await point.
    pub fn next_seed(&self) -> u64 {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).r#gen()
    }

    /// Pick one element uniformly
    pub fn pick<T: Copy>(&self, choices: &[T]) -> Option<T> {
        if choices.is_empty() {
            return None;
        }
        let index = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0..choices.len());
        choices.get(index).copied()
    }
}

impl Default for SeedSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Build the generator a ranked query should use
pub fn rng_from_seed(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
