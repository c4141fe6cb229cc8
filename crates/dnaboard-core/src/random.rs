//! Injected randomness.
//!
//! Sampling, shuffling and generator seeds all draw from a caller-supplied
//! [`RandomSource`] so tests can pin every random choice with a seed.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Any `Send` RNG can serve as the engine's random source.
pub trait RandomSource: RngCore + Send {}

impl<T: RngCore + Send> RandomSource for T {}

/// Boxed random source owned by a live board.
pub type BoxedRandom = Box<dyn RandomSource>;

/// A seeded source when `seed` is given, otherwise one seeded from the OS.
pub fn source_from_seed(seed: Option<u64>) -> BoxedRandom {
    match seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(StdRng::from_os_rng()),
    }
}
