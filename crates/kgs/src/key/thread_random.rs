use crate::RandSource;
use rand::{Rng, rng};

/// A `RandSource` that uses the thread-local RNG (`rand::rng()`).
///
/// This RNG is fast, cryptographically secure (ChaCha-based), and automatically
/// reseeded periodically.
///
/// Each OS thread has its own RNG instance, so calls from concurrent fill
/// workers are contention-free. This type does **not** store the RNG itself;
/// it accesses the thread-local generator on each call, which keeps it `Send`
/// and `Sync` even though `ThreadRng` is neither.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource for ThreadRandom {
    fn next_index(&self, upper: usize) -> usize {
        rng().random_range(0..upper)
    }
}
