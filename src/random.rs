use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed used by `RandomFactory::default()` inside this crate's unit tests.
const TEST_SEED: u64 = 0x5eed;

/// Hands out random number generators, reproducibly when a seed is set.
///
/// Every call to [`rng`](Self::rng) starts a fresh generator, so two
/// consumers built from the same seeded factory see the same stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomFactory {
    seed: Option<u64>,
}

impl Default for RandomFactory {
    fn default() -> Self {
        if cfg!(test) {
            Self::seeded(TEST_SEED)
        } else {
            Self::from_entropy()
        }
    }
}

impl RandomFactory {
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    /// A factory whose generators all start from `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    /// A factory seeded from the operating system on every call.
    pub fn from_entropy() -> Self {
        Self { seed: None }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn is_reproducible(&self) -> bool {
        self.seed.is_some()
    }

    /// A new generator for one consumer.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Uniform integer in `[0, bound)`. `bound` must be positive.
    pub fn next_int(rng: &mut impl Rng, bound: usize) -> usize {
        rng.gen_range(0..bound)
    }
}
