use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform floats in `[0, 1)`.
///
/// Scheduling code takes one of these explicitly so that a test can replay
/// an exact sequence of decisions.
pub trait RandomSource {
    fn next_f32(&mut self) -> f32;
}

impl<T: RandomSource + ?Sized> RandomSource for Box<T> {
    fn next_f32(&mut self) -> f32 {
        (**self).next_f32()
    }
}

/// Standard generator behind [`RandomSource`].
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Reproducible generator for replays and tests.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for SeededRandom {
    fn next_f32(&mut self) -> f32 {
        self.rng.random::<f32>()
    }
}

/// Map a draw onto `0..len`, never producing `len` even for a draw of 1.0.
pub fn pick_index(draw: f32, len: usize) -> usize {
    let clamped = f64::from(draw).clamp(0.0, 0.999_999_999);
    ((clamped * len as f64).floor() as usize).min(len.saturating_sub(1))
}
