//! Random sources for the exploration term

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform source in [0, 1) scaled by the policy's exploration randomness
pub trait NoiseSource: Send + Sync {
    fn sample(&self) -> f64;
}

/// Thread-local generator; the production default
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadNoise;

impl NoiseSource for ThreadNoise {
    fn sample(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Always zero, making scores fully deterministic
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroNoise;

impl NoiseSource for ZeroNoise {
    fn sample(&self) -> f64 {
        0.0
    }
}

/// Reproducible sequence from a fixed seed
#[derive(Debug)]
pub struct SeededNoise {
    rng: Mutex<StdRng>,
}

impl SeededNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl NoiseSource for SeededNoise {
    fn sample(&self) -> f64 {
        self.rng.lock().random::<f64>()
    }
}
