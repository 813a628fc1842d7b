// Injectable randomness for the synthetic estimators
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait NoiseSource: Send {
    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform draw in `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + self.unit() * (high - low)
    }
}

/// `StdRng`-backed source. Seeded for reproducible runs, entropy otherwise.
#[derive(Debug)]
pub struct RngNoise {
    rng: StdRng,
}

impl RngNoise {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn from_config(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl NoiseSource for RngNoise {
    fn unit(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}
