//! Bounded random perturbation and periodic disturbance.

use millgen_traits::NoiseSource;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// ChaCha8-backed noise stream; identical seeds give identical draws.
#[derive(Debug, Clone)]
pub struct SeededNoise {
    rng: ChaCha8Rng,
}

impl SeededNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl NoiseSource for SeededNoise {
    fn next_unit(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }
}

/// Uniform perturbation in `[-amp, amp)`. Always consumes one draw.
#[inline]
pub fn perturb(rng: &mut dyn NoiseSource, amp: f64) -> f64 {
    2.0 * rng.next_unit() * amp - amp
}

/// Sinusoidal disturbance for a dataset row; zero when `period_s <= 0`.
pub fn sine(period_s: f64, amplitude: f64, row: usize, base_period_s: u32) -> f64 {
    if period_s.is_nan() || period_s <= 0.0 {
        return 0.0;
    }
    let degrees = (360.0 * (row as f64 * (f64::from(base_period_s) / period_s))) % 360.0;
    degrees.to_radians().sin() * amplitude
}
