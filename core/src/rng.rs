//! Random sources for tray scatter and shuffling.
//!
//! Everything that needs randomness takes a `&mut dyn RandomSource`, so a
//! session can be driven by a seeded stream in tests and replays, or by an
//! OS-seeded generator in normal play.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource {
    /// Uniform value in `[0, 1)`.
    fn next_unit(&mut self) -> f32;

    fn next_range(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        min + (max - min) * self.next_unit()
    }
}

pub fn splitmix32(mut value: u32) -> u32 {
    value = value.wrapping_add(0x9E37_79B9);
    let mut z = value;
    z = (z ^ (z >> 16)).wrapping_mul(0x85EB_CA6B);
    z = (z ^ (z >> 13)).wrapping_mul(0xC2B2_AE35);
    z ^ (z >> 16)
}

pub fn rand_unit(seed: u32, salt: u32) -> f32 {
    let mixed = splitmix32(seed ^ splitmix32(salt));
    let top = mixed >> 8;
    top as f32 / ((1u32 << 24) as f32)
}

/// Counter-based stream over [`splitmix32`]; the same seed always yields the
/// same sequence on every platform.
#[derive(Clone, Debug)]
pub struct SeededRandom {
    seed: u32,
    counter: u32,
}

impl SeededRandom {
    pub fn new(seed: u32) -> Self {
        Self { seed, counter: 0 }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f32 {
        let value = rand_unit(self.seed, self.counter);
        self.counter = self.counter.wrapping_add(1);
        value
    }
}

/// Adapter over any `rand` generator.
pub struct RngSource<R> {
    inner: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl RngSource<SmallRng> {
    pub fn from_os_rng() -> Self {
        Self::new(SmallRng::from_os_rng())
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f32 {
        self.inner.random::<f32>()
    }
}
