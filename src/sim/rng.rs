//! Random sources
//!
//! The engine never touches a global RNG. Callers inject either an entropy
//! backed source or a seeded PCG stream (daily runs, tests).

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Supplies uniform values in [0, 1)
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;

    /// True with probability `p`
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform integer in [0, n); returns 0 when n <= 0
    fn below(&mut self, n: i32) -> i32 {
        if n <= 0 {
            return 0;
        }
        ((self.next_f64() * n as f64) as i32).clamp(0, n - 1)
    }

    /// Uniform value in [0, span)
    fn jitter(&mut self, span: f64) -> f64 {
        self.next_f64() * span
    }
}

/// Non-deterministic source backed by the thread RNG
pub struct EntropySource {
    rng: rand::rngs::ThreadRng,
}

impl EntropySource {
    pub fn new() -> Self {
        Self { rng: rand::rng() }
    }
}

impl Default for EntropySource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for EntropySource {
    fn next_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Deterministic source: same seed, same run
#[derive(Debug, Clone)]
pub struct SeededSource {
    rng: Pcg32,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededSource {
    fn next_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Seed for a daily run: the date digits concatenated (2026-10-18 -> 20261018)
pub fn daily_seed(year: i32, month: u32, day: u32) -> u64 {
    format!("{year}{month}{day}").parse().unwrap_or(0)
}
