//! Seeded deterministic random number generator.
//!
//! A linear congruential generator is used instead of `rand`'s generators so
//! that a match can be replayed from its seed and its current state can be
//! snapshotted as a single integer. `rand` only provides the default seed.

use std::f64::consts::PI;

const MULTIPLIER: u64 = 9301;
const INCREMENT: u64 = 49297;
const MODULUS: u64 = 233280;

/// Width of the 95% confidence interval of a normal distribution, in
/// standard deviations.
const CONFIDENCE_95_WIDTH: f64 = 3.92;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rng {
    seed: u64,
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            state: seed % MODULUS,
        }
    }

    /// Seeds the generator from the thread-local entropy source.
    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u32>() as u64)
    }

    /// Returns a float in `[0, 1)`.
    pub fn random(&mut self) -> f64 {
        self.state = (self.state * MULTIPLIER + INCREMENT) % MODULUS;
        self.state as f64 / MODULUS as f64
    }

    /// Returns a float in `[min, max)`.
    pub fn random_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.random() * (max - min)
    }

    /// Returns an integer in `[min, max]`.
    pub fn random_int(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as f64;
        min + (self.random() * span).floor() as i64
    }

    /// Returns `1.0` with probability `positive_bias`, `-1.0` otherwise.
    pub fn random_sign(&mut self, positive_bias: f64) -> f64 {
        if self.random() < positive_bias {
            1.0
        } else {
            -1.0
        }
    }

    /// Samples a normal distribution through the Box-Muller transform.
    ///
    /// `span` is the width of the 95% confidence interval around `center`,
    /// so the standard deviation is `span / 3.92`.
    pub fn random_gaussian(&mut self, center: f64, span: f64) -> f64 {
        let mut u1 = self.random();
        while u1 <= f64::EPSILON {
            u1 = self.random();
        }
        let u2 = self.random();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        center + z * span / CONFIDENCE_95_WIDTH
    }

    /// Picks an index with probability proportional to its weight.
    ///
    /// Negative weights count as zero. When every weight is zero the pick
    /// falls back to a uniform draw. Returns `None` only for an empty slice.
    pub fn random_weighted(&mut self, weights: &[f64]) -> Option<usize> {
        if weights.is_empty() {
            return None;
        }

        let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
        if total <= 0.0 {
            return Some(self.random_int(0, weights.len() as i64 - 1) as usize);
        }

        let target = self.random() * total;
        let mut cumulative = 0.0;
        for (index, weight) in weights.iter().enumerate() {
            cumulative += weight.max(0.0);
            if target < cumulative {
                return Some(index);
            }
        }

        // Rounding left the target past the last bucket.
        weights.iter().rposition(|w| *w > 0.0)
    }

    /// Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.random_int(0, i as i64) as usize;
            items.swap(i, j);
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.state = seed % MODULUS;
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    pub fn set_state(&mut self, state: u64) {
        self.state = state % MODULUS;
    }
}

impl Default for Rng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);

        for _ in 0..100 {
            assert_eq!(a.random().to_bits(), b.random().to_bits());
            assert_eq!(
                a.random_gaussian(10.0, 4.0).to_bits(),
                b.random_gaussian(10.0, 4.0).to_bits()
            );
            assert_eq!(
                a.random_weighted(&[1.0, 2.0, 3.0]),
                b.random_weighted(&[1.0, 2.0, 3.0])
            );
        }
    }

    #[test]
    fn test_random_stays_in_unit_interval() {
        let mut rng = Rng::new(7);
        for _ in 0..10_000 {
            let value = rng.random();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn test_first_value_matches_lcg() {
        let mut rng = Rng::new(1);
        let expected = ((MULTIPLIER + INCREMENT) % MODULUS) as f64 / MODULUS as f64;
        assert_approx_eq!(rng.random(), expected, 1e-12);
    }

    #[test]
    fn test_random_int_is_inclusive() {
        let mut rng = Rng::new(3);
        let mut seen = [false; 4];
        for _ in 0..1_000 {
            let value = rng.random_int(0, 3);
            assert!((0..=3).contains(&value));
            seen[value as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert_eq!(rng.random_int(5, 5), 5);
    }

    #[test]
    fn test_gaussian_mean_and_spread() {
        let mut rng = Rng::new(2024);
        let samples: Vec<f64> = (0..20_000).map(|_| rng.random_gaussian(5.0, 3.92)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance =
            samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;

        assert_approx_eq!(mean, 5.0, 0.2);
        assert_approx_eq!(variance.sqrt(), 1.0, 0.2);
    }

    #[test]
    fn test_weighted_skips_zero_weights() {
        let mut rng = Rng::new(11);
        for _ in 0..1_000 {
            let index = rng.random_weighted(&[0.0, 1.0, 0.0, 2.0]).unwrap();
            assert!(index == 1 || index == 3);
        }
    }

    #[test]
    fn test_weighted_all_zero_falls_back_to_uniform() {
        let mut rng = Rng::new(5);
        let mut seen = [false; 3];
        for _ in 0..500 {
            let index = rng.random_weighted(&[0.0, 0.0, 0.0]).unwrap();
            seen[index] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert_eq!(rng.random_weighted(&[]), None);
    }

    #[test]
    fn test_random_sign_bias() {
        let mut rng = Rng::new(9);
        assert!((0..100).all(|_| rng.random_sign(1.0) > 0.0));
        assert!((0..100).all(|_| rng.random_sign(0.0) < 0.0));
    }

    #[test]
    fn test_shuffle_keeps_elements() {
        let mut rng = Rng::new(13);
        let mut items: Vec<u32> = (0..20).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_state_restore_replays() {
        let mut rng = Rng::new(99);
        rng.random();
        let saved = rng.state();
        let first: Vec<u64> = (0..5).map(|_| rng.random().to_bits()).collect();

        rng.set_state(saved);
        let second: Vec<u64> = (0..5).map(|_| rng.random().to_bits()).collect();
        assert_eq!(first, second);
        assert_eq!(rng.seed(), 99);
    }
}
