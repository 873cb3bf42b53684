//! xorshift64* random number generator
//!
//! Small, fast and fully determined by its 64-bit state. Each experiment owns
//! one generator; nothing in the simulation core reads ambient randomness.

use serde::{Deserialize, Serialize};

/// Seeded xorshift64* generator
///
/// # Example
/// ```
/// use metasim_core_rs::RngManager;
///
/// let mut rng = RngManager::new(7);
/// let index = rng.pick(3);
/// assert!(index < 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    state: u64,
}

impl RngManager {
    /// Create a generator; a zero seed is replaced by 1 (xorshift requirement)
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Next raw 64-bit value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Uniform f64 in [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        (self.next() >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Uniform index in `0..len`
    ///
    /// Uses the high bits of the next value (multiply-shift), which are the
    /// well-mixed ones for xorshift64*.
    ///
    /// # Panics
    /// Panics if `len` is zero
    pub fn pick(&mut self, len: usize) -> usize {
        assert!(len > 0, "cannot pick from an empty set");
        ((u128::from(self.next()) * len as u128) >> 64) as usize
    }

    /// Index drawn proportionally to `weights`
    ///
    /// Negative and non-finite weights count as zero. When every weight is
    /// zero the draw falls back to a uniform pick.
    ///
    /// # Panics
    /// Panics if `weights` is empty
    pub fn pick_weighted(&mut self, weights: &[f64]) -> usize {
        assert!(!weights.is_empty(), "cannot pick from an empty set");
        let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let total: f64 = weights.iter().copied().map(clean).sum();
        if total <= 0.0 {
            return self.pick(weights.len());
        }
        let mut target = self.next_f64() * total;
        for (index, weight) in weights.iter().copied().map(clean).enumerate() {
            if target < weight {
                return index;
            }
            target -= weight;
        }
        // rounding can leave a sliver past the last bucket
        weights.iter().rposition(|w| clean(*w) > 0.0).unwrap_or(0)
    }

    /// Current state, enough to resume the sequence with `RngManager::new`
    pub fn get_state(&self) -> u64 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        let rng = RngManager::new(0);
        assert_ne!(rng.get_state(), 0);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RngManager::new(99_999);
        let mut b = RngManager::new(99_999);
        for _ in 0..100 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn test_next_f64_in_unit_interval() {
        let mut rng = RngManager::new(12345);
        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "{v} outside [0, 1)");
        }
    }

    #[test]
    fn test_pick_weighted_skips_zero_weights() {
        let mut rng = RngManager::new(3);
        for _ in 0..200 {
            assert_eq!(rng.pick_weighted(&[0.0, 2.0, 0.0]), 1);
        }
    }

    #[test]
    fn test_pick_weighted_roughly_proportional() {
        let mut rng = RngManager::new(11);
        let hits = (0..10_000)
            .filter(|_| rng.pick_weighted(&[0.8, 0.2]) == 0)
            .count();
        assert!((7_500..8_500).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn test_pick_balanced_between_two() {
        let mut rng = RngManager::new(1);
        let zeros = (0..1_000).filter(|_| rng.pick(2) == 0).count();
        assert!((400..600).contains(&zeros), "zeros = {zeros}");
    }

    #[test]
    #[should_panic(expected = "cannot pick from an empty set")]
    fn test_pick_empty_panics() {
        RngManager::new(1).pick(0);
    }
}
