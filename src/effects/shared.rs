//! Primitives shared by the audio and render halves of an effect.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Small xorshift32 generator for pixel placement.
///
/// Deterministic for a given seed so effects can be tested.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        self.state
    }

    /// Uniform value in `[0, 1]`.
    pub fn next_f32(&mut self) -> f32 {
        self.next_u32() as f32 / u32::MAX as f32
    }

    /// Integer in `low..high`. Returns `low` when the range is empty.
    pub fn next_range(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        low + (self.next_u32() as usize) % (high - low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_range_bounds() {
        let mut rng = Rng::new(42);
        for _ in 0..1000 {
            let v = rng.next_range(1, 8);
            assert!((1..8).contains(&v));
        }
        assert_eq!(rng.next_range(5, 5), 5);
    }

    #[test]
    fn test_rng_zero_seed_is_usable() {
        let mut rng = Rng::new(0);
        assert_ne!(rng.next_u32(), 0);
    }
}
