// Injectable randomness for the mini-game engine

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform sampling used by the scheduler, spawner and reward table
pub trait RandomSource: Send + Sync {
    /// Uniform real in `[0, 1)`
    fn next_f64(&self) -> f64;

    /// Uniform integer in `[low, high]`
    fn range_inclusive(&self, low: u32, high: u32) -> u32;

    /// Uniform index in `[0, len)`; `len` must be non-zero
    fn index(&self, len: usize) -> usize;
}

/// A `StdRng` behind a mutex so it can be shared between tasks
pub struct SharedRng {
    inner: Mutex<StdRng>,
}

impl SharedRng {
    pub fn from_os_rng() -> Self {
        Self {
            inner: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }
}

impl RandomSource for SharedRng {
    fn next_f64(&self) -> f64 {
        self.with_rng(|rng| rng.random::<f64>())
    }

    fn range_inclusive(&self, low: u32, high: u32) -> u32 {
        self.with_rng(|rng| rng.random_range(low..=high))
    }

    fn index(&self, len: usize) -> usize {
        self.with_rng(|rng| rng.random_range(0..len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_is_reproducible() {
        let a = SharedRng::seeded(42);
        let b = SharedRng::seeded(42);
        let xs: Vec<f64> = (0..8).map(|_| a.next_f64()).collect();
        let ys: Vec<f64> = (0..8).map(|_| b.next_f64()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_ranges_stay_in_bounds() {
        let rng = SharedRng::seeded(7);
        for _ in 0..1000 {
            let d = rng.range_inclusive(4, 7);
            assert!((4..=7).contains(&d));
            assert!(rng.index(3) < 3);
            let f = rng.next_f64();
            assert!((0.0..1.0).contains(&f));
        }
    }
}
