//! Seeded train/test holdout splitting.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of a train/test partition.
#[derive(Debug, Clone)]
pub(crate) struct Holdout {
    pub(crate) train: Vec<usize>,
    pub(crate) test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded RNG and cut off `test_fraction` of it.
///
/// Both partitions are kept non-empty whenever `n >= 2`; with a single
/// row everything lands in the training set.
pub(crate) fn split(n: usize, test_fraction: f64, seed: u64) -> Holdout {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut n_test = (n as f64 * test_fraction).round() as usize;
    if n >= 2 {
        n_test = n_test.max(1).min(n - 1);
    } else {
        n_test = 0;
    }

    let test = indices.split_off(n - n_test);
    Holdout {
        train: indices,
        test,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_cover_all_rows() {
        let h = split(25, 0.2, 42);
        assert_eq!(h.test.len(), 5);
        assert_eq!(h.train.len(), 20);
        let mut all: Vec<usize> = h.train.iter().chain(&h.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let a = split(40, 0.2, 7);
        let b = split(40, 0.2, 7);
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
    }

    #[test]
    fn both_sides_non_empty_for_tiny_inputs() {
        let h = split(2, 0.2, 1);
        assert_eq!(h.train.len(), 1);
        assert_eq!(h.test.len(), 1);
    }

    #[test]
    fn single_row_goes_to_training() {
        let h = split(1, 0.2, 1);
        assert_eq!(h.train, vec![0]);
        assert!(h.test.is_empty());
    }
}
