//! Random selection policies used by genome initialization and symbol choice.

use rand::Rng;
use std::collections::HashMap;

/// Linear-probe window for resolving floating-point ties at cumulative
/// distribution boundaries.
pub const CHECK_BOUNDARY: usize = 8;

/// Select the index whose cumulative-weight bucket contains `sample`.
///
/// `cumulative` is a prefix-summed, normalized weight table ending at 1.0;
/// bucket `i` covers `[cumulative[i-1], cumulative[i])`. A binary search
/// narrows the candidate, then a linear scan within `boundary_window`
/// positions settles ties that floating-point rounding can introduce at
/// bucket edges.
pub fn pick_from_distribution(cumulative: &[f64], sample: f64, boundary_window: usize) -> usize {
    debug_assert!(!cumulative.is_empty());
    let mut lo = 0usize;
    let mut hi = cumulative.len() - 1;
    while lo < hi {
        let mid = (lo + hi) / 2;
        if cumulative[mid] <= sample {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    let start = lo.saturating_sub(boundary_window);
    for index in start..cumulative.len() {
        if sample < cumulative[index] {
            return index;
        }
    }
    cumulative.len() - 1
}

/// Reusable index buffers for sampling without replacement.
///
/// One scratch value belongs to one caller (typically one per worker
/// thread), so the buffer reuse that avoids per-call allocation never
/// crosses threads. Buffer contents do not persist semantically between
/// calls: only distinctness of each call's result is guaranteed.
#[derive(Debug, Default)]
pub struct SelectionScratch {
    buffers: HashMap<usize, Vec<usize>>,
}

impl SelectionScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `m` distinct integers from `[0, n)` via a partial
    /// Fisher-Yates shuffle over the cached buffer for `n`.
    pub fn choose_without_replacement<R: Rng>(
        &mut self,
        rng: &mut R,
        m: usize,
        n: usize,
    ) -> Vec<usize> {
        assert!(m <= n, "cannot choose {m} distinct values from [0, {n})");
        let buffer = self.buffers.entry(n).or_insert_with(|| (0..n).collect());
        let mut chosen = Vec::with_capacity(m);
        for removed in 0..m {
            let index = rng.gen_range(0..n - removed);
            let value = buffer[index];
            buffer.swap(index, n - 1 - removed);
            chosen.push(value);
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pick_boundaries() {
        let cumulative = [0.25, 0.5, 0.75, 1.0];
        assert_eq!(pick_from_distribution(&cumulative, 0.0, CHECK_BOUNDARY), 0);
        assert_eq!(pick_from_distribution(&cumulative, 0.24, CHECK_BOUNDARY), 0);
        // An exact boundary value belongs to the next bucket.
        assert_eq!(pick_from_distribution(&cumulative, 0.25, CHECK_BOUNDARY), 1);
        assert_eq!(pick_from_distribution(&cumulative, 0.9, CHECK_BOUNDARY), 3);
        assert_eq!(pick_from_distribution(&cumulative, 0.999999, CHECK_BOUNDARY), 3);
    }

    #[test]
    fn test_pick_single_bucket() {
        assert_eq!(pick_from_distribution(&[1.0], 0.5, CHECK_BOUNDARY), 0);
    }

    #[test]
    fn test_choose_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut scratch = SelectionScratch::new();
        for _ in 0..200 {
            let chosen = scratch.choose_without_replacement(&mut rng, 3, 5);
            assert_eq!(chosen.len(), 3);
            assert!(chosen.iter().all(|&v| v < 5));
            let mut sorted = chosen.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), 3, "duplicates in {chosen:?}");
        }
    }

    #[test]
    fn test_choose_exhausts_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut scratch = SelectionScratch::new();
        let mut seen = [0usize; 5];
        for _ in 0..1000 {
            for value in scratch.choose_without_replacement(&mut rng, 3, 5) {
                seen[value] += 1;
            }
        }
        // Every value appears, roughly uniformly (600 expected each).
        for &count in &seen {
            assert!(count > 400, "skewed coverage: {seen:?}");
        }
    }

    #[test]
    fn test_choose_all() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut scratch = SelectionScratch::new();
        let mut all = scratch.choose_without_replacement(&mut rng, 5, 5);
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
    }
}
