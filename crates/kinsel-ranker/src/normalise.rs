//! Rank normalisation.
//!
//! Targets are ordered by how much more the probe inhibits them than the
//! less toxic compound does, then each position p of N becomes p / N.

use std::cmp::Ordering;

/// Order for rank assignment: larger difference first, NaN differences
/// last, ties broken by the smaller probe measurement.
pub fn difference_order(a: (f64, f64), b: (f64, f64)) -> Ordering {
    let (diff_a, probe_a) = a;
    let (diff_b, probe_b) = b;
    let by_diff = match (diff_a.is_nan(), diff_b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => diff_b.partial_cmp(&diff_a).unwrap_or(Ordering::Equal),
    };
    by_diff.then_with(|| probe_a.total_cmp(&probe_b))
}

/// Indices of `keys` (diff, probe) in rank order. Stable for full ties.
pub fn rank_order(keys: &[(f64, f64)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&i, &j| difference_order(keys[i], keys[j]));
    order
}

/// 0-based position over table size: values in [0, (n-1)/n].
pub fn positional_rank(position: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    position as f64 / n as f64
}
