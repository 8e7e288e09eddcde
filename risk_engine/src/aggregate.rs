//! Result Aggregator (component §4.4, statistics half): percentiles,
//! success probabilities, and histogram binning over an ensemble of
//! per-scenario indicator values. Output-envelope shaping lives in
//! `envelope.rs`.

use std::collections::BTreeMap;

pub const PERCENTILE_LEVELS: [u32; 9] = [10, 20, 30, 40, 50, 60, 70, 80, 90];

pub type PercentileMap = BTreeMap<String, f64>;

fn finite_sorted(values: &[f64]) -> Vec<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    finite.sort_by(|a, b| a.partial_cmp(b).unwrap());
    finite
}

/// Index-based percentile over an already-sorted, all-finite slice.
pub fn percentile(sorted_finite: &[f64], p: f64) -> f64 {
    let n = sorted_finite.len();
    if n == 0 {
        return f64::NAN;
    }
    let idx = ((p * n as f64).floor() as usize).min(n - 1);
    sorted_finite[idx]
}

/// Builds {P10, P20, ..., P90} over the finite entries of `values`. Entirely
/// omitted (empty map, not a NaN-valued map) when no finite entries exist —
/// NaN never appears as a percentile value on the wire.
pub fn percentile_map(values: &[f64]) -> PercentileMap {
    let finite = finite_sorted(values);
    let mut map = PercentileMap::new();
    if finite.is_empty() {
        return map;
    }
    for level in PERCENTILE_LEVELS {
        map.insert(format!("P{level}"), percentile(&finite, level as f64 / 100.0));
    }
    map
}

/// `Pr(value > 0)` over the finite entries only; NaN if no finite entries.
pub fn pr_positive(values: &[f64]) -> f64 {
    let finite = finite_sorted(values);
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.iter().filter(|&&v| v > 0.0).count() as f64 / finite.len() as f64
}

/// `Pr(value < threshold)` counted against the full ensemble size `n` — NaNs
/// (infeasible scenarios) count as failures, not as excluded trials.
pub fn pr_less_than(values: &[f64], threshold: f64, n: usize) -> f64 {
    if n == 0 {
        return f64::NAN;
    }
    let count = values
        .iter()
        .filter(|v| v.is_finite() && **v < threshold)
        .count();
    count as f64 / n as f64
}

#[derive(Debug, Clone)]
pub struct HistogramBundle {
    pub edges: Vec<f64>,
    pub centers: Vec<f64>,
    pub counts: Vec<u64>,
    pub mean: f64,
    pub std: f64,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

const HISTOGRAM_BINS: usize = 30;

/// 30 equal-width bins between the 0.5th and 99.5th percentile of finite
/// values. Summary statistics (`mean`, `std`, `P10`, `P50`, `P90`) are
/// computed over all finite values, not just the ones inside the trimmed
/// bin range.
pub fn build_histogram(values: &[f64]) -> HistogramBundle {
    let finite = finite_sorted(values);
    let n = finite.len();

    let mean = if n > 0 {
        finite.iter().sum::<f64>() / n as f64
    } else {
        f64::NAN
    };
    let std = if n > 1 {
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
        variance.sqrt()
    } else {
        0.0
    };
    let p10 = percentile(&finite, 0.10);
    let p50 = percentile(&finite, 0.50);
    let p90 = percentile(&finite, 0.90);

    let lo = percentile(&finite, 0.005);
    let hi = percentile(&finite, 0.995);
    let (lo, hi) = if n == 0 || hi <= lo {
        (lo, lo + 1.0)
    } else {
        (lo, hi)
    };
    let width = (hi - lo) / HISTOGRAM_BINS as f64;

    let edges: Vec<f64> = (0..=HISTOGRAM_BINS).map(|i| lo + width * i as f64).collect();
    let centers: Vec<f64> = (0..HISTOGRAM_BINS)
        .map(|i| (edges[i] + edges[i + 1]) / 2.0)
        .collect();

    let mut counts = vec![0u64; HISTOGRAM_BINS];
    for &v in &finite {
        if v < lo || v > hi {
            continue;
        }
        let idx = (((v - lo) / width) as usize).min(HISTOGRAM_BINS - 1);
        counts[idx] += 1;
    }

    HistogramBundle {
        edges,
        centers,
        counts,
        mean,
        std,
        p10,
        p50,
        p90,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_map_is_monotone_nondecreasing() {
        let values: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let map = percentile_map(&values);
        let ordered: Vec<f64> = PERCENTILE_LEVELS
            .iter()
            .map(|l| map[&format!("P{l}")])
            .collect();
        for pair in ordered.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn percentile_map_ignores_nan() {
        let mut values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        values.extend(std::iter::repeat(f64::NAN).take(50));
        let map = percentile_map(&values);
        assert_eq!(map.len(), PERCENTILE_LEVELS.len());
        assert!(map["P50"] < 100.0);
    }

    #[test]
    fn percentile_map_is_empty_when_no_finite_values() {
        let values = vec![f64::NAN; 10];
        let map = percentile_map(&values);
        assert!(map.is_empty());
    }

    #[test]
    fn pr_positive_counts_only_finite_entries() {
        let values = vec![1.0, -1.0, f64::NAN, 2.0];
        let p = pr_positive(&values);
        assert!((p - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn pr_less_than_counts_nan_as_failure() {
        let values = vec![1.0, f64::NAN, 25.0];
        // threshold 20, n=4 (one scenario not even represented in `values`)
        let p = pr_less_than(&values, 20.0, 4);
        assert!((p - 1.0 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn histogram_has_expected_shape() {
        let values: Vec<f64> = (0..10_000).map(|i| i as f64 / 100.0).collect();
        let hist = build_histogram(&values);
        assert_eq!(hist.counts.len(), HISTOGRAM_BINS);
        assert_eq!(hist.centers.len(), HISTOGRAM_BINS);
        assert_eq!(hist.edges.len(), HISTOGRAM_BINS + 1);
        let total: u64 = hist.counts.iter().sum();
        assert!(total > 0);
        assert!(total as usize <= values.len());
    }

    #[test]
    fn histogram_trims_extreme_outliers() {
        let mut values: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        values.push(1_000_000.0);
        let hist = build_histogram(&values);
        // The 99.5th-percentile trim should keep the outlier from dominating bin width.
        assert!(hist.edges.last().copied().unwrap() < 100_000.0);
    }

    #[test]
    fn histogram_statistics_use_all_finite_values() {
        let values: Vec<f64> = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let hist = build_histogram(&values);
        assert!((hist.mean - 3.0).abs() < 1e-12);
    }
}
