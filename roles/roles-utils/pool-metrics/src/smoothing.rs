//! Outlier-trimmed averaging of hashrate samples.
//!
//! Short spikes (a worker reconnecting, a scrape landing mid-window) distort
//! a plain mean. The dashboard sorts the samples, drops the same fraction
//! from both tails and averages what is left.

use crate::types::HashratePoint;

/// Fraction trimmed from each tail by default.
pub const DEFAULT_TRIM_FRACTION: f64 = 0.10;

/// Mean of `values` after dropping `floor(n * trim_fraction)` samples from each end.
///
/// Non-finite values are discarded before sorting. `trim_fraction` is
/// clamped to `[0, 0.5)` so at least one sample always survives. Returns
/// `None` when nothing is left to average.
pub fn trimmed_mean(values: &[f64], trim_fraction: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let fraction = if trim_fraction.is_finite() {
        trim_fraction.clamp(0.0, 0.499)
    } else {
        0.0
    };
    let trim = (sorted.len() as f64 * fraction).floor() as usize;
    let kept = &sorted[trim..sorted.len() - trim];

    Some(kept.iter().sum::<f64>() / kept.len() as f64)
}

/// Trimmed mean of a hashrate series at the default trim fraction.
pub fn smoothed_hashrate(points: &[HashratePoint]) -> Option<f64> {
    let values: Vec<f64> = points.iter().map(|p| p.hashrate_ghs).collect();
    trimmed_mean(&values, DEFAULT_TRIM_FRACTION)
}
