//! Bucketed statistics over numeric sequences.
//!
//! All statistics are computed over the finite values sorted with
//! `f64::total_cmp`, so results are bit-for-bit identical for any ordering
//! of the same input.

use crate::error::{FieldError, Result};
use crate::types::{BandBreakdown, DistributionMetrics, HistogramBin, Thresholds};

/// Lower bound of the `small` band (and upper bound of `very_small`).
pub const VERY_SMALL_LIMIT: f64 = 1e-6;

/// Bins in the [min, max] histogram.
pub const RANGE_BINS: usize = 20;

/// Compute metrics over `values`.
///
/// NaN and infinite values are counted in `non_finite` and otherwise ignored.
/// Returns [`FieldError::EmptySequence`] when no finite value remains.
pub fn compute_metrics(values: &[f64], thresholds: &Thresholds) -> Result<DistributionMetrics> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let non_finite = values.len() - sorted.len();
    if sorted.is_empty() {
        return Err(FieldError::EmptySequence);
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let total = n as f64;
    let t = thresholds;

    let mut noise = 0usize;
    let mut near_one = 0usize;
    let mut in_unit = 0usize;
    let mut mid = 0usize;
    let mut negative = 0usize;
    let mut non_zero = 0usize;
    let mut bands = BandBreakdown::default();
    let mut unit_histogram = [0usize; 10];
    let mut sum = 0.0;

    for &v in &sorted {
        sum += v;
        if v.abs() < t.noise_epsilon {
            noise += 1;
        }
        if v >= 1.0 - t.near_one_tolerance && v <= 1.0 + t.near_one_tolerance {
            near_one += 1;
        }
        if (0.0..=1.0).contains(&v) {
            in_unit += 1;
            let bin = ((v * 10.0) as usize).min(9);
            unit_histogram[bin] += 1;
        }
        if v > t.mid_range_low && v < t.mid_range_high {
            mid += 1;
        }
        if v < 0.0 {
            negative += 1;
        }
        if v != 0.0 {
            non_zero += 1;
        }
        add_to_band(&mut bands, v, t.noise_epsilon);
    }

    let mean = sum / total;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / total;

    let min = sorted[0];
    let max = sorted[n - 1];

    Ok(DistributionMetrics {
        sample_size: n,
        non_finite,
        noise_fraction: noise as f64 / total,
        near_one_fraction: near_one as f64 / total,
        in_unit_range_fraction: in_unit as f64 / total,
        mid_range_fraction: mid as f64 / total,
        negative_fraction: negative as f64 / total,
        mean,
        std_dev: variance.sqrt(),
        min,
        max,
        median: median(&sorted),
        non_zero,
        bands,
        unit_histogram,
        dominant_bin: dominant_bin(&sorted, RANGE_BINS),
    })
}

/// Put `v` in exactly one band. Noise wins over sign.
fn add_to_band(bands: &mut BandBreakdown, v: f64, noise_epsilon: f64) {
    if v.abs() < noise_epsilon {
        bands.noise += 1;
    } else if v < 0.0 {
        bands.negative += 1;
    } else if v < VERY_SMALL_LIMIT {
        bands.very_small += 1;
    } else if v < 0.1 {
        bands.small += 1;
    } else if v < 0.9 {
        bands.mid += 1;
    } else if v <= 1.1 {
        bands.near_one += 1;
    } else {
        bands.above_one += 1;
    }
}

/// Median of an already sorted, non-empty slice.
fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Most populated of `bins` equal bins over [min, max]; first bin wins ties.
pub fn dominant_bin(sorted: &[f64], bins: usize) -> Option<HistogramBin> {
    let (&min, &max) = (sorted.first()?, sorted.last()?);
    if bins == 0 {
        return None;
    }
    if max == min {
        return Some(HistogramBin {
            low: min,
            high: max,
            count: sorted.len(),
        });
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in sorted {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let (idx, &count) = counts
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|&(_, &c)| c)?;
    Some(HistogramBin {
        low: min + idx as f64 * width,
        high: min + (idx + 1) as f64 * width,
        count,
    })
}
