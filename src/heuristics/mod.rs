//! Distribution classifier for weighting-potential fields.
//!
//! A valid weighting potential lies mostly in [0, 1], with a cluster at the
//! electrode value 1, a near-zero baseline far from it and a smooth gradient
//! through the bulk. The decision rules are evaluated in a fixed order and the
//! first match wins:
//!
//! 1. spread within `constant_tolerance` gives [`QualityLabel::Constant`]
//! 2. noise fraction above `noise_majority` gives [`QualityLabel::Noise`]
//! 3. unit-range, gradient, electrode and noise checks all passing gives
//!    [`QualityLabel::ValidWeightingPotential`]
//! 4. otherwise [`QualityLabel::Unknown`]

pub mod buckets;

use crate::types::{
    ClassificationResult, ClassifierOptions, DistributionMetrics, FieldSegment, QualityChecks,
    QualityLabel, RegionAlert, Thresholds,
};
use tracing::{debug, warn};

pub use buckets::*;

/// Evaluate the individual quality checks.
///
/// Presence thresholds are inclusive: a sample with exactly the minimum
/// fraction passes.
pub fn quality_checks(metrics: &DistributionMetrics, thresholds: &Thresholds) -> QualityChecks {
    QualityChecks {
        gradient_present: metrics.mid_range_fraction >= thresholds.min_mid_range,
        electrode_present: metrics.near_one_fraction >= thresholds.min_near_one,
        noise_acceptable: metrics.noise_fraction < thresholds.max_noise_for_valid
            || thresholds.max_noise_for_valid >= 1.0,
    }
}

/// Apply the decision rules to computed metrics.
pub fn decide(metrics: &DistributionMetrics, thresholds: &Thresholds) -> QualityLabel {
    if metrics.max - metrics.min <= thresholds.constant_tolerance {
        return QualityLabel::Constant;
    }
    if metrics.noise_fraction > thresholds.noise_majority {
        return QualityLabel::Noise;
    }
    if metrics.in_unit_range_fraction > thresholds.min_unit_range
        && quality_checks(metrics, thresholds).all_pass()
    {
        return QualityLabel::ValidWeightingPotential;
    }
    QualityLabel::Unknown
}

/// Classify a complete sequence.
pub fn classify(values: &[f64], thresholds: &Thresholds) -> ClassificationResult {
    let options = ClassifierOptions::new().with_thresholds(*thresholds);
    classify_sample(values, true, None, &options)
}

/// Classify a possibly partial sample with an optional validity-region hint.
///
/// An empty sample degrades to [`QualityLabel::Unknown`] without metrics.
pub fn classify_sample(
    values: &[f64],
    sample_complete: bool,
    region_hint: Option<&str>,
    options: &ClassifierOptions,
) -> ClassificationResult {
    let thresholds = &options.thresholds;
    let metrics = match compute_metrics(values, thresholds) {
        Ok(metrics) => metrics,
        Err(err) => {
            debug!(error = %err, "no statistics for sample");
            return ClassificationResult::no_data(sample_complete);
        }
    };

    let label = decide(&metrics, thresholds);
    let checks = quality_checks(&metrics, thresholds);
    let alert = region_alert(label, region_hint, &options.critical_region);
    if let Some(alert) = &alert {
        warn!(%alert, "critical region check failed");
    }

    debug!(
        %label,
        n = metrics.sample_size,
        noise = metrics.noise_fraction,
        unit = metrics.in_unit_range_fraction,
        mid = metrics.mid_range_fraction,
        near_one = metrics.near_one_fraction,
        sample_complete,
        "classified sample"
    );

    ClassificationResult {
        segment: 0,
        label,
        metrics: Some(metrics),
        checks: Some(checks),
        sample_complete,
        alert,
    }
}

/// Classify the values held by a segment.
pub fn classify_segment(segment: &FieldSegment, options: &ClassifierOptions) -> ClassificationResult {
    classify_sample(
        &segment.values,
        segment.sample_complete,
        segment.validity_region.as_deref(),
        options,
    )
    .for_segment(segment.ordinal)
}

fn region_alert(label: QualityLabel, region: Option<&str>, critical: &str) -> Option<RegionAlert> {
    match region {
        Some(region)
            if label == QualityLabel::Noise && !critical.is_empty() && region.contains(critical) =>
        {
            Some(RegionAlert::NoiseInCriticalRegion {
                region: region.to_string(),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// Low-discrepancy sequence in [0, 1).
    fn golden(n: usize) -> impl Iterator<Item = f64> {
        const PHI: f64 = 0.618_033_988_749_894_9;
        (0..n).map(|i| (i as f64 * PHI).fract())
    }

    fn weighting_mix() -> Vec<f64> {
        let mut values = vec![0.0; 100];
        values.extend(std::iter::repeat(1.0).take(100));
        values.extend((0..800).map(|i| 0.1 + 0.8 * (i as f64 + 0.5) / 800.0));
        values
    }

    #[test]
    fn test_zeros_are_constant() {
        let result = classify(&[0.0; 1000], &Thresholds::strict());
        assert_eq!(result.label, QualityLabel::Constant);
        assert!(result.sample_complete);
    }

    #[test]
    fn test_sub_epsilon_values_are_noise() {
        let values: Vec<f64> = golden(1000).map(|u| u * 1e-12).collect();
        let result = classify(&values, &Thresholds::strict());
        assert_eq!(result.label, QualityLabel::Noise);
        assert_eq!(result.metrics.unwrap().noise_fraction, 1.0);
    }

    #[test]
    fn test_weighting_mix_is_valid() {
        let result = classify(&weighting_mix(), &Thresholds::strict());
        assert_eq!(result.label, QualityLabel::ValidWeightingPotential);
        assert!(result.sample_complete);
        let checks = result.checks.unwrap();
        assert!(checks.all_pass());
        let m = result.metrics.unwrap();
        assert_eq!(m.near_one_fraction, 0.1);
        assert_eq!(m.noise_fraction, 0.1);
    }

    #[test]
    fn test_empty_is_unknown_without_metrics() {
        let result = classify(&[], &Thresholds::strict());
        assert_eq!(result.label, QualityLabel::Unknown);
        assert!(result.metrics.is_none());
        assert!(!result.has_data());
    }

    #[test]
    fn test_out_of_range_is_unknown() {
        let values: Vec<f64> = golden(500).map(|u| 5.0 + u * 10.0).collect();
        assert_eq!(classify(&values, &Thresholds::strict()).label, QualityLabel::Unknown);
    }

    #[test]
    fn test_legacy_accepts_missing_gradient() {
        let mut values = vec![0.05; 900];
        values.extend(std::iter::repeat(1.0).take(100));

        let strict = classify(&values, &Thresholds::strict());
        assert_eq!(strict.label, QualityLabel::Unknown);
        assert!(!strict.checks.unwrap().gradient_present);

        let legacy = classify(&values, &Thresholds::legacy());
        assert_eq!(legacy.label, QualityLabel::ValidWeightingPotential);
    }

    #[test]
    fn test_legacy_electrode_share() {
        // 3% and 6% of values at 1, over a sample of 1000
        let mut sparse = vec![0.5; 970];
        sparse.extend(std::iter::repeat(1.0).take(30));
        let mut enough = vec![0.5; 940];
        enough.extend(std::iter::repeat(1.0).take(60));

        let legacy = Thresholds::legacy();
        assert_eq!(legacy.min_near_one, 0.05);
        assert_eq!(classify(&sparse, &legacy).label, QualityLabel::Unknown);
        assert_eq!(classify(&enough, &legacy).label, QualityLabel::ValidWeightingPotential);
    }

    #[test]
    fn test_noise_guard_blocks_valid() {
        // 60% zeros: below the noise majority but above the valid ceiling
        let mut values = vec![0.0; 600];
        values.extend(std::iter::repeat(1.0).take(200));
        values.extend(std::iter::repeat(0.5).take(200));
        let result = classify(&values, &Thresholds::strict());
        assert_eq!(result.label, QualityLabel::Unknown);
        assert!(!result.checks.unwrap().noise_acceptable);
        assert_eq!(
            classify(&values, &Thresholds::legacy()).label,
            QualityLabel::ValidWeightingPotential
        );
    }

    #[test]
    fn test_partial_sample_is_provisional() {
        let options = ClassifierOptions::new();
        let result = classify_sample(&weighting_mix(), false, None, &options);
        assert_eq!(result.label, QualityLabel::ValidWeightingPotential);
        assert!(result.is_provisional());
    }

    #[test]
    fn test_critical_region_alert() {
        let options = ClassifierOptions::new();
        let noise = vec![1e-13; 10];
        let mut noisy = noise.clone();
        noisy.push(2e-13);

        let result = classify_sample(&noisy, true, Some("BULK"), &options);
        assert_eq!(result.label, QualityLabel::Noise);
        assert_eq!(
            result.alert,
            Some(RegionAlert::NoiseInCriticalRegion {
                region: "BULK".to_string()
            })
        );

        let contact = classify_sample(&noisy, true, Some("Contact1"), &options);
        assert!(contact.alert.is_none());

        let constant = classify_sample(&noise, true, Some("BULK"), &options);
        assert_eq!(constant.label, QualityLabel::Constant);
        assert!(constant.alert.is_none());
    }

    #[test]
    fn test_classify_segment_carries_ordinal() {
        let mut seg = FieldSegment::text_stub(3, "F", Some("BULK".into()), 1000, 0, 0..0);
        seg.fill(weighting_mix(), 0);
        let result = classify_segment(&seg, &ClassifierOptions::new());
        assert_eq!(result.segment, 3);
        assert!(result.sample_complete);
    }

    #[test]
    fn test_non_finite_values_ignored() {
        let mut values = weighting_mix();
        values.push(f64::NAN);
        let result = classify(&values, &Thresholds::strict());
        assert_eq!(result.label, QualityLabel::ValidWeightingPotential);
        assert_eq!(result.metrics.unwrap().non_finite, 1);
    }

    proptest! {
        #[test]
        fn test_permutation_invariance(
            (original, shuffled) in prop::collection::vec(-0.5f64..1.5, 1..300)
                .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
        ) {
            let thresholds = Thresholds::strict();
            prop_assert_eq!(classify(&original, &thresholds), classify(&shuffled, &thresholds));
        }
    }
}
