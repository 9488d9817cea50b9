//! Property-based tests for detection and scoring invariants.

use chrono::{Duration, TimeZone, Utc};
use eh_common::{BaselineKey, Metric, Severity, TelemetrySample};
use eh_config::{DetectorThresholds, LearnerConfig, ScoringConfig};
use eh_core::baseline::{BaselineLearner, MetricBaseline};
use eh_core::{DeviationDetector, DeviationResult, RiskScorer};
use eh_math::{relative_eq, VarianceKind};
use proptest::prelude::*;

fn detector() -> DeviationDetector {
    DeviationDetector::new(DetectorThresholds::default(), 10)
}

fn scorer() -> RiskScorer {
    RiskScorer::new(&ScoringConfig::default(), &DetectorThresholds::default())
        .expect("default scoring config is valid")
}

fn key() -> BaselineKey {
    BaselineKey::new("VH_01", 2)
}

/// `(mean, std_dev, offset in std devs)` for one metric.
fn reading_strategy() -> impl Strategy<Value = (f64, f64, f64)> {
    (1.0f64..5_000.0, 0.01f64..0.5, -8.0f64..8.0)
        .prop_map(|(mean, rel_std, offset)| (mean, mean * rel_std, offset))
}

fn deviation_for(metric: Metric, (mean, std_dev, offset): (f64, f64, f64)) -> DeviationResult {
    let baseline = MetricBaseline::from_moments(50, mean, std_dev, VarianceKind::Sample);
    detector()
        .detect_metric(&key(), metric, mean + offset * std_dev, Some(&baseline))
        .expect("baseline has enough samples")
}

fn deviations_strategy() -> impl Strategy<Value = Vec<DeviationResult>> {
    prop::array::uniform4(reading_strategy()).prop_map(|readings| {
        Metric::ALL
            .into_iter()
            .zip(readings)
            .map(|(metric, reading)| deviation_for(metric, reading))
            .collect()
    })
}

fn status_floor(score: f64) -> Severity {
    if score >= 85.0 {
        Severity::Normal
    } else if score >= 60.0 {
        Severity::Warning
    } else {
        Severity::Critical
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn stricter_basis_wins(reading in reading_strategy()) {
        let d = detector();
        let result = deviation_for(Metric::Rpm, reading);
        let expected = d
            .classify_std(result.deviation_std)
            .max(d.classify_percent(result.deviation_percent));
        prop_assert_eq!(result.severity(), Some(expected));
    }

    #[test]
    fn score_is_bounded_and_status_follows_floors(devs in deviations_strategy()) {
        let assessment = scorer().score(&key(), &devs).expect("all metrics known");
        let score = assessment.engine_safety_score();
        prop_assert!((0.0..=100.0).contains(&score), "score out of range: {}", score);
        prop_assert_eq!(assessment.overall_status(), status_floor(score));
        for ms in assessment.metric_scores() {
            prop_assert!((0.0..=100.0).contains(&ms.score));
        }
    }

    #[test]
    fn score_ignores_input_order(devs in deviations_strategy()) {
        let s = scorer();
        let forward = s.score(&key(), &devs).unwrap();
        let mut reversed = devs.clone();
        reversed.reverse();
        let backward = s.score(&key(), &reversed).unwrap();
        prop_assert_eq!(forward.engine_safety_score(), backward.engine_safety_score());
        prop_assert_eq!(forward.metric_scores(), backward.metric_scores());
        prop_assert_eq!(forward.deviations(), backward.deviations());
    }

    #[test]
    fn drifting_further_never_raises_score(
        readings in prop::array::uniform4(reading_strategy()),
        which in 0usize..4,
        extra in 0.0f64..5.0,
    ) {
        let s = scorer();
        let base: Vec<DeviationResult> = Metric::ALL
            .into_iter()
            .zip(readings)
            .map(|(metric, reading)| deviation_for(metric, reading))
            .collect();

        let mut drifted_readings = readings;
        let (mean, std_dev, offset) = drifted_readings[which];
        let further = if offset >= 0.0 { offset + extra } else { offset - extra };
        drifted_readings[which] = (mean, std_dev, further);
        let drifted: Vec<DeviationResult> = Metric::ALL
            .into_iter()
            .zip(drifted_readings)
            .map(|(metric, reading)| deviation_for(metric, reading))
            .collect();

        let before = s.score(&key(), &base).unwrap();
        let after = s.score(&key(), &drifted).unwrap();
        prop_assert!(
            after.engine_safety_score() <= before.engine_safety_score() + 1e-9,
            "score rose from {} to {}",
            before.engine_safety_score(),
            after.engine_safety_score()
        );
        prop_assert!(after.overall_status() >= before.overall_status());
    }
}

fn history(values: &[(f64, f64, f64, f64)]) -> Vec<TelemetrySample> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    values
        .iter()
        .enumerate()
        .map(|(i, &(temp, rpm, oil, vib))| TelemetrySample {
            vehicle_id: "VH_01".into(),
            gear: 2,
            timestamp: start + Duration::seconds(i as i64),
            rpm,
            engine_temp: temp,
            oil_pressure: oil,
            vibration: vib,
            speed: 40.0,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn incremental_learning_matches_batch(
        values in prop::collection::vec(
            (60.0f64..120.0, 600.0f64..4_000.0, 10.0f64..80.0, 0.1f64..3.0),
            2..60,
        )
    ) {
        let learner = BaselineLearner::new(LearnerConfig::default());
        let samples = history(&values);

        let batch = learner.learn(&key(), &samples).unwrap();
        let mut incremental = None;
        for sample in &samples {
            incremental = Some(learner.fold(incremental.as_ref(), sample).unwrap());
        }
        let incremental = incremental.unwrap();

        for metric in Metric::ALL {
            let a = batch.metric(metric);
            let b = incremental.metric(metric);
            prop_assert_eq!(a.count, b.count);
            prop_assert!(
                relative_eq(a.mean, b.mean, 1e-9),
                "{} mean {} vs {}",
                metric,
                a.mean,
                b.mean
            );
            prop_assert!(
                relative_eq(a.std_dev, b.std_dev, 1e-6) || (a.std_dev - b.std_dev).abs() < 1e-9,
                "{} std {} vs {}", metric, a.std_dev, b.std_dev
            );
        }
    }
}
