//! Property-based tests for the shared data model.
//!
//! Keys, severity ordering and sample validation are relied on by every
//! other crate, so their laws are checked across random inputs here.

use chrono::{TimeZone, Utc};
use eh_common::{BaselineKey, Error, Metric, MetricStatus, Severity, TelemetrySample};
use proptest::prelude::*;

fn vehicle_ids() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,16}"
}

fn severities() -> impl Strategy<Value = Severity> {
    prop::sample::select(Severity::ALL.to_vec())
}

fn finite() -> impl Strategy<Value = f64> {
    -1.0e6..1.0e6f64
}

fn sample(vehicle: &str, gear: u8, values: [f64; 4]) -> TelemetrySample {
    TelemetrySample {
        vehicle_id: vehicle.into(),
        gear,
        timestamp: Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 0).unwrap(),
        engine_temp: values[0],
        rpm: values[1],
        oil_pressure: values[2],
        vibration: values[3],
        speed: 40.0,
    }
}

// ============================================================================
// BaselineKey properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// The display form parses back to the same key.
    #[test]
    fn key_display_parses_back(vehicle in vehicle_ids(), gear in 1u8..=u8::MAX) {
        let key = BaselineKey::new(vehicle.as_str(), gear);
        prop_assert_eq!(BaselineKey::parse(&key.to_string()), Some(key));
    }

    /// Keys never pool gears of one vehicle.
    #[test]
    fn gears_are_distinct_keys(vehicle in vehicle_ids(), a in 1u8..=20, b in 1u8..=20) {
        let ka = BaselineKey::new(vehicle.as_str(), a);
        let kb = BaselineKey::new(vehicle.as_str(), b);
        prop_assert_eq!(ka == kb, a == b);
        prop_assert_eq!(ka.to_string() == kb.to_string(), a == b);
    }
}

// ============================================================================
// Severity properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// The maximum of a set of verdicts is Critical if any is Critical,
    /// else Warning if any is Warning, else Normal.
    #[test]
    fn worst_severity_wins(levels in prop::collection::vec(severities(), 1..12)) {
        let worst = levels.iter().copied().max().unwrap();
        let expected = if levels.contains(&Severity::Critical) {
            Severity::Critical
        } else if levels.contains(&Severity::Warning) {
            Severity::Warning
        } else {
            Severity::Normal
        };
        prop_assert_eq!(worst, expected);
    }

    /// A known status carries its severity back unchanged.
    #[test]
    fn status_preserves_severity(level in severities()) {
        let status = MetricStatus::from(level);
        prop_assert!(status.is_known());
        prop_assert_eq!(status.severity(), Some(level));
    }
}

// ============================================================================
// Sample validation properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Any finite reading with a usable key validates.
    #[test]
    fn finite_samples_validate(
        vehicle in vehicle_ids(),
        gear in 1u8..=12,
        values in prop::array::uniform4(finite()),
    ) {
        let s = sample(&vehicle, gear, values);
        prop_assert!(s.validate().is_ok());
        for (metric, value) in Metric::ALL.into_iter().zip(values) {
            prop_assert_eq!(s.value(metric), value);
        }
    }

    /// One non-finite metric is enough to reject the sample.
    #[test]
    fn non_finite_metric_rejected(
        values in prop::array::uniform4(finite()),
        slot in 0usize..4,
        bad in prop::sample::select(vec![f64::NAN, f64::INFINITY, f64::NEG_INFINITY]),
    ) {
        let mut values = values;
        values[slot] = bad;
        let s = sample("VH_01", 1, values);
        prop_assert!(matches!(s.validate(), Err(Error::MalformedSample(_))));
    }
}
