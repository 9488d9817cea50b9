//! Telemetry samples and input validation.
//!
//! A sample is validated before it can reach a learner or detector; a record
//! that fails here never touches a baseline.

use crate::error::{Error, Result};
use crate::id::{BaselineKey, Gear, VehicleId};
use crate::metric::Metric;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One engine telemetry reading. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub vehicle_id: VehicleId,
    pub gear: Gear,
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Utc>,
    pub rpm: f64,
    #[serde(alias = "engine_temp_c")]
    pub engine_temp: f64,
    #[serde(alias = "oil_pressure_psi")]
    pub oil_pressure: f64,
    pub vibration: f64,
    #[serde(alias = "speed_kmph")]
    pub speed: f64,
}

impl TelemetrySample {
    /// The `(vehicle, gear)` partition this sample belongs to.
    pub fn key(&self) -> BaselineKey {
        BaselineKey::new(self.vehicle_id.clone(), self.gear)
    }

    /// Value of one monitored metric.
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::EngineTemp => self.engine_temp,
            Metric::Rpm => self.rpm,
            Metric::OilPressure => self.oil_pressure,
            Metric::Vibration => self.vibration,
        }
    }

    /// Reject samples that would corrupt a baseline.
    pub fn validate(&self) -> Result<()> {
        if !self.vehicle_id.is_valid() {
            return Err(Error::MalformedSample(format!(
                "invalid vehicle_id {:?}",
                self.vehicle_id.as_str()
            )));
        }
        if self.gear == 0 {
            return Err(Error::MalformedSample(format!(
                "gear must be >= 1 for vehicle {}",
                self.vehicle_id
            )));
        }
        for metric in Metric::ALL {
            let value = self.value(metric);
            if !value.is_finite() {
                return Err(Error::MalformedSample(format!(
                    "{} is not a finite number ({}) for {}",
                    metric,
                    value,
                    self.key()
                )));
            }
        }
        if !self.speed.is_finite() {
            return Err(Error::MalformedSample(format!(
                "speed is not a finite number for {}",
                self.key()
            )));
        }
        Ok(())
    }

    /// Parse and validate one JSON record.
    pub fn from_json(input: &str) -> Result<Self> {
        let sample: TelemetrySample = serde_json::from_str(input)
            .map_err(|e| Error::MalformedSample(e.to_string()))?;
        sample.validate()?;
        Ok(sample)
    }

    /// Parse JSON-lines input. Blank lines are skipped; errors name the line.
    pub fn parse_jsonl(input: &str) -> Result<Vec<Self>> {
        let mut samples = Vec::new();
        for (idx, line) in input.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let sample = Self::from_json(line).map_err(|e| match e {
                Error::MalformedSample(msg) => {
                    Error::MalformedSample(format!("line {}: {}", idx + 1, msg))
                }
                other => other,
            })?;
            samples.push(sample);
        }
        Ok(samples)
    }
}

/// RFC 3339 on output; on input also accepts naive ISO-8601 timestamps,
/// interpreted as UTC.
mod timestamp_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, fmt) {
                return Ok(naive.and_utc());
            }
        }
        Err(serde::de::Error::custom(format!("unparseable timestamp {:?}", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"vehicle_id":"VH_01","gear":1,"timestamp":"2024-01-01T08:00:00","rpm":1474.3,"engine_temp_c":88.2,"oil_pressure_psi":42.0,"vibration":0.31,"speed_kmph":18.5}"#;

    #[test]
    fn parses_column_aliases_and_naive_timestamp() {
        let sample = TelemetrySample::from_json(VALID).unwrap();
        assert_eq!(sample.vehicle_id.as_str(), "VH_01");
        assert_eq!(sample.gear, 1);
        assert_eq!(sample.engine_temp, 88.2);
        assert_eq!(sample.oil_pressure, 42.0);
        assert_eq!(sample.speed, 18.5);
        assert_eq!(sample.timestamp.to_rfc3339(), "2024-01-01T08:00:00+00:00");
        assert_eq!(sample.key(), BaselineKey::new("VH_01", 1));
    }

    #[test]
    fn value_maps_every_metric() {
        let sample = TelemetrySample::from_json(VALID).unwrap();
        assert_eq!(sample.value(Metric::Rpm), 1474.3);
        assert_eq!(sample.value(Metric::EngineTemp), 88.2);
        assert_eq!(sample.value(Metric::OilPressure), 42.0);
        assert_eq!(sample.value(Metric::Vibration), 0.31);
    }

    #[test]
    fn non_numeric_field_is_malformed() {
        let bad = VALID.replace("1474.3", "\"fast\"");
        let err = TelemetrySample::from_json(&bad).unwrap_err();
        assert!(matches!(err, Error::MalformedSample(_)));
    }

    #[test]
    fn missing_field_is_malformed() {
        let bad = VALID.replace(r#""vibration":0.31,"#, "");
        let err = TelemetrySample::from_json(&bad).unwrap_err();
        assert!(matches!(err, Error::MalformedSample(ref m) if m.contains("vibration")));
    }

    #[test]
    fn zero_gear_is_malformed() {
        let bad = VALID.replace(r#""gear":1"#, r#""gear":0"#);
        assert!(matches!(
            TelemetrySample::from_json(&bad),
            Err(Error::MalformedSample(_))
        ));
    }

    #[test]
    fn non_finite_metric_is_malformed() {
        let mut sample = TelemetrySample::from_json(VALID).unwrap();
        sample.oil_pressure = f64::NAN;
        let err = sample.validate().unwrap_err();
        assert!(err.to_string().contains("oil_pressure"));
    }

    #[test]
    fn jsonl_errors_name_the_line() {
        let input = format!("{}\n\n{}\n", VALID, r#"{"vehicle_id":"VH_01"}"#);
        let err = TelemetrySample::parse_jsonl(&input).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{}", err);
    }

    #[test]
    fn jsonl_skips_blank_lines() {
        let input = format!("\n{}\n{}\n\n", VALID, VALID);
        assert_eq!(TelemetrySample::parse_jsonl(&input).unwrap().len(), 2);
    }

    #[test]
    fn serializes_rfc3339() {
        let sample = TelemetrySample::from_json(VALID).unwrap();
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["timestamp"], "2024-01-01T08:00:00+00:00");
        assert_eq!(json["engine_temp"], 88.2);
    }
}
