//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::engine::{DetectorThresholds, EngineConfig, LearnerConfig, ScoringConfig};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate engine configuration semantically.
pub fn validate_engine(config: &EngineConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    validate_learner(&config.learner)?;
    validate_detector(&config.detector)?;
    validate_scoring(&config.scoring)?;

    Ok(())
}

fn validate_learner(learner: &LearnerConfig) -> ValidationResult<()> {
    if learner.min_samples < 2 {
        return Err(ValidationError::InvalidValue {
            field: "learner.min_samples".to_string(),
            message: format!("Must be >= 2, got {}", learner.min_samples),
        });
    }

    if let Some(window) = learner.window_size {
        if (window as u64) < learner.min_samples {
            return Err(ValidationError::InvalidValue {
                field: "learner.window_size".to_string(),
                message: format!(
                    "Must be >= learner.min_samples ({}), got {}",
                    learner.min_samples, window
                ),
            });
        }
    }

    Ok(())
}

fn validate_detector(detector: &DetectorThresholds) -> ValidationResult<()> {
    let positive = [
        ("detector.warning_std", detector.warning_std),
        ("detector.critical_std", detector.critical_std),
        ("detector.warning_percent", detector.warning_percent),
        ("detector.critical_percent", detector.critical_percent),
        ("detector.range_multiplier", detector.range_multiplier),
    ];
    for (field, value) in positive {
        if !value.is_finite() || value <= 0.0 {
            return Err(ValidationError::InvalidValue {
                field: field.to_string(),
                message: format!("Must be a positive number, got {}", value),
            });
        }
    }

    if detector.warning_std >= detector.critical_std {
        return Err(ValidationError::SemanticError(format!(
            "detector.warning_std ({}) must be below detector.critical_std ({})",
            detector.warning_std, detector.critical_std
        )));
    }

    if detector.warning_percent >= detector.critical_percent {
        return Err(ValidationError::SemanticError(format!(
            "detector.warning_percent ({}) must be below detector.critical_percent ({})",
            detector.warning_percent, detector.critical_percent
        )));
    }

    Ok(())
}

fn validate_scoring(scoring: &ScoringConfig) -> ValidationResult<()> {
    let w = &scoring.weights;
    for (field, value) in [
        ("scoring.weights.engine_temp", w.engine_temp),
        ("scoring.weights.rpm", w.rpm),
        ("scoring.weights.oil_pressure", w.oil_pressure),
        ("scoring.weights.vibration", w.vibration),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: field.to_string(),
                message: format!("Must be non-negative, got {}", value),
            });
        }
    }

    let sum = w.sum();
    if (sum - 1.0).abs() > 0.001 {
        return Err(ValidationError::SemanticError(format!(
            "Scoring weights must sum to 1.0, got {} (engine_temp={}, rpm={}, oil_pressure={}, vibration={})",
            sum, w.engine_temp, w.rpm, w.oil_pressure, w.vibration
        )));
    }

    let a = &scoring.anchors;
    let ordered =
        a.normal <= 100.0 && a.normal > a.warning && a.warning > a.critical && a.critical >= 0.0;
    if !ordered {
        return Err(ValidationError::SemanticError(format!(
            "Score anchors must satisfy 100 >= normal > warning > critical >= 0, got {}/{}/{}",
            a.normal, a.warning, a.critical
        )));
    }

    if !a.zero_at.is_finite() || a.zero_at <= 2.0 {
        return Err(ValidationError::InvalidValue {
            field: "scoring.anchors.zero_at".to_string(),
            message: format!("Must be beyond the Critical position (2.0), got {}", a.zero_at),
        });
    }

    Ok(())
}
