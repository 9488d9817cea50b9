//! Human-readable explanation and recommendations for a scored assessment.
//!
//! All wording lives in lookup tables keyed by status or by
//! `(metric, severity)`; composition only orders and joins entries.

use eh_common::{Gear, Metric, Severity};
use serde::Serialize;

use crate::detect::DeviationResult;
use crate::logging::{event_names, Stage};
use crate::score::ScoredAssessment;

/// Rendered text for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub text: String,
    pub recommendations: Vec<String>,
}

const CONTINUE_NORMAL: &str = "Continue normal operation and monitoring.";

/// `drifting` is true when some metric is flagged even though the composite
/// stays in the Normal band.
fn overall_sentence(status: Severity, gear: Gear, drifting: bool) -> String {
    match status {
        Severity::Normal if drifting => format!(
            "Engine is operating within normal limits for this vehicle in gear {gear}. \
             Some metrics are drifting from learned baseline behavior."
        ),
        Severity::Normal => format!(
            "Engine is operating normally for this vehicle in gear {gear}. \
             All metrics are within expected ranges based on learned baseline behavior."
        ),
        Severity::Warning => format!(
            "Engine shows warning signs. Some metrics are deviating from normal behavior \
             for this vehicle in gear {gear}."
        ),
        Severity::Critical => format!(
            "Engine shows critical deviations from normal behavior \
             for this vehicle in gear {gear}. Immediate attention recommended."
        ),
    }
}

fn score_sentence(status: Severity, score: f64) -> String {
    let level = match status {
        Severity::Normal => "Healthy operation.",
        Severity::Warning => "Warning level. Monitor closely.",
        Severity::Critical => "Critical risk level.",
    };
    format!("Engine Safety Score: {score:.1}/100 - {level}")
}

fn severity_tail(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "This is a critical deviation.",
        Severity::Warning => "Monitor for trends.",
        Severity::Normal => "",
    }
}

/// Recommendation per `(metric, severity)`. Normal metrics have none.
fn metric_recommendation(metric: Metric, severity: Severity) -> Option<&'static str> {
    match (metric, severity) {
        (_, Severity::Normal) => None,
        (Metric::EngineTemp, Severity::Critical) => Some(
            "Check engine cooling system. High temperature deviation may indicate cooling issues or excessive load.",
        ),
        (Metric::EngineTemp, Severity::Warning) => {
            Some("Check coolant level and watch engine temperature on the next trips.")
        }
        (Metric::Rpm, Severity::Critical) => Some(
            "Monitor RPM patterns. Unusual RPM behavior may indicate transmission or engine control issues.",
        ),
        (Metric::Rpm, Severity::Warning) => {
            Some("Review driving pattern in this gear; RPM is drifting from its usual range.")
        }
        (Metric::OilPressure, Severity::Critical) => Some(
            "Inspect oil system. Check oil level and pressure regulation. Low pressure can cause engine damage.",
        ),
        (Metric::OilPressure, Severity::Warning) => {
            Some("Check oil level at the next stop and watch oil pressure readings.")
        }
        (Metric::Vibration, Severity::Critical) => Some(
            "Investigate vibration sources. Excessive vibration may indicate mechanical issues or imbalance.",
        ),
        (Metric::Vibration, Severity::Warning) => {
            Some("Check engine mounts and wheel balance if vibration persists.")
        }
    }
}

fn follow_up(status: Severity) -> &'static str {
    match status {
        Severity::Normal => CONTINUE_NORMAL,
        Severity::Warning => {
            "Continue monitoring. If deviations persist or worsen, consider professional inspection."
        }
        Severity::Critical => "Immediate professional inspection recommended to prevent potential damage.",
    }
}

/// Renders scored assessments.
#[derive(Debug, Clone, Copy, Default)]
pub struct Explainer;

impl Explainer {
    pub fn new() -> Self {
        Explainer
    }

    pub fn explain(&self, assessment: &ScoredAssessment) -> Explanation {
        let gear = assessment.key().gear;
        let overall = assessment.overall_status();
        let flagged = flagged_metrics(assessment);

        let mut text = overall_sentence(overall, gear, !flagged.is_empty());
        if !flagged.is_empty() {
            text.push_str("\n\nSpecific deviations detected:");
            for (deviation, severity) in &flagged {
                text.push_str("\n- ");
                text.push_str(&metric_clause(deviation, *severity, gear));
            }
        }
        text.push_str("\n\n");
        text.push_str(&score_sentence(overall, assessment.engine_safety_score()));

        let mut recommendations: Vec<String> = Vec::new();
        let mut push = |rec: &str| {
            if !recommendations.iter().any(|r| r == rec) {
                recommendations.push(rec.to_string());
            }
        };
        for (deviation, severity) in &flagged {
            if let Some(rec) = metric_recommendation(deviation.metric, *severity) {
                push(rec);
            }
        }
        if flagged.is_empty() && overall == Severity::Normal {
            push(CONTINUE_NORMAL);
        } else if overall != Severity::Normal {
            push(follow_up(overall));
        }

        tracing::trace!(
            target: event_names::EVALUATE_FINISHED,
            stage = %Stage::Explain,
            flagged = flagged.len(),
            recommendations = recommendations.len(),
            "explanation rendered"
        );

        Explanation {
            text,
            recommendations,
        }
    }
}

/// Non-Normal metrics, most severe first, ties in declaration order.
fn flagged_metrics(assessment: &ScoredAssessment) -> Vec<(&DeviationResult, Severity)> {
    let mut flagged: Vec<(&DeviationResult, Severity)> = assessment
        .deviations()
        .iter()
        .filter_map(|d| d.severity().map(|s| (d, s)))
        .filter(|(_, s)| *s > Severity::Normal)
        .collect();
    flagged.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.metric.cmp(&b.0.metric)));
    flagged
}

fn metric_clause(deviation: &DeviationResult, severity: Severity, gear: Gear) -> String {
    let name = deviation.metric.display_name();
    let magnitude = magnitude(deviation);
    let expected = match severity {
        Severity::Critical => format!(
            "Expected: {:.1}, Current: {:.1}",
            deviation.expected_mean, deviation.current_value
        ),
        _ => format!("Expected: ~{:.1}", deviation.expected_mean),
    };
    format!(
        "{name} is {magnitude} {dir} than normal for this vehicle in gear {gear} ({expected}). {tail}",
        dir = deviation.direction.comparative(),
        tail = severity_tail(severity),
    )
}

/// "12.3% (2.4σ)", degrading gracefully for non-finite components.
fn magnitude(deviation: &DeviationResult) -> String {
    match (
        deviation.deviation_percent.is_finite(),
        deviation.deviation_std.is_finite(),
    ) {
        (true, true) => format!(
            "{:.1}% ({:.1}σ)",
            deviation.deviation_percent, deviation.deviation_std
        ),
        (true, false) => format!(
            "{:.1}% (outside a constant baseline)",
            deviation.deviation_percent
        ),
        (false, true) => format!("{:.1}σ", deviation.deviation_std),
        (false, false) => "far".to_string(),
    }
}
