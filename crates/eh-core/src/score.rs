//! Risk scoring: four deviations in, one bounded safety score out.
//!
//! Each metric is placed on a severity axis where 0 is the mean, 1 the
//! Warning boundary and 2 the Critical boundary (the larger of the std and
//! percent positions). A non-increasing anchor curve maps that position to a
//! 0..=100 score; the composite is the weighted sum.

use eh_common::{BaselineKey, Error, Metric, MetricStatus, Result, Severity};
use eh_config::{DetectorThresholds, ScoreAnchors, ScoringConfig, ScoringWeights};
use eh_math::{round_to, Extrapolation, PiecewiseLinear};
use serde::Serialize;

use crate::detect::DeviationResult;
use crate::logging::{event_names, Stage};

/// One metric's contribution to the composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricScore {
    pub metric: Metric,
    pub status: Severity,
    pub severity_position: f64,
    pub score: f64,
    pub weight: f64,
    pub weighted: f64,
}

/// A fully scored evaluation. Only [`RiskScorer::score`] builds one, and
/// only when every metric carries a known verdict.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredAssessment {
    key: BaselineKey,
    deviations: Vec<DeviationResult>,
    metric_scores: Vec<MetricScore>,
    engine_safety_score: f64,
    overall_status: Severity,
}

impl ScoredAssessment {
    pub fn key(&self) -> &BaselineKey {
        &self.key
    }

    /// Deviations in declaration order.
    pub fn deviations(&self) -> &[DeviationResult] {
        &self.deviations
    }

    pub fn metric_scores(&self) -> &[MetricScore] {
        &self.metric_scores
    }

    pub fn engine_safety_score(&self) -> f64 {
        self.engine_safety_score
    }

    pub fn overall_status(&self) -> Severity {
        self.overall_status
    }

    /// Per-metric severity. Always known inside an assessment.
    pub fn metric_severity(&self, metric: Metric) -> Severity {
        self.metric_scores
            .iter()
            .find(|s| s.metric == metric)
            .map(|s| s.status)
            .unwrap_or_default()
    }

    pub fn into_parts(self) -> (Vec<DeviationResult>, Vec<MetricScore>) {
        (self.deviations, self.metric_scores)
    }
}

/// Maps deviations to scores.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    weights: ScoringWeights,
    anchors: ScoreAnchors,
    std_axis: PiecewiseLinear,
    percent_axis: PiecewiseLinear,
    score_curve: PiecewiseLinear,
}

impl RiskScorer {
    /// Build the curves. Fails with `InvalidConfig` if thresholds or anchors
    /// cannot form a valid monotone curve.
    pub fn new(scoring: &ScoringConfig, thresholds: &DetectorThresholds) -> Result<Self> {
        let std_axis = position_axis(thresholds.warning_std, thresholds.critical_std)
            .ok_or_else(|| {
                Error::InvalidConfig("std thresholds must satisfy 0 < warning < critical".into())
            })?;
        let percent_axis = position_axis(thresholds.warning_percent, thresholds.critical_percent)
            .ok_or_else(|| {
                Error::InvalidConfig("percent thresholds must satisfy 0 < warning < critical".into())
            })?;

        let a = &scoring.anchors;
        let score_curve = PiecewiseLinear::new(
            vec![
                (0.0, a.normal),
                (1.0, a.warning),
                (2.0, a.critical),
                (a.zero_at, 0.0),
            ],
            Extrapolation::Clamp,
        )
        .filter(PiecewiseLinear::is_non_increasing)
        .ok_or_else(|| {
            Error::InvalidConfig("score anchors must be non-increasing and zero_at > 2".into())
        })?;

        Ok(Self {
            weights: scoring.weights.clone(),
            anchors: a.clone(),
            std_axis,
            percent_axis,
            score_curve,
        })
    }

    /// Position on the severity axis, or `None` for `Unknown`.
    pub fn severity_position(&self, deviation: &DeviationResult) -> Option<f64> {
        if !deviation.status.is_known() {
            return None;
        }
        let by_std = self.std_axis.eval(deviation.deviation_std);
        let by_percent = self.percent_axis.eval(deviation.deviation_percent);
        Some(by_std.max(by_percent).max(0.0))
    }

    /// Score for a severity position: 100 at 0, down to 0 at `zero_at`.
    pub fn position_score(&self, position: f64) -> f64 {
        self.score_curve.eval(position).clamp(0.0, 100.0)
    }

    /// Overall status from a composite score. The Warning and Critical
    /// anchors are the floors.
    pub fn overall_status(&self, score: f64) -> Severity {
        if score >= self.anchors.warning {
            Severity::Normal
        } else if score >= self.anchors.critical {
            Severity::Warning
        } else {
            Severity::Critical
        }
    }

    /// Score all four deviations. Fails with `InsufficientBaseline` naming
    /// every `Unknown` metric.
    pub fn score(
        &self,
        key: &BaselineKey,
        deviations: &[DeviationResult],
    ) -> Result<ScoredAssessment> {
        let missing: Vec<Metric> = Metric::ALL
            .into_iter()
            .filter(|m| {
                deviations
                    .iter()
                    .find(|d| d.metric == *m)
                    .map_or(true, |d| d.status == MetricStatus::Unknown)
            })
            .collect();
        if !missing.is_empty() {
            return Err(Error::InsufficientBaseline {
                vehicle_id: key.vehicle_id.clone(),
                gear: key.gear,
                missing,
            });
        }

        let mut ordered: Vec<DeviationResult> = Vec::with_capacity(Metric::ALL.len());
        let mut metric_scores = Vec::with_capacity(Metric::ALL.len());
        let mut total = 0.0;
        for metric in Metric::ALL {
            // Presence and known status checked above.
            let Some(deviation) = deviations.iter().find(|d| d.metric == metric) else {
                continue;
            };
            let (Some(status), Some(position)) =
                (deviation.severity(), self.severity_position(deviation))
            else {
                continue;
            };
            let score = self.position_score(position);
            let weight = self.weights.weight(metric);
            total += weight * score;
            metric_scores.push(MetricScore {
                metric,
                status,
                severity_position: position,
                score: round_to(score, 2),
                weight,
                weighted: round_to(weight * score, 2),
            });
            ordered.push(deviation.clone());
        }

        let engine_safety_score = round_to(total.clamp(0.0, 100.0), 2);
        let overall_status = self.overall_status(engine_safety_score);

        tracing::debug!(
            target: event_names::EVALUATE_FINISHED,
            stage = %Stage::Score,
            vehicle_id = %key.vehicle_id,
            gear = key.gear,
            score = engine_safety_score,
            status = %overall_status,
            "assessment scored"
        );

        Ok(ScoredAssessment {
            key: key.clone(),
            deviations: ordered,
            metric_scores,
            engine_safety_score,
            overall_status,
        })
    }
}

/// `(0,0) → (warning,1) → (critical,2)`, extended linearly past Critical.
fn position_axis(warning: f64, critical: f64) -> Option<PiecewiseLinear> {
    if !(warning > 0.0 && critical > warning) {
        return None;
    }
    PiecewiseLinear::new(
        vec![(0.0, 0.0), (warning, 1.0), (critical, 2.0)],
        Extrapolation::Linear,
    )
}
