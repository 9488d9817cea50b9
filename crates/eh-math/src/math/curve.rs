//! Piecewise-linear curves through anchor points.

use serde::{Deserialize, Serialize};

/// Behaviour of a curve outside its first/last anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extrapolation {
    /// Hold the endpoint value.
    #[default]
    Clamp,
    /// Continue the slope of the outermost segment.
    Linear,
}

/// A piecewise-linear function defined by `(x, y)` anchors with strictly
/// increasing `x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiecewiseLinear {
    points: Vec<(f64, f64)>,
    extrapolation: Extrapolation,
}

impl PiecewiseLinear {
    /// Build a curve. Returns `None` for fewer than two anchors, non-finite
    /// coordinates, or `x` values that are not strictly increasing.
    pub fn new(points: Vec<(f64, f64)>, extrapolation: Extrapolation) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return None;
        }
        if points.windows(2).any(|w| w[1].0 <= w[0].0) {
            return None;
        }
        Some(Self {
            points,
            extrapolation,
        })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Evaluate the curve at `x`.
    ///
    /// `+inf`/`-inf` follow the extrapolation mode: clamped curves return the
    /// endpoint value, linear ones return the signed infinity of the slope.
    pub fn eval(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        let first = self.points[0];
        if x == first.0 {
            return first.1;
        }
        let last = self.points[self.points.len() - 1];

        if x < first.0 {
            return match self.extrapolation {
                Extrapolation::Clamp => first.1,
                Extrapolation::Linear => extend(self.points[0], self.points[1], x),
            };
        }
        if x > last.0 {
            return match self.extrapolation {
                Extrapolation::Clamp => last.1,
                Extrapolation::Linear => {
                    extend(self.points[self.points.len() - 2], last, x)
                }
            };
        }

        for w in self.points.windows(2) {
            let (x0, y0) = w[0];
            let (x1, y1) = w[1];
            if x == x1 {
                return y1;
            }
            if x < x1 {
                let t = (x - x0) / (x1 - x0);
                return y0 + t * (y1 - y0);
            }
        }
        last.1
    }

    /// True if `y` never increases as `x` increases.
    pub fn is_non_increasing(&self) -> bool {
        self.points.windows(2).all(|w| w[1].1 <= w[0].1)
    }

    /// True if `y` never decreases as `x` increases.
    pub fn is_non_decreasing(&self) -> bool {
        self.points.windows(2).all(|w| w[1].1 >= w[0].1)
    }
}

/// Extend the line through `a` and `b` to `x`.
fn extend(a: (f64, f64), b: (f64, f64), x: f64) -> f64 {
    let slope = (b.1 - a.1) / (b.0 - a.0);
    if x.is_infinite() {
        if slope == 0.0 {
            return b.1;
        }
        return if (slope > 0.0) == (x > 0.0) {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        };
    }
    b.1 + slope * (x - b.0)
}
