//! Floating-point comparison and rounding helpers.

/// Absolute-tolerance equality. NaN never compares equal.
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= tol
}

/// Relative-tolerance equality, falling back to `rel` as an absolute bound
/// near zero.
pub fn relative_eq(a: f64, b: f64, rel: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= rel * scale
}

/// Round half away from zero to `decimals` places. Non-finite input is
/// returned unchanged.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// `|numerator| / |denominator|` with an explicit zero-denominator rule:
/// 0 when the numerator is also 0, otherwise `+inf`.
pub fn abs_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return if numerator == 0.0 { 0.0 } else { f64::INFINITY };
    }
    (numerator / denominator).abs()
}
