//! Press dot gain: forward calibration curves and their inverse
//!
//! Coverages are percentages. Curves are piecewise linear over ascending,
//! monotonic calibration points.

use crate::models::PrintingMethod;

/// Printed coverage for a nominal coverage. Inputs outside the curve clamp to
/// its end points.
pub fn apply_gain(method: PrintingMethod, nominal: f64) -> f64 {
    interpolate(method.dot_gain_curve(), nominal, |p| p.0, |p| p.1)
}

/// Nominal (plate) coverage that prints as `desired`.
///
/// Below the curve's lowest output the first input is returned; above its
/// highest output the last input is returned.
pub fn compensate(method: PrintingMethod, desired: f64) -> f64 {
    interpolate(method.dot_gain_curve(), desired, |p| p.1, |p| p.0)
}

fn interpolate(
    curve: &[(f64, f64)],
    value: f64,
    from: impl Fn(&(f64, f64)) -> f64,
    to: impl Fn(&(f64, f64)) -> f64,
) -> f64 {
    let (first, last) = match (curve.first(), curve.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return value,
    };
    if value <= from(first) {
        return to(first);
    }
    if value >= from(last) {
        return to(last);
    }
    for pair in curve.windows(2) {
        let (lo, hi) = (&pair[0], &pair[1]);
        if value <= from(hi) {
            let span = from(hi) - from(lo);
            if span <= f64::EPSILON {
                return to(lo);
            }
            let t = (value - from(lo)) / span;
            return to(lo) + t * (to(hi) - to(lo));
        }
    }
    to(last)
}
