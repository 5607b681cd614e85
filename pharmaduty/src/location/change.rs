//! Significant-change detection for location updates.
//!
//! Continuous tracking produces a noisy sample stream; most samples differ
//! from the previous accepted position by GPS jitter only. This detector
//! gates whether a new sample is worth re-running downstream work for.
//!
//! The test is an axis-aligned degree-box comparison, not a true distance
//! test. Degrees of longitude compress toward the poles, so the metric
//! size of the box varies with latitude; that imprecision is accepted
//! because the detector only decides "recompute or skip".

use crate::coord::Coordinate;

/// Default change threshold in degrees (~tens of meters at mid-latitudes).
pub const DEFAULT_CHANGE_THRESHOLD_DEG: f64 = 0.00025;

/// Decide whether a candidate position differs significantly from the
/// previously accepted one.
///
/// Returns `true` unconditionally when there is no previous position
/// (the first fix is always significant). Otherwise returns `true` iff
/// the latitude or longitude delta exceeds `threshold_deg`.
pub fn is_significant_change(
    previous: Option<Coordinate>,
    candidate: Coordinate,
    threshold_deg: f64,
) -> bool {
    let Some(previous) = previous else {
        return true;
    };

    let lat_delta = (candidate.latitude() - previous.latitude()).abs();
    let lon_delta = (candidate.longitude() - previous.longitude()).abs();

    lat_delta > threshold_deg || lon_delta > threshold_deg
}
