//! Segment geometry matching and quality ranking.

use std::cmp::Ordering;

use crate::config::Tolerances;
use crate::types::Segment;

/// True when both segments sit in the same station and inside the tolerance box.
///
/// The box is axis-aligned with strict bounds: |Δx| < x and |Δy| < y.
/// Segments of different stations are never compatible.
pub fn positions_compatible(a: &Segment, b: &Segment, tolerances: &Tolerances) -> bool {
    if a.station != b.station {
        return false;
    }
    let dx = (a.position.x - b.position.x).abs();
    let dy = (a.position.y - b.position.y).abs();
    dx < tolerances.x && dy < tolerances.y
}

/// Total order on segment quality. `Greater` means `a` is the better segment.
///
/// More hits wins; equal hit counts fall back to the smaller χ².
/// A NaN χ² of either sign ranks below any number.
pub fn compare_quality(a: &Segment, b: &Segment) -> Ordering {
    a.hit_count
        .cmp(&b.hit_count)
        .then_with(|| chi2_ascending(b.chi2, a.chi2))
}

/// Ascending χ² order with every NaN sorted last.
pub(crate) fn chi2_ascending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(&b),
    }
}

/// Returns the better of two segments. On equal quality `a` is returned.
pub fn quality_rank<'s>(a: &'s Segment, b: &'s Segment) -> &'s Segment {
    match compare_quality(a, b) {
        Ordering::Less => b,
        _ => a,
    }
}
