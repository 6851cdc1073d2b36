//! Fix refinement — folds a batch of fixes into one best-estimate coordinate.
//!
//! Pure computation over already-collected data; no retries, no I/O.

use super::types::{LocationFix, RefinedLocation};
use chrono::Utc;

/// Fixes at or beyond this accuracy are too vague to average.
const VALID_ACCURACY_CEILING_M: f64 = 100.0;

/// Combine fixes into a single [`RefinedLocation`]. Returns `None` only
/// for an empty slice.
///
/// Valid fixes (accuracy under 100 m) are merged as a weighted centroid
/// with weight `min_accuracy / accuracy`, so a tight fix dominates a vague
/// one instead of being dragged by it. The reported accuracy is the best
/// single input's accuracy — averaging never claims to be better than its
/// best ingredient. When no fix is valid, the least-bad single fix is
/// returned unaveraged.
pub fn refine(fixes: &[LocationFix]) -> Option<RefinedLocation> {
    if fixes.is_empty() {
        return None;
    }

    let valid: Vec<&LocationFix> = fixes
        .iter()
        .filter(|f| f.accuracy_m < VALID_ACCURACY_CEILING_M)
        .collect();

    if valid.is_empty() {
        // Best effort: the single least-vague fix, unaveraged.
        let best = fixes
            .iter()
            .min_by(|a, b| a.accuracy_m.total_cmp(&b.accuracy_m))?;
        return Some(RefinedLocation {
            latitude: best.latitude,
            longitude: best.longitude,
            accuracy_m: best.accuracy_m,
            sample_count: 1,
            is_averaged: false,
            produced_at: Utc::now(),
            error: None,
        });
    }

    let min_accuracy = valid
        .iter()
        .map(|f| f.accuracy_m)
        .fold(f64::INFINITY, f64::min);

    let mut lat_sum = 0.0;
    let mut lon_sum = 0.0;
    let mut weight_sum = 0.0;
    for fix in &valid {
        // A reported accuracy of zero would make the weight blow up.
        let weight = min_accuracy.max(0.1) / fix.accuracy_m.max(0.1);
        lat_sum += weight * fix.latitude;
        lon_sum += weight * fix.longitude;
        weight_sum += weight;
    }

    Some(RefinedLocation {
        latitude: lat_sum / weight_sum,
        longitude: lon_sum / weight_sum,
        accuracy_m: min_accuracy,
        sample_count: valid.len(),
        is_averaged: valid.len() > 1,
        produced_at: Utc::now(),
        error: None,
    })
}
