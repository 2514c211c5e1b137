//! Knee detection on the WCSS curve

use log::debug;

use crate::elbow::ClusterRange;
use crate::error::SegmentError;

/// Pick the cluster count at the knee of a WCSS curve
///
/// The curve is read as points `(k_min, wcss[0]) .. (k_max, wcss[last])`.
/// The chosen k is the point farthest from the chord joining the first and
/// last points; on ties the lowest k wins. A single-point range returns
/// `k_min`.
///
/// # Errors
/// `InvalidRange` when `k_min > k_max`, `WcssLengthMismatch` when `wcss`
/// does not hold exactly one value per k.
pub fn optimal_cluster_count(wcss: &[f64], range: ClusterRange) -> crate::Result<usize> {
    let ClusterRange { k_min, k_max } = range;
    if range.is_empty() {
        return Err(SegmentError::InvalidRange { k_min, k_max });
    }
    if wcss.len() != range.len() {
        return Err(SegmentError::WcssLengthMismatch {
            k_min,
            k_max,
            expected: range.len(),
            actual: wcss.len(),
        });
    }
    if k_min == k_max {
        return Ok(k_min);
    }

    let (x1, y1) = (k_min as f64, wcss[0]);
    let (x2, y2) = (k_max as f64, wcss[wcss.len() - 1]);
    let denominator = ((y2 - y1).powi(2) + (x2 - x1).powi(2)).sqrt();

    let mut best_k = k_min;
    let mut best_distance = f64::NEG_INFINITY;
    for (k, &y0) in range.iter().zip(wcss) {
        let x0 = k as f64;
        let distance = ((y2 - y1) * x0 - (x2 - x1) * y0 + x2 * y1 - y2 * x1).abs() / denominator;
        if distance > best_distance {
            best_distance = distance;
            best_k = k;
        }
    }

    debug!("Knee at k={best_k} (distance to chord {best_distance:.4})");
    Ok(best_k)
}
