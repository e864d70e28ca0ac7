//! Precision/recall curves and recall-at-rank.

use crate::types::PrecisionRecallPoint;

/// Calculate the precision-recall curve from score-ordered detections.
///
/// # Arguments
///
/// * `ranked` - `(score, is_true_positive)` pairs, already sorted by descending score
/// * `num_ground_truth` - Total number of groundtruth instances for the class
///
/// # Returns
///
/// One point per consumed detection. Recall is 0.0 throughout when there is no
/// groundtruth.
///
/// # Example
///
/// ```
/// use vrd_eval::metrics::precision_recall::calculate_precision_recall_curve;
///
/// let curve = calculate_precision_recall_curve(&[(0.9, true), (0.8, false)], 2);
/// assert_eq!(curve[1].precision, 0.5);
/// assert_eq!(curve[1].recall, 0.5);
/// ```
pub fn calculate_precision_recall_curve(
    ranked: &[(f64, bool)],
    num_ground_truth: usize,
) -> Vec<PrecisionRecallPoint> {
    let mut curve = Vec::with_capacity(ranked.len());
    let mut tp = 0usize;
    let mut fp = 0usize;

    for &(score, is_tp) in ranked {
        if is_tp {
            tp += 1;
        } else {
            fp += 1;
        }

        let precision = tp as f64 / (tp + fp) as f64;
        let recall = if num_ground_truth > 0 {
            tp as f64 / num_ground_truth as f64
        } else {
            0.0
        };

        curve.push(PrecisionRecallPoint {
            precision,
            recall,
            threshold: score,
        });
    }

    curve
}

/// Monotonic non-increasing precision envelope.
///
/// Each output value is the maximum precision observed at that position or any
/// later (higher-recall) position.
pub fn precision_envelope(precision: &[f64]) -> Vec<f64> {
    let mut envelope = precision.to_vec();
    for i in (0..envelope.len().saturating_sub(1)).rev() {
        envelope[i] = envelope[i].max(envelope[i + 1]);
    }
    envelope
}

/// Recall achieved by the top `k` ranked detections.
///
/// Uses all detections when fewer than `k` exist. Returns 0.0 when there is no
/// groundtruth.
///
/// # Example
///
/// ```
/// use vrd_eval::metrics::precision_recall::calculate_recall_at_k;
///
/// let ranked = [true, false, true];
/// assert_eq!(calculate_recall_at_k(&ranked, 4, 2), 0.25);
/// assert_eq!(calculate_recall_at_k(&ranked, 4, 50), 0.5);
/// ```
pub fn calculate_recall_at_k(is_true_positive: &[bool], num_ground_truth: usize, k: usize) -> f64 {
    if num_ground_truth == 0 {
        return 0.0;
    }
    let tp = is_true_positive.iter().take(k).filter(|&&is_tp| is_tp).count();
    tp as f64 / num_ground_truth as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_recall_curve() {
        let ranked = vec![
            (0.9, true),
            (0.8, true),
            (0.7, false),
            (0.6, true),
            (0.5, false),
        ];
        let curve = calculate_precision_recall_curve(&ranked, 4);
        assert_eq!(curve.len(), 5);

        assert!((curve[0].precision - 1.0).abs() < 1e-10);
        assert!((curve[0].recall - 0.25).abs() < 1e-10);
        assert!((curve[2].precision - 2.0 / 3.0).abs() < 1e-10);
        assert!((curve[4].recall - 0.75).abs() < 1e-10);
        assert_eq!(curve[3].threshold, 0.6);
    }

    #[test]
    fn test_curve_without_groundtruth() {
        let curve = calculate_precision_recall_curve(&[(0.9, false)], 0);
        assert_eq!(curve[0].recall, 0.0);
        assert_eq!(curve[0].precision, 0.0);
    }

    #[test]
    fn test_precision_envelope() {
        let envelope = precision_envelope(&[1.0, 0.5, 0.67, 0.5, 0.6]);
        assert_eq!(envelope, vec![1.0, 0.67, 0.67, 0.6, 0.6]);
        assert!(precision_envelope(&[]).is_empty());
    }

    #[test]
    fn test_recall_at_k() {
        let ranked = vec![false, true, true];
        assert_eq!(calculate_recall_at_k(&ranked, 2, 1), 0.0);
        assert_eq!(calculate_recall_at_k(&ranked, 2, 2), 0.5);
        assert_eq!(calculate_recall_at_k(&ranked, 2, 3), 1.0);
        assert_eq!(calculate_recall_at_k(&ranked, 0, 3), 0.0);
        assert_eq!(calculate_recall_at_k(&[], 3, 50), 0.0);
    }
}
