//! Average Precision (AP) and mean Average Precision (mAP) calculation.

use crate::metrics::precision_recall::precision_envelope;

/// Calculate Average Precision (AP) from a precision-recall curve.
///
/// Integrates the monotonic precision envelope over recall: the curve is
/// bracketed by `(recall 0, precision 0)` and `(recall 1, precision 0)`
/// sentinels, precision is replaced by its running maximum from the right, and
/// AP is the sum of `envelope × Δrecall` over every point where recall changes.
///
/// # Arguments
///
/// * `precisions` - Precision values in ranking order
/// * `recalls` - Recall values in ranking order (non-decreasing)
///
/// # Returns
///
/// Returns the Average Precision value (0.0 to 1.0), or 0.0 for an empty curve.
///
/// # Example
///
/// ```
/// use vrd_eval::metrics::ap::calculate_ap;
///
/// // TP, FP, TP against two groundtruth instances
/// let precisions = vec![1.0, 0.5, 2.0 / 3.0];
/// let recalls = vec![0.5, 0.5, 1.0];
/// let ap = calculate_ap(&precisions, &recalls);
/// assert!((ap - (0.5 + 0.5 * 2.0 / 3.0)).abs() < 1e-10);
/// ```
pub fn calculate_ap(precisions: &[f64], recalls: &[f64]) -> f64 {
    if precisions.is_empty() || recalls.is_empty() || precisions.len() != recalls.len() {
        return 0.0;
    }

    let mut recall = Vec::with_capacity(recalls.len() + 2);
    recall.push(0.0);
    recall.extend_from_slice(recalls);
    recall.push(1.0);

    let mut precision = Vec::with_capacity(precisions.len() + 2);
    precision.push(0.0);
    precision.extend_from_slice(precisions);
    precision.push(0.0);

    let envelope = precision_envelope(&precision);

    (1..recall.len())
        .filter(|&i| recall[i] != recall[i - 1])
        .map(|i| (recall[i] - recall[i - 1]) * envelope[i])
        .sum()
}

/// Calculate mean Average Precision (mAP) across multiple classes.
///
/// # Example
///
/// ```
/// use vrd_eval::metrics::ap::calculate_map;
///
/// let class_aps = vec![0.8, 0.9, 0.75, 0.85];
/// let map = calculate_map(&class_aps);
/// assert!((map - 0.825).abs() < 1e-10);
/// ```
pub fn calculate_map(class_aps: &[f64]) -> f64 {
    if class_aps.is_empty() {
        return 0.0;
    }

    class_aps.iter().sum::<f64>() / class_aps.len() as f64
}
