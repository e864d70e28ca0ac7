//! Intersection over Union (IoU) and union-box geometry.

use crate::types::BoundingBox;

/// Calculate the Intersection over Union (IoU) between two bounding boxes.
///
/// IoU is defined as the area of intersection divided by the area of union.
/// A zero-area box has IoU 0.0 with every box, itself included.
///
/// # Arguments
///
/// * `bbox1` - First bounding box
/// * `bbox2` - Second bounding box
///
/// # Returns
///
/// Returns a value between 0.0 (no overlap) and 1.0 (perfect overlap).
///
/// # Example
///
/// ```
/// use vrd_eval::metrics::iou::calculate_iou;
/// use vrd_eval::types::BoundingBox;
///
/// let bbox1 = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
/// let bbox2 = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
/// let iou = calculate_iou(&bbox1, &bbox2);
/// assert!(iou > 0.0 && iou < 1.0);
/// ```
pub fn calculate_iou(bbox1: &BoundingBox, bbox2: &BoundingBox) -> f64 {
    if !bbox1.is_valid() || !bbox2.is_valid() {
        return 0.0;
    }

    let y_top = bbox1.y_min.max(bbox2.y_min);
    let x_left = bbox1.x_min.max(bbox2.x_min);
    let y_bottom = bbox1.y_max.min(bbox2.y_max);
    let x_right = bbox1.x_max.min(bbox2.x_max);

    if x_right <= x_left || y_bottom <= y_top {
        return 0.0;
    }

    let intersection_area = (x_right - x_left) * (y_bottom - y_top);
    let union_area = bbox1.area() + bbox2.area() - intersection_area;

    if union_area <= 0.0 {
        return 0.0;
    }

    (intersection_area / union_area).clamp(0.0, 1.0)
}

/// Smallest axis-aligned box covering both inputs.
///
/// # Example
///
/// ```
/// use vrd_eval::metrics::iou::union_box;
/// use vrd_eval::types::BoundingBox;
///
/// let subject = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
/// let object = BoundingBox::new(5.0, 20.0, 30.0, 25.0);
/// assert_eq!(union_box(&subject, &object), BoundingBox::new(0.0, 0.0, 30.0, 25.0));
/// ```
pub fn union_box(bbox1: &BoundingBox, bbox2: &BoundingBox) -> BoundingBox {
    BoundingBox::new(
        bbox1.y_min.min(bbox2.y_min),
        bbox1.x_min.min(bbox2.x_min),
        bbox1.y_max.max(bbox2.y_max),
        bbox1.x_max.max(bbox2.x_max),
    )
}
