//! Metric primitives for relationship detection evaluation.

pub mod iou;
pub mod ap;
pub mod precision_recall;

pub use iou::{calculate_iou, union_box};
pub use ap::{calculate_ap, calculate_map};
pub use precision_recall::{
    calculate_precision_recall_curve, calculate_recall_at_k, precision_envelope,
};
