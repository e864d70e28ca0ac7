//! # vrd-eval
//!
//! Evaluation of visual relationship detection (VRD) in the Open Images
//! challenge style.
//!
//! A relationship is a `(subject, predicate, object)` triplet with a box for
//! the subject and a box for the object. Detections are matched greedily,
//! highest score first, against groundtruth of the same triplet in the same
//! image under two protocols:
//!
//! - **Relation**: subject and object boxes each reach the IoU threshold.
//! - **Phrase**: the union box of subject and object reaches the threshold.
//!
//! Each protocol reports per-class **AP**, **mAP** over classes with
//! groundtruth, instance-weighted AP and mean **Recall@K**. The composite
//! challenge score is
//! `0.4 × relation mAP + 0.2 × relation Recall@50 + 0.4 × phrase mAP`.
//!
//! ## Quick Start
//!
//! ```rust
//! use vrd_eval::{BoundingBox, ClassKey, RelationshipInstance, ScoredRelationshipInstance, VrdEvaluator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let key = ClassKey::new(1, 2, 3);
//! let subject = BoundingBox::new(0.0, 0.0, 0.5, 0.5);
//! let object = BoundingBox::new(0.4, 0.4, 1.0, 1.0);
//!
//! let mut evaluator = VrdEvaluator::new();
//! evaluator.add_groundtruth("img", vec![RelationshipInstance::new("img", key, subject, object)])?;
//! evaluator.add_predictions(
//!     "img",
//!     vec![ScoredRelationshipInstance::new(
//!         RelationshipInstance::new("img", key, subject, object),
//!         0.9,
//!     )],
//! )?;
//!
//! let metrics = evaluator.evaluate();
//! println!("score: {:.4}", metrics.get("score").unwrap_or(0.0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Input files
//!
//! The [`loader`] module reads the Open Images VRD CSV layout (`ImageID`,
//! `LabelName1`, `LabelName2`, `XMin1` ... `YMax2`, `RelationshipLabel` and
//! `Score` for predictions). Class and predicate names are resolved through
//! [`label_map::LabelMap`]s in the protobuf text format.

pub mod error;
pub mod types;
pub mod metrics;
pub mod groundtruth;
pub mod matching;
pub mod accumulator;
pub mod config;
pub mod label_map;
pub mod loader;
pub mod report;
pub mod evaluator;

// Re-export commonly used types and functions
pub use accumulator::{ClassMetrics, PrAccumulator, ProtocolMetrics};
pub use config::{load_config_from_file, load_config_from_str, EvaluatorConfig, UnknownImagePolicy};
pub use error::{Result, VrdEvalError};
pub use evaluator::{composite_score, EvaluationSummary, VrdEvaluator};
pub use groundtruth::GroundTruthIndex;
pub use label_map::LabelMap;
pub use loader::{load_groundtruth, load_predictions};
pub use report::{write_metrics, MetricReport};
pub use types::{
    BoundingBox, ClassKey, PrecisionRecallPoint, Protocol, RelationshipInstance,
    ScoredRelationshipInstance,
};
