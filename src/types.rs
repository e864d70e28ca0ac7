//! Core data types for relationship annotations and evaluations.

use crate::error::{Result, VrdEvalError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents an axis-aligned bounding box as (y_min, x_min, y_max, x_max).
///
/// Coordinates may be normalized or in pixels; only the ordering
/// `y_min <= y_max` and `x_min <= x_max` is required.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub y_min: f64,
    pub x_min: f64,
    pub y_max: f64,
    pub x_max: f64,
}

impl BoundingBox {
    /// Create a new bounding box without validation.
    pub fn new(y_min: f64, x_min: f64, y_max: f64, x_max: f64) -> Self {
        Self { y_min, x_min, y_max, x_max }
    }

    /// Create a new bounding box, rejecting inverted or non-finite coordinates.
    pub fn try_new(y_min: f64, x_min: f64, y_max: f64, x_max: f64) -> Result<Self> {
        let bbox = Self::new(y_min, x_min, y_max, x_max);
        if ![y_min, x_min, y_max, x_max].iter().all(|v| v.is_finite()) {
            return Err(VrdEvalError::InvalidBoundingBox(format!(
                "non-finite coordinate in {bbox}"
            )));
        }
        if y_min > y_max || x_min > x_max {
            return Err(VrdEvalError::InvalidBoundingBox(format!(
                "expected y_min <= y_max and x_min <= x_max, got {bbox}"
            )));
        }
        Ok(bbox)
    }

    /// Box height (`y_max - y_min`).
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Box width (`x_max - x_min`).
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Get the area of the bounding box.
    pub fn area(&self) -> f64 {
        self.height() * self.width()
    }

    /// Check if the bounding box has positive area.
    pub fn is_valid(&self) -> bool {
        self.height() > 0.0 && self.width() > 0.0
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.y_min, self.x_min, self.y_max, self.x_max
        )
    }
}

/// The (subject, predicate, object) class triplet that partitions evaluation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ClassKey {
    pub subject: u64,
    pub predicate: u64,
    pub object: u64,
}

impl ClassKey {
    pub fn new(subject: u64, predicate: u64, object: u64) -> Self {
        Self { subject, predicate, object }
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

/// A single subject-predicate-object relationship in one image.
///
/// Used for both groundtruth and (wrapped in [`ScoredRelationshipInstance`])
/// detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipInstance {
    pub image_id: String,
    pub subject_class: u64,
    pub object_class: u64,
    pub predicate_class: u64,
    pub subject_box: BoundingBox,
    pub object_box: BoundingBox,
}

impl RelationshipInstance {
    pub fn new(
        image_id: impl Into<String>,
        class_key: ClassKey,
        subject_box: BoundingBox,
        object_box: BoundingBox,
    ) -> Self {
        Self {
            image_id: image_id.into(),
            subject_class: class_key.subject,
            object_class: class_key.object,
            predicate_class: class_key.predicate,
            subject_box,
            object_box,
        }
    }

    /// The class triplet this relationship is evaluated under.
    pub fn class_key(&self) -> ClassKey {
        ClassKey::new(self.subject_class, self.predicate_class, self.object_class)
    }

    /// True when both boxes are geometrically identical to `other`'s.
    pub fn same_geometry(&self, other: &RelationshipInstance) -> bool {
        self.subject_box == other.subject_box && self.object_box == other.object_box
    }
}

/// A detected relationship with its confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRelationshipInstance {
    pub relationship: RelationshipInstance,
    pub score: f64,
}

impl ScoredRelationshipInstance {
    pub fn new(relationship: RelationshipInstance, score: f64) -> Self {
        Self { relationship, score }
    }

    pub fn class_key(&self) -> ClassKey {
        self.relationship.class_key()
    }
}

/// Geometric interpretation used to match a detection against groundtruth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Subject and object boxes must each overlap their groundtruth counterpart.
    Relation,
    /// The union of subject and object boxes must overlap the groundtruth union.
    Phrase,
}

impl Protocol {
    /// Prefix prepended to every metric name produced for this protocol.
    pub fn metric_prefix(&self) -> &'static str {
        match self {
            Protocol::Relation => "VRDMetric_Relationships_",
            Protocol::Phrase => "VRDMetric_Phrases_",
        }
    }
}

/// Precision-Recall curve point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionRecallPoint {
    pub precision: f64,
    pub recall: f64,
    /// Score of the detection consumed at this point.
    pub threshold: f64,
}
