//! Per-image groundtruth storage partitioned by class triplet.

use crate::error::{Result, VrdEvalError};
use crate::types::{ClassKey, RelationshipInstance};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Groundtruth relationships of a single image.
///
/// Instances live in one arena in insertion order; each class key maps to the
/// arena positions of its instances. Matched/unmatched state is not stored
/// here: matchers keep a boolean array parallel to [`GroundTruthIndex::get`].
#[derive(Debug, Clone, Default)]
pub struct GroundTruthIndex {
    image_id: String,
    instances: Vec<RelationshipInstance>,
    by_class: BTreeMap<ClassKey, Vec<usize>>,
    keyed_rows: HashMap<u64, usize>,
    verified_labels: BTreeSet<u64>,
}

impl GroundTruthIndex {
    /// Create an empty index for `image_id`.
    pub fn new(image_id: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            ..Self::default()
        }
    }

    /// Build an index from a list of relationships, in order.
    pub fn from_instances(
        image_id: impl Into<String>,
        instances: impl IntoIterator<Item = RelationshipInstance>,
    ) -> Result<Self> {
        let mut index = Self::new(image_id);
        for instance in instances {
            index.add(instance)?;
        }
        Ok(index)
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    /// Append a groundtruth relationship.
    ///
    /// Repeated relationships (same classes, same boxes) are kept as distinct
    /// instances.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` if the instance belongs to another image.
    pub fn add(&mut self, instance: RelationshipInstance) -> Result<()> {
        if instance.image_id != self.image_id {
            return Err(VrdEvalError::MalformedInput(format!(
                "relationship for image '{}' added to groundtruth of image '{}'",
                instance.image_id, self.image_id
            )));
        }
        let position = self.instances.len();
        self.by_class
            .entry(instance.class_key())
            .or_default()
            .push(position);
        self.instances.push(instance);
        Ok(())
    }

    /// Append a groundtruth relationship identified by a caller-supplied row id.
    ///
    /// Supplying the same row id again with the same classes and boxes is
    /// tolerated and counted as another instance.
    ///
    /// This is for library callers whose annotations carry their own row ids.
    /// The Open Images CSV files have no such column, so [`crate::loader`]
    /// goes through [`GroundTruthIndex::from_instances`] and never raises
    /// `DuplicateKey`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` when `row_id` was already used for a relationship
    /// with different classes or geometry.
    pub fn insert_keyed(&mut self, row_id: u64, instance: RelationshipInstance) -> Result<()> {
        if let Some(&position) = self.keyed_rows.get(&row_id) {
            let existing = &self.instances[position];
            if existing.class_key() != instance.class_key() || !existing.same_geometry(&instance) {
                return Err(VrdEvalError::DuplicateKey(format!(
                    "row {} of image '{}' supplied twice with conflicting values: \
                     subject {} object {} vs subject {} object {}",
                    row_id,
                    self.image_id,
                    existing.subject_box,
                    existing.object_box,
                    instance.subject_box,
                    instance.object_box
                )));
            }
            return self.add(instance);
        }
        let position = self.instances.len();
        self.add(instance)?;
        self.keyed_rows.insert(row_id, position);
        Ok(())
    }

    /// Groundtruth relationships of `class_key`, in insertion order.
    pub fn get(&self, class_key: &ClassKey) -> Vec<&RelationshipInstance> {
        self.by_class
            .get(class_key)
            .map(|positions| positions.iter().map(|&i| &self.instances[i]).collect())
            .unwrap_or_default()
    }

    /// Number of groundtruth relationships with `class_key`.
    pub fn num_instances(&self, class_key: &ClassKey) -> usize {
        self.by_class.get(class_key).map_or(0, Vec::len)
    }

    /// Class keys present in this image, with their instance counts.
    pub fn class_counts(&self) -> impl Iterator<Item = (ClassKey, usize)> + '_ {
        self.by_class.iter().map(|(key, positions)| (*key, positions.len()))
    }

    /// Total number of groundtruth relationships.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Record object classes verified by image-level labels.
    pub fn add_verified_labels(&mut self, labels: impl IntoIterator<Item = u64>) {
        self.verified_labels.extend(labels);
    }

    pub fn verified_labels(&self) -> &BTreeSet<u64> {
        &self.verified_labels
    }

    /// Object classes appearing as subject or object of some relationship.
    pub fn positive_labels(&self) -> BTreeSet<u64> {
        self.instances
            .iter()
            .flat_map(|rel| [rel.subject_class, rel.object_class])
            .collect()
    }

    /// Verified classes that appear in no relationship of this image.
    pub fn negative_labels(&self) -> BTreeSet<u64> {
        let positive = self.positive_labels();
        self.verified_labels
            .difference(&positive)
            .copied()
            .collect()
    }

    /// Verified or positive classes: the classes this image can judge.
    pub fn evaluatable_labels(&self) -> BTreeSet<u64> {
        let mut labels = self.positive_labels();
        labels.extend(self.verified_labels.iter().copied());
        labels
    }
}
