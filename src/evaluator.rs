//! Relation and phrase detection evaluation over a whole dataset.

use crate::accumulator::{PrAccumulator, ProtocolMetrics};
use crate::config::{EvaluatorConfig, UnknownImagePolicy};
use crate::error::{Result, VrdEvalError};
use crate::groundtruth::GroundTruthIndex;
use crate::label_map::LabelMap;
use crate::matching::{match_image, LabeledDetection, SequencedDetection};
use crate::report::MetricReport;
use crate::types::{ClassKey, Protocol, RelationshipInstance, ScoredRelationshipInstance};
use rayon::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Weight of relation mAP in the composite score.
pub const RELATION_MAP_WEIGHT: f64 = 0.4;
/// Weight of relation Recall@50 in the composite score.
pub const RELATION_RECALL_WEIGHT: f64 = 0.2;
/// Weight of phrase mAP in the composite score.
pub const PHRASE_MAP_WEIGHT: f64 = 0.4;
/// Rank whose recall enters the composite score.
pub const COMPOSITE_RECALL_RANK: usize = 50;
/// Report key of the composite score.
pub const SCORE_METRIC: &str = "score";

/// Structured result of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSummary {
    pub relation: ProtocolMetrics,
    pub phrase: ProtocolMetrics,
    /// `0.4 × relation mAP + 0.2 × relation Recall@50 + 0.4 × phrase mAP`
    pub score: f64,
}

/// Composite score of a relation/phrase metric pair.
pub fn composite_score(relation: &ProtocolMetrics, phrase: &ProtocolMetrics) -> f64 {
    let relation_recall = relation.recall(COMPOSITE_RECALL_RANK).unwrap_or(0.0);
    RELATION_MAP_WEIGHT * relation.mean_ap
        + RELATION_RECALL_WEIGHT * relation_recall
        + PHRASE_MAP_WEIGHT * phrase.mean_ap
}

#[derive(Debug, Clone)]
struct ImageEntry {
    /// `None` for images first seen through predictions.
    groundtruth: Option<GroundTruthIndex>,
    detections: Vec<SequencedDetection>,
}

/// Accumulates groundtruth and predictions image by image and evaluates both
/// the relation and the phrase protocol.
///
/// Matching runs inside [`VrdEvaluator::evaluate`] with fresh match state, so
/// evaluating twice yields identical results.
///
/// # Example
///
/// ```
/// use vrd_eval::evaluator::VrdEvaluator;
/// use vrd_eval::types::{BoundingBox, ClassKey, RelationshipInstance, ScoredRelationshipInstance};
///
/// let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
/// let gt = RelationshipInstance::new("img", ClassKey::new(1, 2, 3), bbox, bbox);
///
/// let mut evaluator = VrdEvaluator::new();
/// evaluator.add_groundtruth("img", vec![gt.clone()]).unwrap();
/// evaluator
///     .add_predictions("img", vec![ScoredRelationshipInstance::new(gt, 0.9)])
///     .unwrap();
///
/// let report = evaluator.evaluate();
/// assert_eq!(report.get("VRDMetric_Relationships_mAP@0.5IOU"), Some(1.0));
/// assert!((report.get("score").unwrap() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct VrdEvaluator {
    config: EvaluatorConfig,
    label_maps: Option<(LabelMap, LabelMap)>,
    images: Vec<ImageEntry>,
    positions: HashMap<String, usize>,
    next_sequence: usize,
}

impl VrdEvaluator {
    /// Evaluator with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluator with a validated configuration.
    pub fn with_config(config: EvaluatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Name per-class metrics through the object class and predicate label maps.
    pub fn with_label_maps(mut self, classes: LabelMap, predicates: LabelMap) -> Self {
        self.label_maps = Some((classes, predicates));
        self
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Number of images seen through groundtruth or predictions.
    pub fn num_images(&self) -> usize {
        self.images.len()
    }

    /// Number of detections added so far.
    pub fn num_detections(&self) -> usize {
        self.next_sequence
    }

    /// Add the groundtruth of one image.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateImage` if the image already has groundtruth or
    /// already received predictions without groundtruth, and
    /// `MalformedInput` if a relationship names another image.
    pub fn add_groundtruth(
        &mut self,
        image_id: &str,
        relationships: Vec<RelationshipInstance>,
    ) -> Result<()> {
        let index = GroundTruthIndex::from_instances(image_id, relationships)?;
        self.add_groundtruth_index(index)
    }

    /// Add a prebuilt groundtruth index, e.g. one carrying verified labels.
    pub fn add_groundtruth_index(&mut self, index: GroundTruthIndex) -> Result<()> {
        let image_id = index.image_id().to_string();
        if let Some(&position) = self.positions.get(&image_id) {
            let reason = if self.images[position].groundtruth.is_some() {
                "groundtruth already added"
            } else {
                "predictions were added before any groundtruth"
            };
            return Err(VrdEvalError::DuplicateImage(format!(
                "image '{}': {}",
                image_id, reason
            )));
        }

        debug!(image_id = %image_id, relationships = index.len(), "added groundtruth");
        self.positions.insert(image_id, self.images.len());
        self.images.push(ImageEntry {
            groundtruth: Some(index),
            detections: Vec::new(),
        });
        Ok(())
    }

    /// Add the predictions of one image.
    ///
    /// Predictions for an image without groundtruth are evaluated against an
    /// empty groundtruth set unless the configured policy rejects them.
    ///
    /// # Errors
    ///
    /// Returns `UnknownImage` under [`UnknownImagePolicy::Reject`], and
    /// `MalformedInput` if a detection names another image.
    pub fn add_predictions(
        &mut self,
        image_id: &str,
        detections: Vec<ScoredRelationshipInstance>,
    ) -> Result<()> {
        if let Some(foreign) = detections
            .iter()
            .find(|det| det.relationship.image_id != image_id)
        {
            return Err(VrdEvalError::MalformedInput(format!(
                "prediction for image '{}' added to image '{}'",
                foreign.relationship.image_id, image_id
            )));
        }

        let position = match self.positions.get(image_id) {
            Some(&position) => position,
            None => {
                if self.config.unknown_image_policy == UnknownImagePolicy::Reject {
                    return Err(VrdEvalError::UnknownImage(format!(
                        "no groundtruth for image '{}'",
                        image_id
                    )));
                }
                warn!(image_id = %image_id, "no groundtruth for image, predictions count as false positives");
                self.positions.insert(image_id.to_string(), self.images.len());
                self.images.push(ImageEntry {
                    groundtruth: None,
                    detections: Vec::new(),
                });
                self.images.len() - 1
            }
        };

        debug!(image_id = %image_id, detections = detections.len(), "added predictions");
        let entry = &mut self.images[position];
        for detection in detections {
            entry.detections.push(SequencedDetection {
                sequence: self.next_sequence,
                detection,
            });
            self.next_sequence += 1;
        }
        Ok(())
    }

    /// Recall ranks to report: the configured ones plus the composite rank.
    fn recall_ranks(&self) -> Vec<usize> {
        let mut ranks = self.config.recall_ranks.clone();
        ranks.push(COMPOSITE_RECALL_RANK);
        ranks.sort_unstable();
        ranks.dedup();
        ranks
    }

    /// Detections of `entry` that take part in evaluation.
    fn evaluatable_detections<'a>(&self, entry: &'a ImageEntry) -> Cow<'a, [SequencedDetection]> {
        let index = match (&entry.groundtruth, self.config.restrict_to_verified_labels) {
            (Some(index), true) => index,
            _ => return Cow::Borrowed(&entry.detections),
        };

        let evaluatable = index.evaluatable_labels();
        let negative = index.negative_labels();
        Cow::Owned(
            entry
                .detections
                .iter()
                .filter(|det| {
                    let rel = &det.detection.relationship;
                    (evaluatable.contains(&rel.subject_class)
                        && evaluatable.contains(&rel.object_class))
                        || negative.contains(&rel.subject_class)
                        || negative.contains(&rel.object_class)
                })
                .cloned()
                .collect(),
        )
    }

    /// Match every image under `protocol` and compute its metrics.
    pub fn evaluate_protocol(&self, protocol: Protocol) -> ProtocolMetrics {
        let threshold = self.config.matching_iou_threshold;

        let labeled: Vec<Vec<LabeledDetection>> = self
            .images
            .par_iter()
            .map(|entry| {
                let detections = self.evaluatable_detections(entry);
                match_image(protocol, entry.groundtruth.as_ref(), &detections, threshold)
            })
            .collect();

        let mut accumulator = PrAccumulator::new();
        for index in self.images.iter().filter_map(|entry| entry.groundtruth.as_ref()) {
            for (class_key, count) in index.class_counts() {
                accumulator.add_groundtruth(class_key, count);
            }
        }
        for batch in labeled {
            accumulator.add_detections(batch);
        }

        accumulator.evaluate(&self.recall_ranks())
    }

    /// Evaluate both protocols and the composite score.
    pub fn evaluate_protocols(&self) -> EvaluationSummary {
        let relation = self.evaluate_protocol(Protocol::Relation);
        let phrase = self.evaluate_protocol(Protocol::Phrase);
        let score = composite_score(&relation, &phrase);

        info!(
            images = self.images.len(),
            detections = self.next_sequence,
            relation_map = relation.mean_ap,
            phrase_map = phrase.mean_ap,
            score,
            "evaluation finished"
        );

        EvaluationSummary {
            relation,
            phrase,
            score,
        }
    }

    /// Evaluate and flatten all metrics into a named report.
    ///
    /// Keys per protocol prefix (`VRDMetric_Relationships_`,
    /// `VRDMetric_Phrases_`) with threshold `T`: `mAP@TIOU`,
    /// `weightedAP@TIOU`, `Recall@k@TIOU` and `AP@TIOU/<subject> <predicate>
    /// <object>`. The composite is stored under `score`.
    pub fn evaluate(&self) -> MetricReport {
        let summary = self.evaluate_protocols();
        let mut report = self.protocol_report(Protocol::Relation, &summary.relation);
        report.merge(self.protocol_report(Protocol::Phrase, &summary.phrase));
        report.insert(SCORE_METRIC, summary.score);
        report
    }

    fn protocol_report(&self, protocol: Protocol, metrics: &ProtocolMetrics) -> MetricReport {
        let prefix = protocol.metric_prefix();
        let threshold = self.config.matching_iou_threshold;

        let mut report = MetricReport::new();
        report.insert(format!("{prefix}mAP@{threshold}IOU"), metrics.mean_ap);
        report.insert(format!("{prefix}weightedAP@{threshold}IOU"), metrics.weighted_ap);
        for (k, recall) in &metrics.recall_at {
            report.insert(format!("{prefix}Recall@{k}@{threshold}IOU"), *recall);
        }
        for (class_key, class) in &metrics.per_class {
            report.insert(
                format!("{prefix}AP@{threshold}IOU/{}", self.class_key_name(class_key)),
                class.average_precision,
            );
        }
        report
    }

    /// `"<subject> <predicate> <object>"` using label-map names where known.
    fn class_key_name(&self, class_key: &ClassKey) -> String {
        let Some((classes, predicates)) = &self.label_maps else {
            return class_key.to_string();
        };
        let class_name = |id: u64| classes.name(id).map_or_else(|| id.to_string(), str::to_string);
        let predicate = predicates
            .name(class_key.predicate)
            .map_or_else(|| class_key.predicate.to_string(), str::to_string);
        format!(
            "{} {} {}",
            class_name(class_key.subject),
            predicate,
            class_name(class_key.object)
        )
    }
}
