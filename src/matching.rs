//! Greedy matching of scored detections against one image's groundtruth.

use crate::groundtruth::GroundTruthIndex;
use crate::metrics::iou::{calculate_iou, union_box};
use crate::types::{ClassKey, Protocol, RelationshipInstance, ScoredRelationshipInstance};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Geometric test deciding whether a detection may claim a groundtruth instance.
pub type MatchPredicate = fn(&RelationshipInstance, &RelationshipInstance, f64) -> bool;

/// Subject and object boxes must each reach `iou_threshold`.
pub fn relation_match(
    detection: &RelationshipInstance,
    groundtruth: &RelationshipInstance,
    iou_threshold: f64,
) -> bool {
    calculate_iou(&detection.subject_box, &groundtruth.subject_box) >= iou_threshold
        && calculate_iou(&detection.object_box, &groundtruth.object_box) >= iou_threshold
}

/// The subject/object union boxes must reach `iou_threshold`.
pub fn phrase_match(
    detection: &RelationshipInstance,
    groundtruth: &RelationshipInstance,
    iou_threshold: f64,
) -> bool {
    let detected = union_box(&detection.subject_box, &detection.object_box);
    let expected = union_box(&groundtruth.subject_box, &groundtruth.object_box);
    calculate_iou(&detected, &expected) >= iou_threshold
}

impl Protocol {
    /// Match predicate implementing this protocol.
    pub fn predicate(&self) -> MatchPredicate {
        match self {
            Protocol::Relation => relation_match,
            Protocol::Phrase => phrase_match,
        }
    }
}

/// A detection tagged with its global submission order.
///
/// The sequence number breaks score ties deterministically.
#[derive(Debug, Clone)]
pub struct SequencedDetection {
    pub sequence: usize,
    pub detection: ScoredRelationshipInstance,
}

/// Outcome of matching one detection.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDetection {
    pub class_key: ClassKey,
    pub score: f64,
    pub sequence: usize,
    pub is_true_positive: bool,
    /// Position of the claimed instance within the class's groundtruth list.
    pub matched_groundtruth: Option<usize>,
}

/// Matched/unmatched flags parallel to one class's groundtruth list.
#[derive(Debug, Clone)]
pub struct MatchState {
    matched: Vec<bool>,
}

impl MatchState {
    /// All `len` instances start unmatched.
    pub fn new(len: usize) -> Self {
        Self { matched: vec![false; len] }
    }

    pub fn is_matched(&self, position: usize) -> bool {
        self.matched[position]
    }

    pub fn mark_matched(&mut self, position: usize) {
        self.matched[position] = true;
    }

    pub fn num_matched(&self) -> usize {
        self.matched.iter().filter(|&&m| m).count()
    }
}

/// Descending score, then ascending submission order.
pub fn compare_ranked(a_score: f64, a_sequence: usize, b_score: f64, b_sequence: usize) -> Ordering {
    b_score
        .total_cmp(&a_score)
        .then_with(|| a_sequence.cmp(&b_sequence))
}

/// Match detections of a single class key in a single image.
///
/// Detections are consumed by descending score. Each one claims the first
/// still-unmatched groundtruth instance (in insertion order) that satisfies
/// `predicate`; a detection that finds none is a false positive.
///
/// # Arguments
///
/// * `detections` - Detections of one class key in one image
/// * `groundtruths` - Groundtruth of the same class key and image, in insertion order
/// * `predicate` - Geometric match test (see [`Protocol::predicate`])
/// * `iou_threshold` - Minimum IoU passed to `predicate`
///
/// # Returns
///
/// One [`LabeledDetection`] per input, sorted by descending score.
pub fn match_detections(
    detections: &[&SequencedDetection],
    groundtruths: &[&RelationshipInstance],
    predicate: MatchPredicate,
    iou_threshold: f64,
) -> Vec<LabeledDetection> {
    let mut order: Vec<usize> = (0..detections.len()).collect();
    order.sort_by(|&a, &b| {
        compare_ranked(
            detections[a].detection.score,
            detections[a].sequence,
            detections[b].detection.score,
            detections[b].sequence,
        )
    });

    let mut state = MatchState::new(groundtruths.len());

    order
        .into_iter()
        .map(|det_idx| {
            let sequenced = detections[det_idx];
            let detection = &sequenced.detection;

            let matched = (0..groundtruths.len()).find(|&gt_idx| {
                !state.is_matched(gt_idx)
                    && predicate(&detection.relationship, groundtruths[gt_idx], iou_threshold)
            });
            if let Some(gt_idx) = matched {
                state.mark_matched(gt_idx);
            }

            LabeledDetection {
                class_key: detection.class_key(),
                score: detection.score,
                sequence: sequenced.sequence,
                is_true_positive: matched.is_some(),
                matched_groundtruth: matched,
            }
        })
        .collect()
}

/// Match every detection of one image under `protocol`.
///
/// Detections are partitioned by class key; each partition is matched
/// independently against the image's groundtruth of that key. An image with
/// no groundtruth index makes every detection a false positive.
pub fn match_image(
    protocol: Protocol,
    groundtruth: Option<&GroundTruthIndex>,
    detections: &[SequencedDetection],
    iou_threshold: f64,
) -> Vec<LabeledDetection> {
    let mut groups: BTreeMap<ClassKey, Vec<&SequencedDetection>> = BTreeMap::new();
    for detection in detections {
        groups
            .entry(detection.detection.class_key())
            .or_default()
            .push(detection);
    }

    let predicate = protocol.predicate();
    let mut labeled = Vec::with_capacity(detections.len());
    for (class_key, group) in groups {
        let gts = groundtruth.map(|index| index.get(&class_key)).unwrap_or_default();
        labeled.extend(match_detections(&group, &gts, predicate, iou_threshold));
    }
    labeled
}
