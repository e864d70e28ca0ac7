//! Edge case tests for matching and metric computation.

use vrd_eval::accumulator::PrAccumulator;
use vrd_eval::config::EvaluatorConfig;
use vrd_eval::evaluator::VrdEvaluator;
use vrd_eval::groundtruth::GroundTruthIndex;
use vrd_eval::matching::{match_image, SequencedDetection};
use vrd_eval::metrics::{calculate_ap, calculate_iou, union_box};
use vrd_eval::types::{BoundingBox, ClassKey, Protocol, RelationshipInstance, ScoredRelationshipInstance};

const KEY: ClassKey = ClassKey {
    subject: 1,
    predicate: 2,
    object: 3,
};

fn square() -> BoundingBox {
    BoundingBox::new(0.0, 0.0, 10.0, 10.0)
}

fn relationship(subject: BoundingBox, object: BoundingBox) -> RelationshipInstance {
    RelationshipInstance::new("img", KEY, subject, object)
}

fn detection(subject: BoundingBox, object: BoundingBox, score: f64) -> ScoredRelationshipInstance {
    ScoredRelationshipInstance::new(relationship(subject, object), score)
}

fn sequenced(detections: Vec<ScoredRelationshipInstance>) -> Vec<SequencedDetection> {
    detections
        .into_iter()
        .enumerate()
        .map(|(sequence, detection)| SequencedDetection { sequence, detection })
        .collect()
}

#[test]
fn test_empty_evaluator() {
    let evaluator = VrdEvaluator::new();
    let summary = evaluator.evaluate_protocols();
    assert_eq!(summary.relation.mean_ap, 0.0);
    assert_eq!(summary.relation.weighted_ap, 0.0);
    assert_eq!(summary.phrase.mean_ap, 0.0);
    assert_eq!(summary.score, 0.0);
    assert!(summary.relation.per_class.is_empty());
}

#[test]
fn test_predictions_without_any_groundtruth() {
    let mut evaluator = VrdEvaluator::new();
    evaluator
        .add_predictions("img", vec![detection(square(), square(), 0.9)])
        .unwrap();

    let summary = evaluator.evaluate_protocols();
    assert_eq!(summary.relation.num_detections, 1);
    assert_eq!(summary.relation.num_groundtruth, 0);
    assert_eq!(summary.relation.mean_ap, 0.0);
    assert_eq!(summary.score, 0.0);
}

#[test]
fn test_empty_prediction_batch_for_unknown_image() {
    let mut evaluator = VrdEvaluator::new();
    evaluator.add_predictions("img", vec![]).unwrap();
    assert_eq!(evaluator.num_images(), 1);
    assert_eq!(evaluator.num_detections(), 0);
}

#[test]
fn test_degenerate_boxes_never_match() {
    let point = BoundingBox::new(5.0, 5.0, 5.0, 5.0);
    let line = BoundingBox::new(0.0, 0.0, 10.0, 0.0);

    assert_eq!(calculate_iou(&point, &point), 0.0);
    assert_eq!(calculate_iou(&line, &square()), 0.0);

    let index = GroundTruthIndex::from_instances("img", vec![relationship(point, line)]).unwrap();
    let labeled = match_image(
        Protocol::Relation,
        Some(&index),
        &sequenced(vec![detection(point, line, 0.9)]),
        0.5,
    );
    assert_eq!(labeled.len(), 1);
    assert!(!labeled[0].is_true_positive);
}

#[test]
fn test_degenerate_parts_can_form_valid_phrase() {
    // Zero-area subject and object still span a non-degenerate union box
    let subject = BoundingBox::new(0.0, 0.0, 0.0, 10.0);
    let object = BoundingBox::new(10.0, 0.0, 10.0, 10.0);
    assert_eq!(union_box(&subject, &object), square());

    let index = GroundTruthIndex::from_instances("img", vec![relationship(subject, object)]).unwrap();
    let detections = sequenced(vec![detection(subject, object, 0.9)]);

    let relation = match_image(Protocol::Relation, Some(&index), &detections, 0.5);
    let phrase = match_image(Protocol::Phrase, Some(&index), &detections, 0.5);
    assert!(!relation[0].is_true_positive);
    assert!(phrase[0].is_true_positive);
}

#[test]
fn test_iou_exactly_at_threshold_matches() {
    // Half of the groundtruth subject: IoU is exactly 0.5
    let half = BoundingBox::new(0.0, 0.0, 10.0, 5.0);
    assert_eq!(calculate_iou(&half, &square()), 0.5);

    let index = GroundTruthIndex::from_instances("img", vec![relationship(square(), square())]).unwrap();
    let labeled = match_image(
        Protocol::Relation,
        Some(&index),
        &sequenced(vec![detection(half, square(), 0.9)]),
        0.5,
    );
    assert!(labeled[0].is_true_positive);
}

#[test]
fn test_threshold_of_one_requires_exact_boxes() {
    let nudged = BoundingBox::new(0.0, 0.0, 10.0, 9.99);
    let config = EvaluatorConfig {
        matching_iou_threshold: 1.0,
        ..EvaluatorConfig::default()
    };

    let mut evaluator = VrdEvaluator::with_config(config).unwrap();
    evaluator
        .add_groundtruth(
            "img",
            vec![relationship(square(), square()), relationship(square(), square())],
        )
        .unwrap();
    evaluator
        .add_predictions(
            "img",
            vec![detection(square(), square(), 0.9), detection(nudged, square(), 0.8)],
        )
        .unwrap();

    let summary = evaluator.evaluate_protocols();
    assert_eq!(summary.relation.per_class[&KEY].true_positives, 1);

    let report = evaluator.evaluate();
    assert!(report.get("VRDMetric_Relationships_mAP@1IOU").is_some());
}

#[test]
fn test_repeated_groundtruth_counts_twice() {
    let mut evaluator = VrdEvaluator::new();
    evaluator
        .add_groundtruth(
            "img",
            vec![relationship(square(), square()), relationship(square(), square())],
        )
        .unwrap();
    evaluator
        .add_predictions("img", vec![detection(square(), square(), 0.9)])
        .unwrap();

    let summary = evaluator.evaluate_protocols();
    let class = &summary.relation.per_class[&KEY];
    assert_eq!(class.num_groundtruth, 2);
    assert_eq!(class.true_positives, 1);
    assert!((class.average_precision - 0.5).abs() < 1e-10);
    assert!((class.recall_at[&50] - 0.5).abs() < 1e-10);
}

#[test]
fn test_first_fit_not_best_fit() {
    // The detection overlaps both instances; the first in insertion order wins
    // even though the second overlaps better.
    let detected = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let first = BoundingBox::new(0.0, 0.0, 10.0, 6.0);
    let second = BoundingBox::new(0.0, 0.0, 10.0, 9.0);

    let index = GroundTruthIndex::from_instances(
        "img",
        vec![relationship(first, square()), relationship(second, square())],
    )
    .unwrap();
    let labeled = match_image(
        Protocol::Relation,
        Some(&index),
        &sequenced(vec![detection(detected, square(), 0.9)]),
        0.5,
    );
    assert_eq!(labeled[0].matched_groundtruth, Some(0));
}

#[test]
fn test_lower_score_claims_remaining_instance() {
    let other = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
    let index = GroundTruthIndex::from_instances(
        "img",
        vec![relationship(square(), square()), relationship(other, other)],
    )
    .unwrap();

    let labeled = match_image(
        Protocol::Relation,
        Some(&index),
        &sequenced(vec![
            detection(other, other, 0.2),
            detection(square(), square(), 0.9),
        ]),
        0.5,
    );
    assert!(labeled.iter().all(|l| l.is_true_positive));
}

#[test]
fn test_more_than_fifty_detections() {
    // 60 false positives outrank the only true positive: Recall@50 misses it
    let far = BoundingBox::new(50.0, 50.0, 60.0, 60.0);
    let mut detections: Vec<ScoredRelationshipInstance> =
        (0..60).map(|i| detection(far, far, 0.9 - i as f64 * 0.001)).collect();
    detections.push(detection(square(), square(), 0.1));

    let mut evaluator = VrdEvaluator::new();
    evaluator
        .add_groundtruth("img", vec![relationship(square(), square())])
        .unwrap();
    evaluator.add_predictions("img", detections).unwrap();

    let summary = evaluator.evaluate_protocols();
    assert_eq!(summary.relation.recall(50), Some(0.0));
    assert_eq!(summary.relation.recall(100), Some(1.0));
    assert!((summary.relation.mean_ap - 1.0 / 61.0).abs() < 1e-10);
}

#[test]
fn test_accumulator_without_data() {
    let metrics = PrAccumulator::new().evaluate(&[50]);
    assert_eq!(metrics.mean_ap, 0.0);
    assert_eq!(metrics.recall(50), Some(0.0));
    assert_eq!(metrics.recall(100), None);
}

#[test]
fn test_ap_mismatched_lengths() {
    assert_eq!(calculate_ap(&[1.0, 0.5], &[0.5]), 0.0);
    assert_eq!(calculate_ap(&[], &[]), 0.0);
}
