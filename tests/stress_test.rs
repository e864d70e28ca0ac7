//! Stress tests with large datasets and complex scenarios.

use vrd_eval::evaluator::VrdEvaluator;
use vrd_eval::types::{BoundingBox, ClassKey, RelationshipInstance, ScoredRelationshipInstance};

fn grid_box(i: usize) -> BoundingBox {
    let y = (i / 100) as f64 * 10.0;
    let x = (i % 100) as f64 * 10.0;
    BoundingBox::new(y, x, y + 8.0, x + 8.0)
}

#[test]
fn test_1000_relationships_single_image() {
    let key = ClassKey::new(1, 2, 3);
    let groundtruth: Vec<RelationshipInstance> = (0..1000)
        .map(|i| RelationshipInstance::new("img", key, grid_box(i), grid_box(i + 1)))
        .collect();
    let predictions: Vec<ScoredRelationshipInstance> = groundtruth
        .iter()
        .enumerate()
        .map(|(i, gt)| ScoredRelationshipInstance::new(gt.clone(), 0.9 - i as f64 / 10_000.0))
        .collect();

    let mut evaluator = VrdEvaluator::new();
    evaluator.add_groundtruth("img", groundtruth).unwrap();
    evaluator.add_predictions("img", predictions).unwrap();

    let summary = evaluator.evaluate_protocols();
    assert!((summary.relation.mean_ap - 1.0).abs() < 1e-10);
    // Only the top 50 of 1000 detections count towards Recall@50
    assert!((summary.relation.recall(50).unwrap() - 0.05).abs() < 1e-10);
    assert!((summary.relation.recall(100).unwrap() - 0.1).abs() < 1e-10);
}

#[test]
fn test_many_images_and_classes() {
    let mut evaluator = VrdEvaluator::new();
    let mut expected_true_positives = 0;

    for image in 0..200 {
        let image_id = format!("img{}", image);
        let key = ClassKey::new((image % 5) as u64, (image % 3) as u64, (image % 7) as u64);
        let groundtruth: Vec<RelationshipInstance> = (0..5)
            .map(|i| RelationshipInstance::new(image_id.as_str(), key, grid_box(i), grid_box(i + 10)))
            .collect();

        // Every other detection is shifted off its groundtruth
        let predictions: Vec<ScoredRelationshipInstance> = groundtruth
            .iter()
            .enumerate()
            .map(|(i, gt)| {
                let mut detection = gt.clone();
                if i % 2 == 1 {
                    detection.subject_box = grid_box(i + 500);
                } else {
                    expected_true_positives += 1;
                }
                ScoredRelationshipInstance::new(detection, (image * 5 + i) as f64 / 1000.0)
            })
            .collect();

        evaluator.add_groundtruth(&image_id, groundtruth).unwrap();
        evaluator.add_predictions(&image_id, predictions).unwrap();
    }

    let summary = evaluator.evaluate_protocols();
    assert_eq!(summary.relation.num_groundtruth, 1000);
    assert_eq!(summary.relation.num_detections, 1000);

    let true_positives: usize = summary
        .relation
        .per_class
        .values()
        .map(|class| class.true_positives)
        .sum();
    assert_eq!(true_positives, expected_true_positives);
    assert!(summary.relation.mean_ap > 0.0 && summary.relation.mean_ap < 1.0);

    // Evaluation over many images stays idempotent
    assert_eq!(summary, evaluator.evaluate_protocols());
}

#[test]
fn test_many_duplicate_detections() {
    let key = ClassKey::new(1, 2, 3);
    let gt = RelationshipInstance::new("img", key, grid_box(0), grid_box(1));

    let mut evaluator = VrdEvaluator::new();
    evaluator.add_groundtruth("img", vec![gt.clone()]).unwrap();
    evaluator
        .add_predictions(
            "img",
            (0..500)
                .map(|i| ScoredRelationshipInstance::new(gt.clone(), 1.0 - i as f64 / 1000.0))
                .collect(),
        )
        .unwrap();

    let summary = evaluator.evaluate_protocols();
    let class = &summary.relation.per_class[&key];
    assert_eq!(class.true_positives, 1);
    assert_eq!(class.num_detections, 500);
    assert_eq!(class.average_precision, 1.0);
}
