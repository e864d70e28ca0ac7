//! Basic evaluation example demonstrating core functionality.

use vrd_eval::label_map::LabelMap;
use vrd_eval::loader::{read_groundtruth_boxes, read_predictions, group_groundtruth, group_predictions};
use vrd_eval::metrics::{calculate_iou, union_box};
use vrd_eval::{BoundingBox, Protocol, VrdEvaluator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Relationship Detection Evaluation Example ===\n");

    // Example 1: IoU and union boxes
    println!("1. IoU Calculation");
    let subject = BoundingBox::new(0.10, 0.10, 0.50, 0.40);
    let object = BoundingBox::new(0.30, 0.35, 0.90, 0.80);
    let shifted = BoundingBox::new(0.12, 0.15, 0.52, 0.45);
    println!("   IoU between subject and shifted subject: {:.4}", calculate_iou(&subject, &shifted));
    println!("   Union of subject and object: {}", union_box(&subject, &object));
    println!();

    // Example 2: Label maps
    println!("2. Loading Label Maps");
    let classes: LabelMap = r#"
        item { name: "/m/01g317" id: 1 display_name: "Person" }
        item { name: "/m/0342h" id: 2 display_name: "Guitar" }
        item { name: "/m/01mzpv" id: 3 display_name: "Chair" }
    "#
    .parse()?;
    let predicates: LabelMap = r#"
        item { name: "plays" id: 1 }
        item { name: "on" id: 2 }
    "#
    .parse()?;
    println!("   {} object classes, {} predicates", classes.len(), predicates.len());
    println!();

    // Example 3: Groundtruth and predictions in Open Images CSV layout
    println!("3. Loading Annotations");
    let boxes_csv = "\
ImageID,LabelName1,LabelName2,XMin1,XMax1,YMin1,YMax1,XMin2,XMax2,YMin2,YMax2,RelationshipLabel
img1,/m/01g317,/m/0342h,0.10,0.40,0.10,0.50,0.35,0.80,0.30,0.90,plays
img1,/m/01g317,/m/01mzpv,0.10,0.40,0.10,0.50,0.00,0.50,0.40,1.00,on
img2,/m/01g317,/m/0342h,0.50,0.90,0.00,0.60,0.40,0.70,0.20,0.80,plays
";
    let predictions_csv = "\
ImageID,LabelName1,LabelName2,XMin1,XMax1,YMin1,YMax1,XMin2,XMax2,YMin2,YMax2,RelationshipLabel,Score
img1,/m/01g317,/m/0342h,0.15,0.45,0.12,0.52,0.35,0.80,0.30,0.90,plays,0.95
img1,/m/01g317,/m/01mzpv,0.30,0.40,0.10,0.50,0.00,0.50,0.40,1.00,on,0.60
img2,/m/01g317,/m/0342h,0.50,0.90,0.00,0.60,0.40,0.70,0.20,0.80,plays,0.85
img2,/m/01g317,/m/0342h,0.00,0.20,0.00,0.20,0.40,0.70,0.20,0.80,plays,0.40
";

    let groundtruth = group_groundtruth(
        read_groundtruth_boxes(boxes_csv.as_bytes(), &classes, &predicates)?,
        Vec::new(),
    );
    let predictions = group_predictions(read_predictions(predictions_csv.as_bytes(), &classes, &predicates)?);
    println!("   Groundtruth for {} images", groundtruth.len());
    println!("   Predictions for {} images", predictions.len());
    println!();

    // Example 4: Evaluation
    println!("4. Running Full Evaluation");
    let mut evaluator = VrdEvaluator::new().with_label_maps(classes, predicates);
    for image in groundtruth {
        evaluator.add_groundtruth_index(image.into_index()?)?;
    }
    for image in predictions {
        evaluator.add_predictions(&image.image_id, image.detections)?;
    }

    let summary = evaluator.evaluate_protocols();
    for (protocol, metrics) in [(Protocol::Relation, &summary.relation), (Protocol::Phrase, &summary.phrase)] {
        println!("   {:?}:", protocol);
        println!("   ├─ mAP: {:.4}", metrics.mean_ap);
        println!("   ├─ weighted AP: {:.4}", metrics.weighted_ap);
        println!("   └─ Recall@50: {:.4}", metrics.recall(50).unwrap_or(0.0));
    }
    println!("   Composite score: {:.4}", summary.score);
    println!();

    // Example 5: The flat metric report
    println!("5. Metric Report");
    for (name, value) in evaluator.evaluate().iter() {
        println!("   {}: {:.4}", name, value);
    }
    println!();

    println!("=== Example Complete ===");

    Ok(())
}
