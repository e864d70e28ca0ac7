use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vrd_eval::evaluator::VrdEvaluator;
use vrd_eval::metrics::{calculate_ap, calculate_iou, union_box};
use vrd_eval::types::{BoundingBox, ClassKey, RelationshipInstance, ScoredRelationshipInstance};

fn offset_box(i: usize) -> BoundingBox {
    let offset = (i as f64) * 2.0;
    BoundingBox::new(offset, offset, offset + 50.0, offset + 50.0)
}

fn bench_iou_calculation(c: &mut Criterion) {
    let bbox1 = BoundingBox::new(10.0, 10.0, 50.0, 50.0);
    let bbox2 = BoundingBox::new(30.0, 30.0, 80.0, 80.0);

    c.bench_function("iou_single", |b| {
        b.iter(|| calculate_iou(black_box(&bbox1), black_box(&bbox2)));
    });

    c.bench_function("phrase_iou_single", |b| {
        b.iter(|| {
            let detected = union_box(black_box(&bbox1), black_box(&bbox2));
            let expected = union_box(black_box(&bbox2), black_box(&bbox1));
            calculate_iou(&detected, &expected)
        });
    });
}

fn bench_ap_calculation(c: &mut Criterion) {
    let mut group = c.benchmark_group("ap_calculation");

    for num_detections in [10, 50, 100, 500].iter() {
        let precision: Vec<f64> = (0..*num_detections)
            .map(|i| 1.0 - (i as f64) / (*num_detections as f64))
            .collect();
        let recall: Vec<f64> = (0..*num_detections)
            .map(|i| (i as f64) / (*num_detections as f64))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(num_detections), num_detections, |b, _| {
            b.iter(|| calculate_ap(black_box(&precision), black_box(&recall)));
        });
    }
    group.finish();
}

fn build_evaluator(num_images: usize, per_image: usize) -> VrdEvaluator {
    let mut evaluator = VrdEvaluator::new();
    for image in 0..num_images {
        let image_id = format!("img{}", image);
        let groundtruth: Vec<RelationshipInstance> = (0..per_image)
            .map(|i| {
                let key = ClassKey::new((i % 4) as u64, (i % 3) as u64, (i % 5) as u64);
                RelationshipInstance::new(image_id.as_str(), key, offset_box(i), offset_box(i + 3))
            })
            .collect();
        let predictions: Vec<ScoredRelationshipInstance> = groundtruth
            .iter()
            .enumerate()
            .map(|(i, gt)| {
                let mut detection = gt.clone();
                detection.subject_box = offset_box(i + i % 3);
                ScoredRelationshipInstance::new(detection, 1.0 - i as f64 / per_image as f64)
            })
            .collect();

        evaluator.add_groundtruth(&image_id, groundtruth).unwrap();
        evaluator.add_predictions(&image_id, predictions).unwrap();
    }
    evaluator
}

fn bench_full_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_evaluation");
    group.sample_size(20);

    for num_images in [10, 100, 500].iter() {
        let evaluator = build_evaluator(*num_images, 50);
        group.bench_with_input(BenchmarkId::from_parameter(num_images), num_images, |b, _| {
            b.iter(|| black_box(evaluator.evaluate()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_iou_calculation,
    bench_ap_calculation,
    bench_full_evaluation
);
criterion_main!(benches);
