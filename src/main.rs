use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vrd_eval::config::EvaluatorConfig;
use vrd_eval::label_map::LabelMap;
use vrd_eval::loader::{load_groundtruth, load_predictions};
use vrd_eval::report::write_metrics;
use vrd_eval::VrdEvaluator;

#[derive(Parser)]
#[command(name = "vrd-eval")]
#[command(about = "Evaluate visual relationship detections: relation and phrase mAP, Recall@50 and the composite score", long_about = None)]
#[command(version)]
struct Cli {
    /// Groundtruth relationship boxes CSV
    #[arg(long)]
    input_annotations_boxes: PathBuf,

    /// Groundtruth image-level labels CSV
    #[arg(long)]
    input_annotations_labels: PathBuf,

    /// Object class label map (protobuf text format)
    #[arg(long)]
    input_class_labelmap: PathBuf,

    /// Relationship label map (protobuf text format)
    #[arg(long)]
    input_relationship_labelmap: PathBuf,

    /// Predictions CSV
    #[arg(long)]
    input_predictions: PathBuf,

    /// Output metrics file (.csv for metric,value rows, JSON otherwise)
    #[arg(long)]
    output_metrics: PathBuf,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let classes = LabelMap::from_file(&cli.input_class_labelmap).with_context(|| {
        format!("loading class label map {}", cli.input_class_labelmap.display())
    })?;
    let predicates = LabelMap::from_file(&cli.input_relationship_labelmap).with_context(|| {
        format!(
            "loading relationship label map {}",
            cli.input_relationship_labelmap.display()
        )
    })?;
    info!(classes = classes.len(), predicates = predicates.len(), "loaded label maps");

    let groundtruth = load_groundtruth(
        &cli.input_annotations_boxes,
        &cli.input_annotations_labels,
        &classes,
        &predicates,
    )
    .with_context(|| {
        format!(
            "loading groundtruth {} / {}",
            cli.input_annotations_boxes.display(),
            cli.input_annotations_labels.display()
        )
    })?;
    info!(images = groundtruth.len(), "loaded groundtruth");

    let predictions = load_predictions(&cli.input_predictions, &classes, &predicates)
        .with_context(|| format!("loading predictions {}", cli.input_predictions.display()))?;
    info!(images = predictions.len(), "loaded predictions");

    let mut evaluator = VrdEvaluator::with_config(EvaluatorConfig::open_images_challenge())?
        .with_label_maps(classes, predicates);
    for image in groundtruth {
        let image_id = image.image_id.clone();
        image
            .into_index()
            .and_then(|index| evaluator.add_groundtruth_index(index))
            .with_context(|| format!("adding groundtruth for image {}", image_id))?;
    }
    for image in predictions {
        evaluator
            .add_predictions(&image.image_id, image.detections)
            .with_context(|| format!("adding predictions for image {}", image.image_id))?;
    }

    let report = evaluator.evaluate();
    for (name, value) in report.iter() {
        info!("{}: {}", name, value);
    }

    write_metrics(&cli.output_metrics, &report)
        .with_context(|| format!("writing metrics {}", cli.output_metrics.display()))?;
    info!(path = %cli.output_metrics.display(), "wrote metrics");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vrd_eval=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
