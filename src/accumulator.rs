//! Cross-image accumulation of TP/FP labels and per-class AP / Recall@K.

use crate::matching::{compare_ranked, LabeledDetection};
use crate::metrics::ap::{calculate_ap, calculate_map};
use crate::metrics::precision_recall::{calculate_precision_recall_curve, calculate_recall_at_k};
use crate::types::ClassKey;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// A single ranked outcome: score, submission order, TP flag.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RankedLabel {
    score: f64,
    sequence: usize,
    is_true_positive: bool,
}

/// Metrics for one class key with at least one groundtruth instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub average_precision: f64,
    pub num_groundtruth: usize,
    pub num_detections: usize,
    pub true_positives: usize,
    /// Recall of the top-k ranked detections, keyed by k.
    pub recall_at: BTreeMap<usize, f64>,
}

/// Metrics for one evaluation protocol.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProtocolMetrics {
    /// Mean of per-class AP over classes with groundtruth.
    pub mean_ap: f64,
    /// AP of all detections pooled against all groundtruth.
    pub weighted_ap: f64,
    /// Mean of per-class Recall@k, keyed by k.
    pub recall_at: BTreeMap<usize, f64>,
    pub per_class: BTreeMap<ClassKey, ClassMetrics>,
    pub num_groundtruth: usize,
    pub num_detections: usize,
}

impl ProtocolMetrics {
    /// Mean Recall@k, if k was requested.
    pub fn recall(&self, k: usize) -> Option<f64> {
        self.recall_at.get(&k).copied()
    }
}

/// Collects TP/FP outcomes per class key across images.
///
/// Holds no match state: labels arrive already decided by the matcher, so
/// [`PrAccumulator::evaluate`] is a pure function of the accumulated data.
#[derive(Debug, Clone, Default)]
pub struct PrAccumulator {
    num_groundtruth: BTreeMap<ClassKey, usize>,
    labels: BTreeMap<ClassKey, Vec<RankedLabel>>,
}

impl PrAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` groundtruth instances of `class_key`.
    pub fn add_groundtruth(&mut self, class_key: ClassKey, count: usize) {
        *self.num_groundtruth.entry(class_key).or_insert(0) += count;
    }

    /// Add matcher outcomes from one image.
    pub fn add_detections(&mut self, detections: impl IntoIterator<Item = LabeledDetection>) {
        for det in detections {
            self.labels.entry(det.class_key).or_default().push(RankedLabel {
                score: det.score,
                sequence: det.sequence,
                is_true_positive: det.is_true_positive,
            });
        }
    }

    pub fn num_groundtruth(&self, class_key: &ClassKey) -> usize {
        self.num_groundtruth.get(class_key).copied().unwrap_or(0)
    }

    pub fn num_detections(&self) -> usize {
        self.labels.values().map(Vec::len).sum()
    }

    /// Compute per-class AP and Recall@k, then their means.
    ///
    /// Class keys without groundtruth are excluded from every mean; their
    /// detections still count as false positives in `weighted_ap`.
    pub fn evaluate(&self, recall_ranks: &[usize]) -> ProtocolMetrics {
        let per_class: BTreeMap<ClassKey, ClassMetrics> = self
            .num_groundtruth
            .par_iter()
            .filter(|&(_, &count)| count > 0)
            .map(|(class_key, &count)| {
                let labels = self.labels.get(class_key).map(Vec::as_slice).unwrap_or(&[]);
                (*class_key, evaluate_class(labels, count, recall_ranks))
            })
            .collect();

        let class_aps: Vec<f64> = per_class.values().map(|m| m.average_precision).collect();
        let recall_at = recall_ranks
            .iter()
            .map(|&k| {
                let recalls: Vec<f64> = per_class
                    .values()
                    .map(|m| m.recall_at.get(&k).copied().unwrap_or(0.0))
                    .collect();
                (k, calculate_map(&recalls))
            })
            .collect();

        let pooled: Vec<RankedLabel> = self.labels.values().flatten().copied().collect();
        let num_groundtruth = self.num_groundtruth.values().sum();
        let weighted_ap = if num_groundtruth > 0 {
            ranked_ap(&rank(pooled), num_groundtruth)
        } else {
            0.0
        };

        ProtocolMetrics {
            mean_ap: calculate_map(&class_aps),
            weighted_ap,
            recall_at,
            per_class,
            num_groundtruth,
            num_detections: self.num_detections(),
        }
    }
}

/// Sort by descending score, ties by submission order.
fn rank(mut labels: Vec<RankedLabel>) -> Vec<RankedLabel> {
    labels.sort_by(|a, b| compare_ranked(a.score, a.sequence, b.score, b.sequence));
    labels
}

fn ranked_ap(ranked: &[RankedLabel], num_groundtruth: usize) -> f64 {
    let pairs: Vec<(f64, bool)> = ranked.iter().map(|l| (l.score, l.is_true_positive)).collect();
    let curve = calculate_precision_recall_curve(&pairs, num_groundtruth);
    let precisions: Vec<f64> = curve.iter().map(|p| p.precision).collect();
    let recalls: Vec<f64> = curve.iter().map(|p| p.recall).collect();
    calculate_ap(&precisions, &recalls)
}

fn evaluate_class(labels: &[RankedLabel], num_groundtruth: usize, recall_ranks: &[usize]) -> ClassMetrics {
    let ranked = rank(labels.to_vec());
    let is_tp: Vec<bool> = ranked.iter().map(|l| l.is_true_positive).collect();

    ClassMetrics {
        average_precision: ranked_ap(&ranked, num_groundtruth),
        num_groundtruth,
        num_detections: ranked.len(),
        true_positives: is_tp.iter().filter(|&&tp| tp).count(),
        recall_at: recall_ranks
            .iter()
            .map(|&k| (k, calculate_recall_at_k(&is_tp, num_groundtruth, k)))
            .collect(),
    }
}
