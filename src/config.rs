//! Evaluator configuration.

use crate::error::{Result, VrdEvalError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// What to do with predictions for an image that has no groundtruth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownImagePolicy {
    /// Evaluate them against an empty groundtruth set: every one is a false positive.
    #[default]
    Tolerate,
    /// Fail with [`VrdEvalError::UnknownImage`].
    Reject,
}

/// Settings shared by both evaluation protocols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Minimum IoU for a detection to claim a groundtruth instance.
    pub matching_iou_threshold: f64,
    /// Ranks k at which Recall@k is reported.
    pub recall_ranks: Vec<usize>,
    pub unknown_image_policy: UnknownImagePolicy,
    /// Ignore detections whose classes the image-level labels cannot judge.
    pub restrict_to_verified_labels: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            matching_iou_threshold: 0.5,
            recall_ranks: vec![50, 100],
            unknown_image_policy: UnknownImagePolicy::Tolerate,
            restrict_to_verified_labels: false,
        }
    }
}

impl EvaluatorConfig {
    /// Settings used by the challenge command line: the defaults plus the
    /// verified-label filter, so the image-level labels file takes effect.
    pub fn open_images_challenge() -> Self {
        Self {
            restrict_to_verified_labels: true,
            ..Self::default()
        }
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the IoU threshold is outside (0, 1] or the
    /// recall ranks are empty or contain zero.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.matching_iou_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(VrdEvalError::InvalidConfig(format!(
                "matching_iou_threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        if self.recall_ranks.is_empty() {
            return Err(VrdEvalError::InvalidConfig(
                "recall_ranks must not be empty".to_string(),
            ));
        }
        if self.recall_ranks.contains(&0) {
            return Err(VrdEvalError::InvalidConfig(
                "recall_ranks must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load an evaluator configuration from a JSON file.
///
/// Missing fields take their default values.
///
/// # Example
///
/// ```no_run
/// use vrd_eval::config::load_config_from_file;
///
/// let config = load_config_from_file("vrd_eval.json").unwrap();
/// println!("IoU threshold: {}", config.matching_iou_threshold);
/// ```
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> Result<EvaluatorConfig> {
    let file = File::open(path)?;
    let config: EvaluatorConfig = serde_json::from_reader(BufReader::new(file))?;
    config.validate()?;
    Ok(config)
}

/// Load an evaluator configuration from a JSON string.
///
/// # Example
///
/// ```
/// use vrd_eval::config::{load_config_from_str, UnknownImagePolicy};
///
/// let config = load_config_from_str(r#"{"unknown_image_policy": "reject"}"#).unwrap();
/// assert_eq!(config.unknown_image_policy, UnknownImagePolicy::Reject);
/// assert_eq!(config.matching_iou_threshold, 0.5);
/// ```
pub fn load_config_from_str(json_str: &str) -> Result<EvaluatorConfig> {
    let config: EvaluatorConfig = serde_json::from_str(json_str)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_settings() {
        let config = EvaluatorConfig::open_images_challenge();
        assert!(config.validate().is_ok());
        assert!(config.restrict_to_verified_labels);
        assert_eq!(config.matching_iou_threshold, 0.5);
        assert_eq!(config.recall_ranks, EvaluatorConfig::default().recall_ranks);
    }

    #[test]
    fn test_default_is_valid() {
        let config = EvaluatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recall_ranks, vec![50, 100]);
        assert!(!config.restrict_to_verified_labels);
    }

    #[test]
    fn test_invalid_threshold() {
        for threshold in [0.0, -0.5, 1.5, f64::NAN] {
            let config = EvaluatorConfig {
                matching_iou_threshold: threshold,
                ..EvaluatorConfig::default()
            };
            assert!(matches!(config.validate(), Err(VrdEvalError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_invalid_recall_ranks() {
        let empty = EvaluatorConfig {
            recall_ranks: vec![],
            ..EvaluatorConfig::default()
        };
        assert!(empty.validate().is_err());

        let zero = EvaluatorConfig {
            recall_ranks: vec![0, 50],
            ..EvaluatorConfig::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_load_partial_json() {
        let config = load_config_from_str(
            r#"{"matching_iou_threshold": 0.7, "restrict_to_verified_labels": true}"#,
        )
        .unwrap();
        assert_eq!(config.matching_iou_threshold, 0.7);
        assert!(config.restrict_to_verified_labels);
        assert_eq!(config.unknown_image_policy, UnknownImagePolicy::Tolerate);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        assert!(load_config_from_str(r#"{"matching_iou_threshold": 2.0}"#).is_err());
        assert!(load_config_from_str("{ not json").is_err());
    }
}
