//! Error types for the vrd-eval library.

use thiserror::Error;

/// Result type for vrd-eval operations.
pub type Result<T> = std::result::Result<T, VrdEvalError>;

/// Error types that can occur during relationship detection evaluation.
#[derive(Error, Debug)]
pub enum VrdEvalError {
    /// Error during JSON parsing or serialization.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error during CSV reading or writing.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error during I/O operations.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Input record is missing a required field or carries an unparseable value.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Class or predicate name not present in the label map.
    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    /// Groundtruth was added twice for the same image.
    #[error("Duplicate image: {0}")]
    DuplicateImage(String),

    /// A keyed groundtruth row was supplied twice with different geometry.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Predictions reference an image without groundtruth under a rejecting policy.
    #[error("Unknown image: {0}")]
    UnknownImage(String),

    /// Invalid bounding box coordinates.
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    /// Label map text could not be parsed.
    #[error("Label map error: {0}")]
    LabelMap(String),

    /// Evaluator configuration is out of range.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
