//! Error types for the validation harness

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Errors that can occur while loading samples, fitting or evaluating a classifier.
///
/// Only the fatal kinds leave the harness. `DegenerateSplit` and
/// `LearningCurveUnavailable` are produced by internal calls and recovered by
/// the evaluation loop.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A required directory could not be created, or a run directory collides with an earlier run
    #[error("Storage fault at {path}: {message}")]
    StorageFault { path: PathBuf, message: String },

    /// The samples file could not be parsed into the expected shape
    #[error("Malformed input in {path}: {message}")]
    MalformedInput { path: PathBuf, message: String },

    /// The fitting backend rejected the training set
    #[error("Training failed: {0}")]
    Training(String),

    /// The ROC curve of a split is undefined because the split holds a single class
    #[error("Degenerate split: ROC curve is undefined for a single-class test set")]
    DegenerateSplit,

    /// A learning curve chunk contained a single class
    #[error("Learning curve unavailable: {0}")]
    LearningCurveUnavailable(String),

    /// The persisted classifier could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Evaluation settings outside of their valid range
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Two collections that must correspond row by row have different lengths
    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ValidationError {
    pub fn storage_fault(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ValidationError::StorageFault {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn malformed_input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ValidationError::MalformedInput {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for the kinds the evaluation loop recovers from locally
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ValidationError::DegenerateSplit | ValidationError::LearningCurveUnavailable(_)
        )
    }
}
