//! Validation harness for binary logistic regression classifiers
//!
//! Trains a classifier with a cross-validated regularization strength, persists it, and
//! estimates its quality by scoring many random train/test splits. The outcome of an
//! evaluation is a [`Verdict`] that combines a Matthews-based score gate with an AUC stability
//! gate.

pub mod classifier;
pub mod curves;
pub mod error;
pub mod harness;
pub mod hyperparameter;
pub mod learning_curve;
pub mod metrics;
pub mod persistence;
pub mod report;
pub mod samples;
pub mod settings;
pub mod verdict;

pub use classifier::{ClassifierArtifact, ClassifierTrainer};
pub use curves::{CurveRecorder, CurveSink, JsonCurveStore, NoCurves};
pub use error::{Result, ValidationError};
pub use harness::EvaluationHarness;
pub use hyperparameter::{CrossValidatedSearch, Hyperparameter, HyperparameterSearch};
pub use report::{EvaluationReport, PredictionPayload, TrainingPayload};
pub use samples::{LabelledSamples, UnlabelledSamples};
pub use settings::EvaluationSettings;
pub use verdict::{RunAccumulators, Verdict, VerdictStatus};
