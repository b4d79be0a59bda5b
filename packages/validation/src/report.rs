//! JSON payloads returned by the harness entry points

use crate::verdict::{RunAccumulators, Verdict};
use serde::{Deserialize, Serialize};

/// Result codes shared by every payload
pub mod codes {
    pub const OK: u32 = 0;
    pub const GENERAL_ERROR: u32 = 1;
    pub const NO_DATASET: u32 = 2;
    pub const LOW_SCORE: u32 = 4;
    pub const NOT_ENOUGH_DATA: u32 = 8;
}

pub const NO_MODEL_MESSAGE: &str = "Provided model has not been trained yet";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPayload {
    pub status: u32,
    pub errors: Vec<String>,
}

impl TrainingPayload {
    pub fn ok() -> Self {
        TrainingPayload {
            status: codes::OK,
            errors: Vec::new(),
        }
    }
}

/// `(sample id, predicted label, confidence of that label)`
pub type Prediction = (i64, usize, f64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPayload {
    pub status: u32,
    pub errors: Vec<String>,
    pub predictions: Vec<Prediction>,
}

impl PredictionPayload {
    pub fn ok(predictions: Vec<Prediction>) -> Self {
        PredictionPayload {
            status: codes::OK,
            errors: Vec::new(),
            predictions,
        }
    }

    pub fn no_model() -> Self {
        PredictionPayload {
            status: codes::NO_DATASET,
            errors: vec![NO_MODEL_MESSAGE.to_string()],
            predictions: Vec::new(),
        }
    }
}

/// Outcome of one evaluation: the verdict plus the raw per-split series it was computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub verdict: Verdict,
    pub accumulators: RunAccumulators,
}
