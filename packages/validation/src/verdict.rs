//! Aggregation of per-split metrics into an accept/reject verdict

use crate::metrics::{ConfusionMetrics, mean, std_dev};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags::bitflags! {
    /// Legacy numeric encoding of the verdict status; callers treat it as a flag set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u32 {
        const LOW_SCORE = 4;
        const NOT_ENOUGH_DATA = 8;
    }
}

/// Outcome of an evaluation. `Both == LowScore | InsufficientData` in the legacy encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictStatus {
    Ok,
    LowScore,
    InsufficientData,
    Both,
}

impl VerdictStatus {
    pub fn from_flags(flags: StatusFlags) -> Self {
        match (
            flags.contains(StatusFlags::LOW_SCORE),
            flags.contains(StatusFlags::NOT_ENOUGH_DATA),
        ) {
            (false, false) => VerdictStatus::Ok,
            (true, false) => VerdictStatus::LowScore,
            (false, true) => VerdictStatus::InsufficientData,
            (true, true) => VerdictStatus::Both,
        }
    }

    pub fn flags(self) -> StatusFlags {
        match self {
            VerdictStatus::Ok => StatusFlags::empty(),
            VerdictStatus::LowScore => StatusFlags::LOW_SCORE,
            VerdictStatus::InsufficientData => StatusFlags::NOT_ENOUGH_DATA,
            VerdictStatus::Both => StatusFlags::LOW_SCORE | StatusFlags::NOT_ENOUGH_DATA,
        }
    }

    /// 0, 4, 8 or 12
    pub fn code(self) -> u32 {
        self.flags().bits()
    }

    pub fn from_code(code: u32) -> Option<Self> {
        StatusFlags::from_bits(code).map(VerdictStatus::from_flags)
    }

    pub fn is_ok(self) -> bool {
        self == VerdictStatus::Ok
    }
}

impl Serialize for VerdictStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.code())
    }
}

impl<'de> Deserialize<'de> for VerdictStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u32::deserialize(deserializer)?;
        VerdictStatus::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown verdict status {code}")))
    }
}

/// Per-split metric series of one evaluation.
///
/// `aucs` can be shorter than the others: splits with an undefined ROC curve contribute
/// every metric except their AUC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunAccumulators {
    pub accuracies: Vec<f64>,
    pub precisions: Vec<f64>,
    pub recalls: Vec<f64>,
    pub matthews: Vec<f64>,
    pub aucs: Vec<f64>,
}

impl RunAccumulators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_metrics(&mut self, metrics: &ConfusionMetrics) {
        self.accuracies.push(metrics.accuracy);
        self.precisions.push(metrics.precision);
        self.recalls.push(metrics.recall);
        self.matthews.push(metrics.matthews);
    }

    pub fn record_auc(&mut self, auc: f64) {
        self.aucs.push(auc);
    }

    /// Number of splits recorded
    pub fn runs(&self) -> usize {
        self.matthews.len()
    }

    /// Number of splits whose AUC was skipped
    pub fn skipped_aucs(&self) -> usize {
        self.runs().saturating_sub(self.aucs.len())
    }
}

/// Map the Matthews coefficient from [-1, 1] onto [0, 1]
pub fn score_from_matthews(matthews: f64) -> f64 {
    (matthews + 1.0) / 2.0
}

/// Final decision of an evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub errors: Vec<String>,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    /// Mean AUC, `None` when no split had a defined ROC curve
    pub auc: Option<f64>,
    pub auc_deviation: Option<f64>,
    pub score: f64,
    pub min_score: f64,
    pub accepted_deviation: f64,
    pub runid: i64,
}

impl Verdict {
    /// Aggregate the accumulators and apply the score and stability gates
    pub fn decide(
        accumulators: &RunAccumulators,
        min_score: f64,
        accepted_deviation: f64,
        runid: i64,
    ) -> Self {
        let auc = mean(&accumulators.aucs);
        let auc_deviation = std_dev(&accumulators.aucs);
        let score = score_from_matthews(mean(&accumulators.matthews).unwrap_or(0.0));

        let mut flags = StatusFlags::empty();
        let mut errors = Vec::new();

        match auc_deviation {
            Some(deviation) if deviation > accepted_deviation => {
                errors.push(format!(
                    "The results obtained varied too much, we need more samples to check if this model is valid. Model deviation = {deviation:.6}, accepted deviation = {accepted_deviation:.6}"
                ));
                flags |= StatusFlags::NOT_ENOUGH_DATA;
            }
            Some(_) => {}
            None => {
                errors.push(format!(
                    "None of the {} test splits contained both classes, we need more samples to check if this model is valid.",
                    accumulators.runs()
                ));
                flags |= StatusFlags::NOT_ENOUGH_DATA;
            }
        }

        if score < min_score {
            errors.push(format!(
                "The model is not good enough. Model score = {score:.6}, minimum score = {min_score:.6}"
            ));
            flags |= StatusFlags::LOW_SCORE;
        }

        Verdict {
            status: VerdictStatus::from_flags(flags),
            errors,
            accuracy: mean(&accumulators.accuracies).unwrap_or(0.0),
            precision: mean(&accumulators.precisions).unwrap_or(0.0),
            recall: mean(&accumulators.recalls).unwrap_or(0.0),
            auc,
            auc_deviation,
            score,
            min_score,
            accepted_deviation,
            runid,
        }
    }
}
