//! Binary classification metrics
//!
//! Confusion-matrix metrics for one prediction/ground-truth pair, the ROC sweep over
//! positive-class scores and its trapezoidal area.

use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};

/// Confusion-matrix counts of a binary prediction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl ConfusionCounts {
    /// Count outcomes; `true` marks the positive class in both slices
    pub fn from_predictions(y_true: &[bool], y_pred: &[bool]) -> Self {
        let mut counts = ConfusionCounts::default();
        for (&actual, &predicted) in y_true.iter().zip(y_pred) {
            match (actual, predicted) {
                (true, true) => counts.true_positives += 1,
                (false, false) => counts.true_negatives += 1,
                (false, true) => counts.false_positives += 1,
                (true, false) => counts.false_negatives += 1,
            }
        }
        counts
    }

    /// Ground-truth positives
    pub fn positives(&self) -> usize {
        self.true_positives + self.false_negatives
    }

    /// Ground-truth negatives
    pub fn negatives(&self) -> usize {
        self.true_negatives + self.false_positives
    }

    pub fn total(&self) -> usize {
        self.positives() + self.negatives()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_positives + self.true_negatives) as f64 / total as f64
    }

    /// `tp / (tp + fp)`, exactly 0 when nothing was predicted positive
    pub fn precision(&self) -> f64 {
        let predicted = self.true_positives + self.false_positives;
        if predicted == 0 {
            return 0.0;
        }
        self.true_positives as f64 / predicted as f64
    }

    /// `tp / (tp + fn)`, exactly 0 when there are no actual positives
    pub fn recall(&self) -> f64 {
        let actual = self.true_positives + self.false_negatives;
        if actual == 0 {
            return 0.0;
        }
        self.true_positives as f64 / actual as f64
    }

    /// Matthews correlation coefficient (phi), exactly 0 when any marginal is empty
    pub fn matthews(&self) -> f64 {
        let tp = self.true_positives as f64;
        let tn = self.true_negatives as f64;
        let fp = self.false_positives as f64;
        let fn_ = self.false_negatives as f64;

        let denominator = (tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_);
        if denominator == 0.0 {
            return 0.0;
        }
        ((tp * tn) - (fp * fn_)) / denominator.sqrt()
    }

    pub fn metrics(&self) -> ConfusionMetrics {
        ConfusionMetrics {
            accuracy: self.accuracy(),
            precision: self.precision(),
            recall: self.recall(),
            matthews: self.matthews(),
        }
    }
}

/// Metrics derived from one confusion matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub matthews: f64,
}

/// Accuracy, precision, recall and Matthews correlation of one prediction
pub fn confusion_metrics(y_true: &[bool], y_pred: &[bool]) -> ConfusionMetrics {
    ConfusionCounts::from_predictions(y_true, y_pred).metrics()
}

/// Points of a ROC curve, ordered by decreasing threshold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub thresholds: Vec<f64>,
}

impl RocCurve {
    /// A curve is undefined when its first rate is NaN, which happens for single-class input
    pub fn is_degenerate(&self) -> bool {
        self.fpr.first().is_none_or(|v| v.is_nan()) || self.tpr.first().is_none_or(|v| v.is_nan())
    }

    /// `(fpr, tpr)` pairs as consumed by curve renderers
    pub fn pairs(&self) -> Vec<(f64, f64)> {
        self.fpr.iter().copied().zip(self.tpr.iter().copied()).collect()
    }
}

/// Sweep all distinct score thresholds from high to low.
///
/// The curve starts at `(0, 0)` with an infinite threshold. Rates are plain ratios, so a
/// test set without negatives yields NaN false positive rates (and without positives NaN
/// true positive rates), the same way any 0/0 division does.
pub fn roc_points(y_true: &[bool], positive_scores: &[f64]) -> RocCurve {
    let mut order: Vec<usize> = (0..positive_scores.len().min(y_true.len())).collect();
    order.sort_by(|&a, &b| positive_scores[b].total_cmp(&positive_scores[a]));

    let total_pos = order.iter().filter(|&&i| y_true[i]).count() as f64;
    let total_neg = order.len() as f64 - total_pos;

    let mut curve = RocCurve {
        fpr: vec![0.0 / total_neg],
        tpr: vec![0.0 / total_pos],
        thresholds: vec![f64::INFINITY],
    };

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut i = 0;
    while i < order.len() {
        let threshold = positive_scores[order[i]];
        while i < order.len() && positive_scores[order[i]] == threshold {
            if y_true[order[i]] {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        curve.fpr.push(fp as f64 / total_neg);
        curve.tpr.push(tp as f64 / total_pos);
        curve.thresholds.push(threshold);
    }

    curve
}

/// Area under a curve by trapezoidal integration
pub fn auc(fpr: &[f64], tpr: &[f64]) -> f64 {
    fpr.windows(2)
        .zip(tpr.windows(2))
        .map(|(x, y)| (x[1] - x[0]).abs() * (y[1] + y[0]) / 2.0)
        .sum()
}

/// AUC of one split, or [`ValidationError::DegenerateSplit`] when the ROC curve is undefined
pub fn split_auc(curve: &RocCurve) -> Result<f64> {
    if curve.is_degenerate() {
        return Err(ValidationError::DegenerateSplit);
    }
    Ok(auc(&curve.fpr, &curve.tpr))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}
