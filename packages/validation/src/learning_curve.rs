//! Learning curve diagnostic: training and cross-validation error by training set size

use crate::classifier::fit_logistic;
use crate::error::{Result, ValidationError};
use crate::hyperparameter::{Hyperparameter, complement, stratified_folds};
use crate::metrics::{mean, std_dev};
use crate::samples::LabelledSamples;
use serde::{Deserialize, Serialize};

/// Fractions of the largest fold training set that are evaluated
pub const DEFAULT_TRAIN_FRACTIONS: [f64; 5] = [0.1, 0.325, 0.55, 0.775, 1.0];

/// Per training size: mean error (1 - accuracy) and the standard deviation of the fold scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCurve {
    pub train_sizes: Vec<usize>,
    pub train_error_mean: Vec<f64>,
    pub train_error_std: Vec<f64>,
    pub test_error_mean: Vec<f64>,
    pub test_error_std: Vec<f64>,
}

/// Absolute training sizes for `fractions` of `n_max` samples, deduplicated and at least 1
pub fn train_sizes(fractions: &[f64], n_max: usize) -> Vec<usize> {
    let mut sizes: Vec<usize> = fractions
        .iter()
        .map(|f| ((f * n_max as f64) as usize).clamp(1, n_max.max(1)))
        .collect();
    sizes.dedup();
    sizes
}

/// Cross-validated learning curve of a logistic regression with fixed configuration.
///
/// Fails with [`ValidationError::LearningCurveUnavailable`] when any training chunk holds a
/// single class, which is common with few samples.
pub fn learning_curve(
    samples: &LabelledSamples,
    hyperparameter: Hyperparameter,
    tolerance: f64,
    folds: usize,
    fractions: &[f64],
) -> Result<LearningCurve> {
    let n = samples.n_samples();
    if folds < 2 || n < folds {
        return Err(ValidationError::LearningCurveUnavailable(format!(
            "{n} samples are not enough for {folds} folds"
        )));
    }

    let labels = samples.targets().to_vec();
    let splits: Vec<(Vec<usize>, Vec<usize>)> = stratified_folds(&labels, folds)
        .into_iter()
        .map(|validation| (complement(n, &validation), validation))
        .collect();
    let n_max = splits.iter().map(|(train, _)| train.len()).min().unwrap_or(0);
    let sizes = train_sizes(fractions, n_max);

    let mut curve = LearningCurve {
        train_sizes: sizes.clone(),
        train_error_mean: Vec::with_capacity(sizes.len()),
        train_error_std: Vec::with_capacity(sizes.len()),
        test_error_mean: Vec::with_capacity(sizes.len()),
        test_error_std: Vec::with_capacity(sizes.len()),
    };

    for &size in &sizes {
        let mut train_scores = Vec::with_capacity(splits.len());
        let mut test_scores = Vec::with_capacity(splits.len());

        for (train, validation) in &splits {
            let chunk = samples.select(&train[..size]);
            if chunk.class_counts().contains(&0) {
                return Err(ValidationError::LearningCurveUnavailable(format!(
                    "a training chunk of {size} samples contains a single class"
                )));
            }
            let held_out = samples.select(validation);

            let model = fit_logistic(chunk.records(), chunk.targets(), hyperparameter, tolerance)?;
            train_scores.push(model.accuracy(chunk.records(), chunk.targets())?);
            test_scores.push(model.accuracy(held_out.records(), held_out.targets())?);
        }

        curve.train_error_mean.push(1.0 - mean(&train_scores).unwrap_or(0.0));
        curve.train_error_std.push(std_dev(&train_scores).unwrap_or(0.0));
        curve.test_error_mean.push(1.0 - mean(&test_scores).unwrap_or(0.0));
        curve.test_error_std.push(std_dev(&test_scores).unwrap_or(0.0));
    }

    Ok(curve)
}
