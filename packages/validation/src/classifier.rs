//! Logistic regression classifier and its trainer
//!
//! Fitting is delegated to [`linfa_logistic`]. The fitted decision function is copied into a
//! [`ClassifierArtifact`] so that persisted classifiers can be scored without the fitting
//! backend and without depending on its serialization format.

use crate::error::{Result, ValidationError};
use crate::hyperparameter::{CrossValidatedSearch, Hyperparameter, HyperparameterSearch};
use crate::samples::{LabelledSamples, NEGATIVE_CLASS, POSITIVE_CLASS};
use linfa::DatasetBase;
use linfa::traits::Fit;
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2, Zip};
use serde::{Deserialize, Serialize};

/// Loose convergence tolerance; the evaluation refits the model many times
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// A fitted binary logistic regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    /// Regularization strength the model was fitted with
    pub hyperparameter: Hyperparameter,
    /// Convergence tolerance the model was fitted with
    pub tolerance: f64,
    /// One weight per feature
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Label whose log-odds the decision function returns
    pub scored_class: usize,
}

impl ClassifierArtifact {
    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    /// Log-odds of `scored_class` for every row
    pub fn decision_function<D: Data<Elem = f64>>(
        &self,
        records: &ArrayBase<D, Ix2>,
    ) -> Result<Array1<f64>> {
        if records.ncols() != self.n_features() {
            return Err(ValidationError::Shape(format!(
                "classifier expects {} features, got {}",
                self.n_features(),
                records.ncols()
            )));
        }
        let weights = Array1::from(self.coefficients.clone());
        Ok(records.dot(&weights) + self.intercept)
    }

    /// Probability of the positive class (label 1) for every row
    pub fn positive_scores<D: Data<Elem = f64>>(
        &self,
        records: &ArrayBase<D, Ix2>,
    ) -> Result<Array1<f64>> {
        let scored = self.decision_function(records)?.mapv(sigmoid);
        if self.scored_class == POSITIVE_CLASS {
            Ok(scored)
        } else {
            Ok(scored.mapv(|p| 1.0 - p))
        }
    }

    /// Class probabilities, column 0 for label 0 and column 1 for label 1
    pub fn predict_proba<D: Data<Elem = f64>>(
        &self,
        records: &ArrayBase<D, Ix2>,
    ) -> Result<Array2<f64>> {
        let positive = self.positive_scores(records)?;
        let mut proba = Array2::zeros((positive.len(), 2));
        for (mut row, &p) in proba.rows_mut().into_iter().zip(positive.iter()) {
            row[NEGATIVE_CLASS] = 1.0 - p;
            row[POSITIVE_CLASS] = p;
        }
        Ok(proba)
    }

    /// Predicted label for every row
    pub fn predict<D: Data<Elem = f64>>(&self, records: &ArrayBase<D, Ix2>) -> Result<Array1<usize>> {
        Ok(self
            .positive_scores(records)?
            .mapv(|p| if p > 0.5 { POSITIVE_CLASS } else { NEGATIVE_CLASS }))
    }

    /// Fraction of rows whose prediction matches `targets`
    pub fn accuracy<D: Data<Elem = f64>>(
        &self,
        records: &ArrayBase<D, Ix2>,
        targets: &Array1<usize>,
    ) -> Result<f64> {
        if targets.is_empty() {
            return Ok(0.0);
        }
        let predictions = self.predict(records)?;
        let mut correct = 0usize;
        Zip::from(&predictions).and(targets).for_each(|p, t| {
            if p == t {
                correct += 1;
            }
        });
        Ok(correct as f64 / targets.len() as f64)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Fit an L2-regularised logistic regression on {0,1} targets
pub fn fit_logistic(
    records: &Array2<f64>,
    targets: &Array1<usize>,
    hyperparameter: Hyperparameter,
    tolerance: f64,
) -> Result<ClassifierArtifact> {
    let dataset = DatasetBase::from(records.clone()).with_targets(targets.clone());
    let model = LogisticRegression::default()
        .alpha(hyperparameter.alpha())
        .gradient_tolerance(tolerance)
        .fit(&dataset)
        .map_err(|e| ValidationError::Training(e.to_string()))?;

    Ok(ClassifierArtifact {
        hyperparameter,
        tolerance,
        coefficients: model.params().to_vec(),
        intercept: model.intercept(),
        scored_class: model.labels().pos.class,
    })
}

/// Fits classifiers with a regularization strength that is selected once and then reused
#[derive(Debug)]
pub struct ClassifierTrainer<S = CrossValidatedSearch> {
    search: S,
    tolerance: f64,
    hyperparameter: Option<Hyperparameter>,
}

impl Default for ClassifierTrainer<CrossValidatedSearch> {
    fn default() -> Self {
        ClassifierTrainer::new(CrossValidatedSearch::default())
    }
}

impl<S: HyperparameterSearch> ClassifierTrainer<S> {
    pub fn new(search: S) -> Self {
        ClassifierTrainer {
            search,
            tolerance: DEFAULT_TOLERANCE,
            hyperparameter: None,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn search(&self) -> &S {
        &self.search
    }

    /// The cached regularization strength, if one was selected already
    pub fn hyperparameter(&self) -> Option<Hyperparameter> {
        self.hyperparameter
    }

    /// Run the search on the first call only; later calls return the cached value
    pub fn select_hyperparameter(&mut self, samples: &LabelledSamples) -> Result<Hyperparameter> {
        if let Some(hyperparameter) = self.hyperparameter {
            return Ok(hyperparameter);
        }
        let hyperparameter = self.search.search(samples.records(), samples.targets())?;
        tracing::info!(c = hyperparameter.c, "Best C: {:.6}", hyperparameter.c);
        self.hyperparameter = Some(hyperparameter);
        Ok(hyperparameter)
    }

    /// Fit on all of `samples`.
    ///
    /// With an `existing` classifier its configuration is refitted on the new data and no
    /// hyperparameter search is requested.
    pub fn train(
        &mut self,
        samples: &LabelledSamples,
        existing: Option<&ClassifierArtifact>,
    ) -> Result<ClassifierArtifact> {
        let (hyperparameter, tolerance) = match existing {
            Some(artifact) => (artifact.hyperparameter, artifact.tolerance),
            None => (self.select_hyperparameter(samples)?, self.tolerance),
        };
        fit_logistic(samples.records(), samples.targets(), hyperparameter, tolerance)
    }
}
