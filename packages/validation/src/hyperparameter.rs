//! Regularization strength selection
//!
//! The search runs a stratified k-fold cross-validation over a fixed grid of C values. Every
//! class that gets its own one-vs-rest problem produces one best value; when several values
//! come out, the majority-class C selection policy decides (see [`pick_by_majority_class`]).

use crate::classifier::{DEFAULT_TOLERANCE, fit_logistic};
use crate::error::{Result, ValidationError};
use crate::metrics::mean;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of candidate values in the default grid
pub const DEFAULT_GRID_SIZE: usize = 10;
/// Number of cross-validation folds used by the search
pub const DEFAULT_FOLDS: usize = 3;

/// Inverse L2 regularization strength; smaller values regularize harder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameter {
    pub c: f64,
}

impl Hyperparameter {
    /// Penalty weight of the fitting backend
    pub fn alpha(&self) -> f64 {
        1.0 / self.c
    }
}

/// Selects a regularization strength for a training set
pub trait HyperparameterSearch {
    fn search(&self, records: &Array2<f64>, targets: &Array1<usize>) -> Result<Hyperparameter>;
}

/// `n` values spaced evenly on a log scale between `10^start` and `10^stop`
pub fn log_space(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![10f64.powf(start)],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| 10f64.powf(start + step * i as f64))
                .collect()
        }
    }
}

/// Validation indices of each fold.
///
/// Samples of every class are dealt round-robin over the folds in their current order, so
/// each fold keeps roughly the class proportions of the whole set.
pub fn stratified_folds(targets: &[usize], k: usize) -> Vec<Vec<usize>> {
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &label) in targets.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let mut folds = vec![Vec::new(); k];
    let mut next = 0;
    for indices in by_class.values() {
        for &i in indices {
            folds[next % k].push(i);
            next += 1;
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    folds
}

/// Training indices that complement one validation fold
pub fn complement(n_samples: usize, validation: &[usize]) -> Vec<usize> {
    let mut in_validation = vec![false; n_samples];
    for &i in validation {
        in_validation[i] = true;
    }
    (0..n_samples).filter(|&i| !in_validation[i]).collect()
}

/// Majority-class C selection.
///
/// Given the best value per class, return the value of the class with the most samples.
/// Ties between equally large classes go to the smallest label.
pub fn pick_by_majority_class(
    candidates: &[(usize, f64)],
    class_counts: &BTreeMap<usize, usize>,
) -> Option<f64> {
    let mut majority: Option<(usize, usize)> = None;
    for (&class, &count) in class_counts {
        if majority.is_none_or(|(_, best)| count > best) {
            majority = Some((class, count));
        }
    }
    let (class, _) = majority?;
    candidates
        .iter()
        .find(|(candidate_class, _)| *candidate_class == class)
        .map(|&(_, c)| c)
}

/// Grid search with stratified k-fold cross-validation and accuracy scoring
#[derive(Debug, Clone)]
pub struct CrossValidatedSearch {
    grid: Vec<f64>,
    folds: usize,
    tolerance: f64,
}

impl Default for CrossValidatedSearch {
    fn default() -> Self {
        CrossValidatedSearch {
            grid: log_space(-4.0, 4.0, DEFAULT_GRID_SIZE),
            folds: DEFAULT_FOLDS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl CrossValidatedSearch {
    pub fn new(grid: Vec<f64>, folds: usize) -> Self {
        CrossValidatedSearch {
            grid,
            folds,
            ..Default::default()
        }
    }

    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    /// Best grid value for the one-vs-rest problem of `class`, with its mean fold accuracy
    fn best_for_class(
        &self,
        records: &Array2<f64>,
        targets: &Array1<usize>,
        class: usize,
        folds: &[Vec<usize>],
    ) -> Result<(f64, f64)> {
        let binary: Array1<usize> = targets.mapv(|l| usize::from(l == class));
        let mut best: Option<(f64, f64)> = None;

        for &c in &self.grid {
            let mut fold_scores = Vec::with_capacity(folds.len());
            for validation in folds {
                let train = complement(targets.len(), validation);
                let train_targets: Array1<usize> = train.iter().map(|&i| binary[i]).collect();
                let model = fit_logistic(
                    &records.select(Axis(0), &train),
                    &train_targets,
                    Hyperparameter { c },
                    self.tolerance,
                )?;
                let val_targets: Array1<usize> = validation.iter().map(|&i| binary[i]).collect();
                fold_scores.push(model.accuracy(&records.select(Axis(0), validation), &val_targets)?);
            }

            let score = mean(&fold_scores).unwrap_or(0.0);
            tracing::debug!(class, c, score, "cross-validated candidate");
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((c, score));
            }
        }

        best.ok_or_else(|| ValidationError::Training("empty regularization grid".to_string()))
    }
}

impl HyperparameterSearch for CrossValidatedSearch {
    fn search(&self, records: &Array2<f64>, targets: &Array1<usize>) -> Result<Hyperparameter> {
        let mut class_counts: BTreeMap<usize, usize> = BTreeMap::new();
        for &label in targets {
            *class_counts.entry(label).or_default() += 1;
        }
        if class_counts.len() < 2 {
            return Err(ValidationError::Training(
                "hyperparameter search needs samples of at least two classes".to_string(),
            ));
        }
        if self.folds < 2 || targets.len() < self.folds {
            return Err(ValidationError::Training(format!(
                "cannot run {}-fold cross-validation on {} samples",
                self.folds,
                targets.len()
            )));
        }

        // A binary problem is a single one-vs-rest problem for the larger label.
        let classes: Vec<usize> = class_counts.keys().copied().collect();
        let problems = if classes.len() == 2 {
            &classes[1..]
        } else {
            &classes[..]
        };

        let labels = targets.to_vec();
        let folds = stratified_folds(&labels, self.folds);
        let mut candidates = Vec::with_capacity(problems.len());
        for &class in problems {
            let (c, score) = self.best_for_class(records, targets, class, &folds)?;
            tracing::debug!(class, c, score, "best regularization for class");
            candidates.push((class, c));
        }

        let c = match candidates.as_slice() {
            [(_, c)] => *c,
            _ => {
                let c = pick_by_majority_class(&candidates, &class_counts).ok_or_else(|| {
                    ValidationError::Training("no regularization candidate for the majority class".to_string())
                })?;
                tracing::info!(
                    ?candidates,
                    selected = c,
                    "Selected C of the class with the most samples"
                );
                c
            }
        };

        Ok(Hyperparameter { c })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_log_space() {
        let grid = log_space(-4.0, 4.0, DEFAULT_GRID_SIZE);
        assert_eq!(grid.len(), 10);
        assert!((grid[0] - 1e-4).abs() < 1e-12);
        assert!((grid[9] - 1e4).abs() < 1e-6);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(log_space(0.0, 1.0, 1), vec![1.0]);
        assert!(log_space(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_stratified_folds_cover_every_sample_once() {
        let targets = [0, 1, 0, 1, 1, 0, 0, 0, 1, 0];
        let folds = stratified_folds(&targets, 3);
        assert_eq!(folds.len(), 3);

        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        // Four positives over three folds: every fold gets at least one.
        for fold in &folds {
            assert!(fold.iter().any(|&i| targets[i] == 1));
        }
    }

    #[test]
    fn test_complement() {
        assert_eq!(complement(5, &[1, 3]), vec![0, 2, 4]);
        assert_eq!(complement(2, &[]), vec![0, 1]);
    }

    #[test]
    fn test_majority_class_pick() {
        let candidates = [(0, 0.01), (1, 100.0), (2, 1.0)];
        let counts = BTreeMap::from([(0, 10), (1, 40), (2, 25)]);
        assert_eq!(pick_by_majority_class(&candidates, &counts), Some(100.0));
    }

    #[test]
    fn test_majority_class_pick_ignores_scores() {
        // The smallest class has the "best" value; it is still not chosen.
        let candidates = [(0, 0.5), (1, 7.0)];
        let counts = BTreeMap::from([(0, 3), (1, 2)]);
        assert_eq!(pick_by_majority_class(&candidates, &counts), Some(0.5));
    }

    #[test]
    fn test_majority_class_pick_tie_goes_to_first_class() {
        let candidates = [(0, 0.5), (1, 7.0)];
        let counts = BTreeMap::from([(0, 4), (1, 4)]);
        assert_eq!(pick_by_majority_class(&candidates, &counts), Some(0.5));
    }

    #[test]
    fn test_majority_class_pick_missing_candidate() {
        let candidates = [(0, 0.5)];
        let counts = BTreeMap::from([(0, 1), (1, 9)]);
        assert_eq!(pick_by_majority_class(&candidates, &counts), None);
        assert_eq!(pick_by_majority_class(&candidates, &BTreeMap::new()), None);
    }

    #[test]
    fn test_search_picks_grid_value() {
        let records = array![
            [2.0, 2.1],
            [2.5, 1.8],
            [1.9, 2.4],
            [2.2, 2.0],
            [2.8, 2.6],
            [3.0, 1.5],
            [-2.0, -2.1],
            [-2.4, -1.9],
            [-1.8, -2.3],
            [-2.1, -2.0],
            [-2.7, -2.2],
            [-3.1, -1.6]
        ];
        let targets = array![1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0];
        let search = CrossValidatedSearch::default();
        let selected = search.search(&records, &targets).unwrap();
        assert!(search.grid().contains(&selected.c));
    }

    #[test]
    fn test_search_rejects_single_class() {
        let records = array![[1.0], [2.0], [3.0]];
        let targets = array![0, 0, 0];
        assert!(CrossValidatedSearch::default().search(&records, &targets).is_err());
    }
}
