//! Training, prediction and repeated-resampling evaluation of one model directory

use crate::classifier::{ClassifierArtifact, ClassifierTrainer};
use crate::curves::{CurveSink, JsonCurveStore, NoCurves};
use crate::error::{Result, ValidationError};
use crate::hyperparameter::{CrossValidatedSearch, DEFAULT_FOLDS, HyperparameterSearch};
use crate::learning_curve::{DEFAULT_TRAIN_FRACTIONS, learning_curve};
use crate::metrics::{confusion_metrics, roc_points, split_auc};
use crate::persistence::{ModelStore, create_run_dir};
use crate::report::{EvaluationReport, Prediction, PredictionPayload, TrainingPayload};
use crate::samples::{
    LabelledSamples, NEGATIVE_CLASS, POSITIVE_CLASS, load_labelled, load_unlabelled,
};
use crate::settings::EvaluationSettings;
use crate::verdict::{RunAccumulators, Verdict};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};

/// Legend of the ROC series handed to the curve sink
pub const ROC_LEGEND: &str = "Positives";

pub const UNBALANCED_CLASSES_WARNING: &str =
    "Provided classes are very unbalanced, predictions may not be accurate.";

/// Warning when one class has more than three times the samples of the other
pub fn check_classes_balance(counts: &[usize]) -> Option<&'static str> {
    let unbalanced = counts
        .iter()
        .any(|&a| counts.iter().any(|&b| a > b.saturating_mul(3)));
    unbalanced.then_some(UNBALANCED_CLASSES_WARNING)
}

/// Evaluates and persists the classifier of one model directory.
///
/// The selected regularization strength is cached for the lifetime of the harness and shared
/// by every split of every evaluation.
pub struct EvaluationHarness<S: HyperparameterSearch = CrossValidatedSearch> {
    settings: EvaluationSettings,
    store: ModelStore,
    run_id: i64,
    run_dir: PathBuf,
    trainer: ClassifierTrainer<S>,
    curves: Box<dyn CurveSink>,
    rng: StdRng,
    samples: Option<LabelledSamples>,
}

impl EvaluationHarness<CrossValidatedSearch> {
    pub fn new(directory: &Path, settings: EvaluationSettings) -> Result<Self> {
        let search = CrossValidatedSearch::default();
        EvaluationHarness::with_search(directory, settings, search)
    }
}

impl<S: HyperparameterSearch> EvaluationHarness<S> {
    /// Prepare `<directory>/classifier` and a fresh `<directory>/logs/<runid>`
    pub fn with_search(directory: &Path, settings: EvaluationSettings, search: S) -> Result<Self> {
        settings.validate()?;

        let store = ModelStore::open(directory)?;
        let run_id = settings
            .run_id
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        let run_dir = create_run_dir(directory, &run_id.to_string())?;

        let curves: Box<dyn CurveSink> = if settings.log_into_file {
            Box::new(JsonCurveStore::new(&run_dir))
        } else {
            Box::new(NoCurves)
        };
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let trainer = ClassifierTrainer::new(search).with_tolerance(settings.tolerance);

        tracing::debug!(run_id, run_dir = %run_dir.display(), "Harness ready");

        Ok(EvaluationHarness {
            settings,
            store,
            run_id,
            run_dir,
            trainer,
            curves,
            rng,
            samples: None,
        })
    }

    /// Replace the sink that receives ROC and learning curve series
    pub fn with_curve_sink(mut self, curves: Box<dyn CurveSink>) -> Self {
        self.curves = curves;
        self
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn trainer(&self) -> &ClassifierTrainer<S> {
        &self.trainer
    }

    /// Samples of the last `train_dataset` or `evaluate_dataset` call
    pub fn samples(&self) -> Option<&LabelledSamples> {
        self.samples.as_ref()
    }

    /// Train on a labelled file, continuing from the persisted classifier when there is one
    pub fn train_dataset(&mut self, path: &Path) -> Result<TrainingPayload> {
        let samples = load_labelled(path, &mut self.rng)?;
        let existing = self.store.load()?;
        if existing.is_some() {
            tracing::info!("Refitting the stored classifier configuration");
        }

        let artifact = self.trainer.train(&samples, existing.as_ref())?;
        self.store.save(&artifact)?;
        self.samples = Some(samples);

        Ok(TrainingPayload::ok())
    }

    /// Predict every row of an unlabelled file with the persisted classifier
    pub fn predict_dataset(&mut self, path: &Path) -> Result<PredictionPayload> {
        let samples = load_unlabelled(path)?;
        let Some(artifact) = self.store.load()? else {
            return Ok(PredictionPayload::no_model());
        };

        let scores = artifact.positive_scores(samples.records())?;
        let predictions: Vec<Prediction> = samples
            .ids()
            .iter()
            .zip(scores.iter())
            .map(|(&id, &p)| {
                if p > 0.5 {
                    (id, POSITIVE_CLASS, p)
                } else {
                    (id, NEGATIVE_CLASS, 1.0 - p)
                }
            })
            .collect();

        Ok(PredictionPayload::ok(predictions))
    }

    pub fn evaluate_dataset(&mut self, path: &Path) -> Result<EvaluationReport> {
        let samples = load_labelled(path, &mut self.rng)?;
        let report = self.evaluate_samples(&samples);
        self.samples = Some(samples);
        report
    }

    /// Run `n_runs` random splits over `samples` and decide whether the classifier is valid
    pub fn evaluate_samples(&mut self, samples: &LabelledSamples) -> Result<EvaluationReport> {
        let [positives, negatives] = samples.class_counts();
        tracing::info!(
            positives,
            negatives,
            "Number of samples by y value: [{positives}, {negatives}]"
        );
        if let Some(warning) = check_classes_balance(&[positives, negatives]) {
            tracing::warn!("{warning}");
        }

        let mut accumulators = RunAccumulators::new();

        if self.settings.log_into_file {
            self.record_learning_curve(samples)?;
        }

        for run in 0..self.settings.n_runs {
            let (train, test) = samples.train_test_split(self.settings.test_size, &mut self.rng)?;
            let classifier = self.trainer.train(&train, None)?;
            self.rate_prediction(run, &classifier, &test, &mut accumulators)?;
        }

        if let Some(path) = self.curves.store()? {
            tracing::info!("ROC curves stored in {}", path.display());
        }

        let verdict = Verdict::decide(
            &accumulators,
            self.settings.min_score,
            self.settings.accepted_deviation,
            self.run_id,
        );

        tracing::info!("Accuracy: {:.2}%", verdict.accuracy * 100.0);
        tracing::info!(
            "Precision (predicted elements that are real): {:.2}%",
            verdict.precision * 100.0
        );
        tracing::info!(
            "Recall (real elements that are predicted): {:.2}%",
            verdict.recall * 100.0
        );
        tracing::info!("Score: {:.2}%", verdict.score * 100.0);
        match verdict.auc_deviation {
            Some(deviation) => tracing::info!("AUC standard deviation: {deviation:.4}"),
            None => tracing::info!("AUC standard deviation: undefined"),
        }

        Ok(EvaluationReport {
            verdict,
            accumulators,
        })
    }

    /// Retrain on all samples last loaded and persist the classifier
    pub fn store_model(&mut self) -> Result<PathBuf> {
        let samples = self.samples.as_ref().ok_or_else(|| {
            ValidationError::Persistence("no samples have been loaded yet".to_string())
        })?;
        let artifact = self.trainer.train(samples, None)?;
        self.store.save(&artifact)
    }

    fn rate_prediction(
        &mut self,
        run: usize,
        classifier: &ClassifierArtifact,
        test: &LabelledSamples,
        accumulators: &mut RunAccumulators,
    ) -> Result<()> {
        let scores = classifier.positive_scores(test.records())?;
        let predicted: Vec<bool> = scores.iter().map(|&p| p > 0.5).collect();
        let actual = test.positive_mask();

        accumulators.record_metrics(&confusion_metrics(&actual, &predicted));

        let curve = roc_points(&actual, &scores.to_vec());
        match split_auc(&curve) {
            Ok(auc) => {
                accumulators.record_auc(auc);
                self.curves.add_roc(&curve, ROC_LEGEND);
            }
            Err(ValidationError::DegenerateSplit) => {
                tracing::debug!(run, "Test split holds a single class, AUC skipped");
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn record_learning_curve(&mut self, samples: &LabelledSamples) -> Result<()> {
        let hyperparameter = self.trainer.select_hyperparameter(samples)?;
        let curve = learning_curve(
            samples,
            hyperparameter,
            self.trainer.tolerance(),
            DEFAULT_FOLDS,
            &DEFAULT_TRAIN_FRACTIONS,
        );
        match curve {
            Ok(curve) => self.curves.add_learning_curve(&curve),
            Err(e) if e.is_recoverable() => {
                tracing::info!(error = %e, "Learning curve generation skipped, not enough samples");
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_classes() {
        assert_eq!(check_classes_balance(&[10, 10]), None);
        assert_eq!(check_classes_balance(&[30, 10]), None);
        assert_eq!(check_classes_balance(&[10, 30]), None);
    }

    #[test]
    fn test_unbalanced_classes() {
        assert_eq!(
            check_classes_balance(&[31, 10]),
            Some(UNBALANCED_CLASSES_WARNING)
        );
        assert_eq!(
            check_classes_balance(&[10, 31]),
            Some(UNBALANCED_CLASSES_WARNING)
        );
        assert_eq!(check_classes_balance(&[1, 0]), Some(UNBALANCED_CLASSES_WARNING));
    }
}
