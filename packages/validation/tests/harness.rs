use model_validation::curves::{CurveRecorder, ROC_CURVE_FILENAME};
use model_validation::hyperparameter::{Hyperparameter, HyperparameterSearch};
use model_validation::persistence::ModelStore;
use model_validation::report::{NO_MODEL_MESSAGE, codes};
use model_validation::{
    ClassifierArtifact, EvaluationHarness, EvaluationSettings, LabelledSamples, Result,
    ValidationError, VerdictStatus,
};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// Returns a fixed C and counts how often it was asked
#[derive(Debug, Clone, Default)]
struct CountingSearch {
    calls: Rc<Cell<usize>>,
}

impl HyperparameterSearch for CountingSearch {
    fn search(&self, _records: &Array2<f64>, _targets: &Array1<usize>) -> Result<Hyperparameter> {
        self.calls.set(self.calls.get() + 1);
        Ok(Hyperparameter { c: 1.0 })
    }
}

/// Two well separated clusters around (+5, +5) and (-5, -5)
fn clusters(positives: usize, negatives: usize, seed: u64) -> (Array2<f64>, Array1<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = positives + negatives;
    let mut records = Array2::zeros((n, 2));
    let mut targets = Array1::zeros(n);
    for i in 0..n {
        let (centre, label) = if i < positives { (5.0, 1) } else { (-5.0, 0) };
        records[[i, 0]] = centre + rng.random_range(-1.0..1.0);
        records[[i, 1]] = centre + rng.random_range(-1.0..1.0);
        targets[i] = label;
    }
    (records, targets)
}

fn write_labelled(dir: &Path, records: &Array2<f64>, targets: &Array1<usize>) -> PathBuf {
    let mut contents = format!(
        "nsamples,{}\nnfeatures,{}\ntargettype,binary\n",
        targets.len(),
        records.ncols()
    );
    for (row, label) in records.rows().into_iter().zip(targets.iter()) {
        for value in row {
            contents.push_str(&format!("{value},"));
        }
        contents.push_str(&format!("{label}\n"));
    }
    let path = dir.join("labelled.csv");
    fs::write(&path, contents).unwrap();
    path
}

fn write_unlabelled(dir: &Path, rows: &[(i64, [f64; 2])]) -> PathBuf {
    let mut contents = String::from("nsamples,2\nnfeatures,2\ntargettype,binary\n");
    for (id, features) in rows {
        contents.push_str(&format!("{id},{},{}\n", features[0], features[1]));
    }
    let path = dir.join("unlabelled.csv");
    fs::write(&path, contents).unwrap();
    path
}

fn settings(n_runs: usize) -> EvaluationSettings {
    EvaluationSettings {
        n_runs,
        seed: Some(7),
        run_id: Some(1_700_000_000),
        ..Default::default()
    }
}

fn counting_harness(dir: &Path, n_runs: usize) -> (EvaluationHarness<CountingSearch>, Rc<Cell<usize>>) {
    let search = CountingSearch::default();
    let calls = Rc::clone(&search.calls);
    let harness = EvaluationHarness::with_search(dir, settings(n_runs), search).unwrap();
    (harness, calls)
}

#[test]
fn test_separable_data_is_accepted() {
    let tmp = TempDir::new().unwrap();
    let (records, targets) = clusters(30, 30, 1);
    let path = write_labelled(tmp.path(), &records, &targets);

    let (mut harness, _) = counting_harness(tmp.path(), 10);
    let report = harness.evaluate_dataset(&path).unwrap();

    assert_eq!(report.verdict.status, VerdictStatus::Ok);
    assert!(report.verdict.errors.is_empty());
    assert_eq!(report.verdict.score, 1.0);
    assert_eq!(report.verdict.auc, Some(1.0));
    assert_eq!(report.verdict.runid, 1_700_000_000);
    assert_eq!(report.accumulators.runs(), 10);
}

#[test]
fn test_hyperparameter_is_selected_once() {
    let tmp = TempDir::new().unwrap();
    let (records, targets) = clusters(20, 20, 2);
    let samples = LabelledSamples::new(records, targets).unwrap();

    let (mut harness, calls) = counting_harness(tmp.path(), 5);
    harness.evaluate_samples(&samples).unwrap();
    harness.evaluate_samples(&samples).unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(harness.trainer().hyperparameter(), Some(Hyperparameter { c: 1.0 }));
}

#[test]
fn test_accumulators_are_fresh_per_evaluation() {
    let tmp = TempDir::new().unwrap();
    let (records, targets) = clusters(20, 20, 3);
    let samples = LabelledSamples::new(records, targets).unwrap();

    let (mut harness, _) = counting_harness(tmp.path(), 4);
    let first = harness.evaluate_samples(&samples).unwrap();
    let second = harness.evaluate_samples(&samples).unwrap();
    assert_eq!(first.accumulators.runs(), 4);
    assert_eq!(second.accumulators.runs(), 4);
}

#[test]
fn test_degenerate_splits_skip_auc_only() {
    let tmp = TempDir::new().unwrap();
    // 4 test rows per split; 5 positives keep every training split two-class.
    let (records, targets) = clusters(5, 15, 4);
    let samples = LabelledSamples::new(records, targets).unwrap();
    let n_runs = 30;

    let recorder = Rc::new(RefCell::new(CurveRecorder::default()));
    let (harness, _) = counting_harness(tmp.path(), n_runs);
    let mut harness = harness.with_curve_sink(Box::new(Rc::clone(&recorder)));
    let report = harness.evaluate_samples(&samples).unwrap();
    let acc = &report.accumulators;

    assert_eq!(acc.accuracies.len(), n_runs);
    assert_eq!(acc.precisions.len(), n_runs);
    assert_eq!(acc.recalls.len(), n_runs);
    assert_eq!(acc.matthews.len(), n_runs);
    assert!(acc.aucs.len() < n_runs);
    assert!(acc.skipped_aucs() > 0);
    assert_eq!(recorder.borrow().roc.len(), acc.aucs.len());
    assert!(recorder.borrow().roc.iter().all(|series| series.label == "Positives"));
}

#[test]
fn test_single_class_training_split_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let (records, _) = clusters(0, 10, 5);
    let samples = LabelledSamples::new(records, Array1::zeros(10)).unwrap();

    let (mut harness, _) = counting_harness(tmp.path(), 3);
    assert!(matches!(
        harness.evaluate_samples(&samples),
        Err(ValidationError::Training(_))
    ));
}

#[test]
fn test_train_then_predict() {
    let tmp = TempDir::new().unwrap();
    let (records, targets) = clusters(30, 30, 6);
    let labelled = write_labelled(tmp.path(), &records, &targets);
    let unlabelled = write_unlabelled(tmp.path(), &[(11, [5.0, 5.0]), (12, [-5.0, -5.0])]);

    let mut harness = EvaluationHarness::new(tmp.path(), settings(1)).unwrap();
    let trained = harness.train_dataset(&labelled).unwrap();
    assert_eq!(trained.status, codes::OK);
    assert!(trained.errors.is_empty());
    assert!(harness.store().exists());
    assert!(harness.trainer().hyperparameter().is_some());

    let predicted = harness.predict_dataset(&unlabelled).unwrap();
    assert_eq!(predicted.status, codes::OK);
    assert_eq!(predicted.predictions.len(), 2);
    let (id, label, confidence) = predicted.predictions[0];
    assert_eq!((id, label), (11, 1));
    assert!(confidence > 0.5 && confidence <= 1.0);
    let (id, label, confidence) = predicted.predictions[1];
    assert_eq!((id, label), (12, 0));
    assert!(confidence > 0.5 && confidence <= 1.0);
}

#[test]
fn test_predict_without_model() {
    let tmp = TempDir::new().unwrap();
    let unlabelled = write_unlabelled(tmp.path(), &[(1, [0.0, 0.0])]);

    let mut harness = EvaluationHarness::new(tmp.path(), settings(1)).unwrap();
    let payload = harness.predict_dataset(&unlabelled).unwrap();
    assert_eq!(payload.status, codes::NO_DATASET);
    assert_eq!(payload.errors, vec![NO_MODEL_MESSAGE.to_string()]);
    assert!(payload.predictions.is_empty());
}

#[test]
fn test_training_reuses_stored_configuration() {
    let tmp = TempDir::new().unwrap();
    let store = ModelStore::open(tmp.path()).unwrap();
    store
        .save(&ClassifierArtifact {
            hyperparameter: Hyperparameter { c: 0.5 },
            tolerance: 0.05,
            coefficients: vec![0.0, 0.0],
            intercept: 0.0,
            scored_class: 1,
        })
        .unwrap();

    let (records, targets) = clusters(15, 15, 8);
    let labelled = write_labelled(tmp.path(), &records, &targets);
    let (mut harness, calls) = counting_harness(tmp.path(), 1);
    harness.train_dataset(&labelled).unwrap();

    assert_eq!(calls.get(), 0);
    let stored = store.load().unwrap().unwrap();
    assert_eq!(stored.hyperparameter, Hyperparameter { c: 0.5 });
    assert_eq!(stored.tolerance, 0.05);
    assert_ne!(stored.coefficients, vec![0.0, 0.0]);
}

#[test]
fn test_store_model_after_evaluation() {
    let tmp = TempDir::new().unwrap();
    let (records, targets) = clusters(20, 20, 9);
    let path = write_labelled(tmp.path(), &records, &targets);

    let (mut harness, _) = counting_harness(tmp.path(), 2);
    assert!(harness.store_model().is_err());
    harness.evaluate_dataset(&path).unwrap();
    let stored = harness.store_model().unwrap();
    assert!(stored.is_file());
    assert_eq!(harness.store().load().unwrap().unwrap().n_features(), 2);
}

#[test]
fn test_run_directory_collision() {
    let tmp = TempDir::new().unwrap();
    let (first, _) = counting_harness(tmp.path(), 1);
    assert!(first.run_dir().is_dir());
    assert!(first.run_dir().ends_with("logs/1700000000"));

    let second = EvaluationHarness::with_search(tmp.path(), settings(1), CountingSearch::default());
    assert!(matches!(second, Err(ValidationError::StorageFault { .. })));
}

#[test]
fn test_invalid_settings() {
    let tmp = TempDir::new().unwrap();
    let result = EvaluationHarness::with_search(
        tmp.path(),
        EvaluationSettings {
            n_runs: 0,
            ..settings(1)
        },
        CountingSearch::default(),
    );
    assert!(matches!(result, Err(ValidationError::InvalidSettings(_))));
}

#[test]
fn test_log_into_file_writes_curves() {
    let tmp = TempDir::new().unwrap();
    let (records, targets) = clusters(30, 30, 10);
    let path = write_labelled(tmp.path(), &records, &targets);

    let search = CountingSearch::default();
    let calls = Rc::clone(&search.calls);
    let mut harness = EvaluationHarness::with_search(
        tmp.path(),
        EvaluationSettings {
            log_into_file: true,
            ..settings(3)
        },
        search,
    )
    .unwrap();
    harness.evaluate_dataset(&path).unwrap();

    assert_eq!(calls.get(), 1);
    assert!(harness.run_dir().join(ROC_CURVE_FILENAME).is_file());
}

