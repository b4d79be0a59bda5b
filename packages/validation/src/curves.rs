//! Collectors for the curve series produced during an evaluation
//!
//! Rendering is left to whoever consumes the series. The harness only hands over numbers:
//! one `(fpr, tpr)` series per non-degenerate split and, optionally, one learning curve.

use crate::error::Result;
use crate::learning_curve::LearningCurve;
use crate::metrics::RocCurve;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const ROC_CURVE_FILENAME: &str = "roc-curve.json";
pub const LEARNING_CURVE_FILENAME: &str = "learning-curve.json";

/// One ROC series with its legend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// Receives curve series while an evaluation runs
pub trait CurveSink {
    fn add_roc(&mut self, curve: &RocCurve, label: &str);

    fn add_learning_curve(&mut self, curve: &LearningCurve);

    /// Called once after the last split; returns where the series ended up, if anywhere
    fn store(&mut self) -> Result<Option<PathBuf>>;
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCurves;

impl CurveSink for NoCurves {
    fn add_roc(&mut self, _curve: &RocCurve, _label: &str) {}

    fn add_learning_curve(&mut self, _curve: &LearningCurve) {}

    fn store(&mut self) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Keeps all series in memory
#[derive(Debug, Default, Clone)]
pub struct CurveRecorder {
    pub roc: Vec<RocSeries>,
    pub learning_curve: Option<LearningCurve>,
}

impl CurveSink for CurveRecorder {
    fn add_roc(&mut self, curve: &RocCurve, label: &str) {
        self.roc.push(RocSeries {
            label: label.to_string(),
            points: curve.pairs(),
        });
    }

    fn add_learning_curve(&mut self, curve: &LearningCurve) {
        self.learning_curve = Some(curve.clone());
    }

    fn store(&mut self) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Shared handle, so the caller can read the series after handing the sink over
impl<T: CurveSink> CurveSink for Rc<RefCell<T>> {
    fn add_roc(&mut self, curve: &RocCurve, label: &str) {
        self.borrow_mut().add_roc(curve, label);
    }

    fn add_learning_curve(&mut self, curve: &LearningCurve) {
        self.borrow_mut().add_learning_curve(curve);
    }

    fn store(&mut self) -> Result<Option<PathBuf>> {
        self.borrow_mut().store()
    }
}

/// Writes the raw series as JSON files into a run directory
#[derive(Debug)]
pub struct JsonCurveStore {
    dir: PathBuf,
    recorded: CurveRecorder,
}

impl JsonCurveStore {
    pub fn new(dir: &Path) -> Self {
        JsonCurveStore {
            dir: dir.to_path_buf(),
            recorded: CurveRecorder::default(),
        }
    }
}

impl CurveSink for JsonCurveStore {
    fn add_roc(&mut self, curve: &RocCurve, label: &str) {
        self.recorded.add_roc(curve, label);
    }

    fn add_learning_curve(&mut self, curve: &LearningCurve) {
        self.recorded.add_learning_curve(curve);
        let path = self.dir.join(LEARNING_CURVE_FILENAME);
        let written = serde_json::to_vec_pretty(curve)
            .map_err(std::io::Error::other)
            .and_then(|bytes| fs::write(&path, bytes));
        match written {
            Ok(()) => tracing::info!("Learning curve stored in {}", path.display()),
            Err(e) => tracing::warn!(error = %e, "Could not store the learning curve"),
        }
    }

    fn store(&mut self) -> Result<Option<PathBuf>> {
        let path = self.dir.join(ROC_CURVE_FILENAME);
        fs::write(&path, serde_json::to_vec_pretty(&self.recorded.roc)?)?;
        Ok(Some(path))
    }
}
