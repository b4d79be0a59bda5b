//! Sample loading and resampling
//!
//! Sample files are comma separated numeric text. The first [`METADATA_ROWS`] rows carry
//! metadata about the dataset and are skipped. Labelled files end every row with the label,
//! unlabelled files start every row with the sample id.
//!
//! Feature rows and their labels (or ids) are always moved together: every shuffle or split
//! selects the same row indices from both.

use crate::error::{Result, ValidationError};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::seq::SliceRandom;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of leading metadata rows in every samples file
pub const METADATA_ROWS: usize = 3;

/// Label value of the positive class
pub const POSITIVE_CLASS: usize = 1;
/// Label value of the negative class
pub const NEGATIVE_CLASS: usize = 0;

/// Feature matrix with one {0,1} label per row
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledSamples {
    records: Array2<f64>,
    targets: Array1<usize>,
}

/// Feature matrix with one opaque id per row
#[derive(Debug, Clone, PartialEq)]
pub struct UnlabelledSamples {
    ids: Array1<i64>,
    records: Array2<f64>,
}

impl LabelledSamples {
    pub fn new(records: Array2<f64>, targets: Array1<usize>) -> Result<Self> {
        if records.nrows() != targets.len() {
            return Err(ValidationError::Shape(format!(
                "{} feature rows but {} labels",
                records.nrows(),
                targets.len()
            )));
        }
        if let Some(label) = targets
            .iter()
            .find(|&&l| l != POSITIVE_CLASS && l != NEGATIVE_CLASS)
        {
            return Err(ValidationError::Shape(format!(
                "label {label} is outside of {{0, 1}}"
            )));
        }
        Ok(LabelledSamples { records, targets })
    }

    pub fn records(&self) -> &Array2<f64> {
        &self.records
    }

    pub fn targets(&self) -> &Array1<usize> {
        &self.targets
    }

    pub fn n_samples(&self) -> usize {
        self.targets.len()
    }

    pub fn n_features(&self) -> usize {
        self.records.ncols()
    }

    /// Number of samples per class as `[positives, negatives]`
    pub fn class_counts(&self) -> [usize; 2] {
        let positives = self
            .targets
            .iter()
            .filter(|&&l| l == POSITIVE_CLASS)
            .count();
        [positives, self.n_samples() - positives]
    }

    /// Ground truth as booleans, `true` for the positive class
    pub fn positive_mask(&self) -> Vec<bool> {
        self.targets.iter().map(|&l| l == POSITIVE_CLASS).collect()
    }

    /// Rows at `indices`, in that order, with their labels
    pub fn select(&self, indices: &[usize]) -> Self {
        LabelledSamples {
            records: self.records.select(Axis(0), indices),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }

    /// The same samples in a random order
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut indices: Vec<usize> = (0..self.n_samples()).collect();
        indices.shuffle(rng);
        self.select(&indices)
    }

    /// Random train/test partition; the test set receives `ceil(test_size * n)` rows.
    ///
    /// Every call draws a fresh permutation, so repeated splits are independent and may overlap.
    pub fn train_test_split<R: Rng + ?Sized>(
        &self,
        test_size: f64,
        rng: &mut R,
    ) -> Result<(Self, Self)> {
        let n = self.n_samples();
        let n_test = (test_size * n as f64).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(ValidationError::Shape(format!(
                "cannot split {n} samples with test size {test_size}"
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        let (test, train) = indices.split_at(n_test);
        Ok((self.select(train), self.select(test)))
    }
}

impl UnlabelledSamples {
    pub fn new(ids: Array1<i64>, records: Array2<f64>) -> Result<Self> {
        if records.nrows() != ids.len() {
            return Err(ValidationError::Shape(format!(
                "{} feature rows but {} ids",
                records.nrows(),
                ids.len()
            )));
        }
        Ok(UnlabelledSamples { ids, records })
    }

    pub fn ids(&self) -> &Array1<i64> {
        &self.ids
    }

    pub fn records(&self) -> &Array2<f64> {
        &self.records
    }

    pub fn n_samples(&self) -> usize {
        self.ids.len()
    }
}

/// Load a labelled samples file and shuffle it
pub fn load_labelled<R: Rng + ?Sized>(path: &Path, rng: &mut R) -> Result<LabelledSamples> {
    let file = File::open(path)?;
    let samples = read_labelled(file, path)?;
    Ok(samples.shuffled(rng))
}

/// Load an unlabelled samples file, keeping the file order
pub fn load_unlabelled(path: &Path) -> Result<UnlabelledSamples> {
    let file = File::open(path)?;
    read_unlabelled(file, path)
}

/// Parse labelled samples: all columns but the last are features, the last one is the label
pub fn read_labelled<R: Read>(reader: R, source: &Path) -> Result<LabelledSamples> {
    let (rows, cols) = read_matrix(reader, source)?;
    if cols < 2 {
        return Err(ValidationError::malformed_input(
            source,
            "labelled rows need at least one feature and a label",
        ));
    }

    let n_features = cols - 1;
    let mut flat = Vec::with_capacity(rows.len() * n_features);
    let mut targets = Vec::with_capacity(rows.len());
    for (r, row) in rows.iter().enumerate() {
        flat.extend_from_slice(&row[..n_features]);
        // Labels are truncated towards zero like any integer cast of the stored value.
        let label = row[n_features].trunc();
        if label != 0.0 && label != 1.0 {
            return Err(ValidationError::malformed_input(
                source,
                format!("row {r}: label {} is not 0 or 1", row[n_features]),
            ));
        }
        targets.push(label as usize);
    }

    let records = Array2::from_shape_vec((rows.len(), n_features), flat)
        .map_err(|e| ValidationError::malformed_input(source, e.to_string()))?;
    LabelledSamples::new(records, Array1::from(targets))
}

/// Parse unlabelled samples: the first column is the id, the rest are features
pub fn read_unlabelled<R: Read>(reader: R, source: &Path) -> Result<UnlabelledSamples> {
    let (rows, cols) = read_matrix(reader, source)?;
    if cols < 2 {
        return Err(ValidationError::malformed_input(
            source,
            "unlabelled rows need an id and at least one feature",
        ));
    }

    let n_features = cols - 1;
    let mut flat = Vec::with_capacity(rows.len() * n_features);
    let mut ids = Vec::with_capacity(rows.len());
    for row in &rows {
        ids.push(row[0].trunc() as i64);
        flat.extend_from_slice(&row[1..]);
    }

    let records = Array2::from_shape_vec((rows.len(), n_features), flat)
        .map_err(|e| ValidationError::malformed_input(source, e.to_string()))?;
    UnlabelledSamples::new(Array1::from(ids), records)
}

/// Read every data row as f64 values; returns the rows and the shared column count
fn read_matrix<R: Read>(reader: R, source: &Path) -> Result<(Vec<Vec<f64>>, usize)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut cols = None;
    for (r, record) in rdr.records().enumerate().skip(METADATA_ROWS) {
        let record = record.map_err(|e| ValidationError::malformed_input(source, e.to_string()))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let row = record
            .iter()
            .enumerate()
            .map(|(j, field)| {
                field.parse::<f64>().map_err(|_| {
                    ValidationError::malformed_input(
                        source,
                        format!("row {r}, col {j}: `{field}` is not a number"),
                    )
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        match cols {
            None => cols = Some(row.len()),
            Some(expected) if expected != row.len() => {
                return Err(ValidationError::malformed_input(
                    source,
                    format!(
                        "row {r}: inconsistent length (expected {expected}, got {})",
                        row.len()
                    ),
                ));
            }
            Some(_) => {}
        }
        rows.push(row);
    }

    match cols {
        Some(cols) => Ok((rows, cols)),
        None => Err(ValidationError::malformed_input(
            source,
            "file contains no samples after the metadata rows",
        )),
    }
}
