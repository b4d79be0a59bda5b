use crate::classifier::DEFAULT_TOLERANCE;
use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_SCORE: f64 = 0.6;
pub const DEFAULT_ACCEPTED_DEVIATION: f64 = 0.02;
pub const DEFAULT_TEST_RUNS: usize = 100;
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Thresholds and knobs of an [`EvaluationHarness`](crate::harness::EvaluationHarness)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSettings {
    /// Lowest acceptable `(mcc + 1) / 2`
    pub min_score: f64,
    /// Highest acceptable population std of the per-split AUCs
    pub accepted_deviation: f64,
    /// Number of random train/test splits
    pub n_runs: usize,
    /// Fraction of the samples held out on every split
    pub test_size: f64,
    /// Convergence tolerance for every fit
    pub tolerance: f64,
    /// Compute the learning curve and write curve series into the run directory
    pub log_into_file: bool,
    /// Fixed seed for shuffling and splitting; drawn from the OS when `None`
    pub seed: Option<u64>,
    /// Fixed run id; seconds since the Unix epoch when `None`
    pub run_id: Option<i64>,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        EvaluationSettings {
            min_score: DEFAULT_MIN_SCORE,
            accepted_deviation: DEFAULT_ACCEPTED_DEVIATION,
            n_runs: DEFAULT_TEST_RUNS,
            test_size: DEFAULT_TEST_SIZE,
            tolerance: DEFAULT_TOLERANCE,
            log_into_file: false,
            seed: None,
            run_id: None,
        }
    }
}

impl EvaluationSettings {
    pub fn validate(&self) -> Result<()> {
        if self.n_runs == 0 {
            return Err(ValidationError::InvalidSettings(
                "at least one test run is required".to_string(),
            ));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ValidationError::InvalidSettings(format!(
                "test size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if !(self.tolerance > 0.0) {
            return Err(ValidationError::InvalidSettings(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.accepted_deviation.is_nan() || self.accepted_deviation < 0.0 {
            return Err(ValidationError::InvalidSettings(format!(
                "accepted deviation must not be negative, got {}",
                self.accepted_deviation
            )));
        }
        if self.min_score.is_nan() {
            return Err(ValidationError::InvalidSettings(
                "minimum score must be a number".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = EvaluationSettings::default();
        assert_eq!(settings.min_score, 0.6);
        assert_eq!(settings.accepted_deviation, 0.02);
        assert_eq!(settings.n_runs, 100);
        assert_eq!(settings.test_size, 0.2);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_runs_rejected() {
        let settings = EvaluationSettings {
            n_runs: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ValidationError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_test_size_bounds() {
        for test_size in [0.0, 1.0, -0.5, f64::NAN] {
            let settings = EvaluationSettings {
                test_size,
                ..Default::default()
            };
            assert!(settings.validate().is_err(), "{test_size} accepted");
        }
    }
}
