use model_validation::settings::{DEFAULT_ACCEPTED_DEVIATION, DEFAULT_MIN_SCORE, DEFAULT_TEST_RUNS};
use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    /// Model directory holding `classifier/` and `logs/`
    pub directory: Option<PathBuf>,
    pub min_score: f64,
    pub accepted_deviation: f64,
    pub test_runs: usize,
    /// Write the learning curve and ROC series into the run directory
    pub log_into_file: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            directory: env::var("MODEL_VALIDATION_DIR").ok().map(PathBuf::from),
            min_score: env::var("MODEL_VALIDATION_MIN_SCORE")
                .map(|v| v.parse::<f64>())
                .unwrap_or(Ok(DEFAULT_MIN_SCORE))
                .map_err(|_| ConfigError::InvalidValue("MODEL_VALIDATION_MIN_SCORE".to_string()))?,
            accepted_deviation: env::var("MODEL_VALIDATION_ACCEPTED_DEVIATION")
                .map(|v| v.parse::<f64>())
                .unwrap_or(Ok(DEFAULT_ACCEPTED_DEVIATION))
                .map_err(|_| {
                    ConfigError::InvalidValue("MODEL_VALIDATION_ACCEPTED_DEVIATION".to_string())
                })?,
            test_runs: env::var("MODEL_VALIDATION_TEST_RUNS")
                .map(|v| v.parse::<usize>())
                .unwrap_or(Ok(DEFAULT_TEST_RUNS))
                .map_err(|_| ConfigError::InvalidValue("MODEL_VALIDATION_TEST_RUNS".to_string()))?,
            log_into_file: env::var("MODEL_VALIDATION_LOG_INTO_FILE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(var) => write!(f, "Invalid value for: {}", var),
        }
    }
}

impl std::error::Error for ConfigError {}
