//! Run configuration
//!
//! A [`RunConfig`] can be loaded from a JSON file; command-line flags are
//! applied on top by the CLI.

use crate::error::{Result, TrainerError};
use crate::preprocessing::PreprocessConfig;
use crate::training::{BoostingParams, CvConfig, EvalMetric};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "artifacts/lightgbm";

/// Everything one training run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// File or directory holding the dataset
    pub data_path: PathBuf,
    pub output_dir: PathBuf,
    pub n_splits: usize,
    /// Label column; detected when absent
    pub target_col: Option<String>,
    pub seed: u64,
    /// Replacement for missing feature values
    pub fill_value: f64,
    /// Searched when `data_path` cannot be resolved (`<cwd>/data/processed` if unset)
    pub fallback_dir: Option<PathBuf>,
    pub early_stopping_rounds: usize,
    pub eval_metric: EvalMetric,
    pub params: BoostingParams,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            n_splits: 5,
            target_col: None,
            seed: 42,
            fill_value: 0.0,
            fallback_dir: None,
            early_stopping_rounds: 100,
            eval_metric: EvalMetric::Auc,
            params: BoostingParams::default(),
        }
    }
}

impl RunConfig {
    /// Create a config for a data path with defaults elsewhere
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            ..Default::default()
        }
    }

    /// Load from a JSON file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            TrainerError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            TrainerError::InvalidConfig(format!("invalid config {}: {}", path.display(), e))
        })
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_n_splits(mut self, n_splits: usize) -> Self {
        self.n_splits = n_splits;
        self
    }

    pub fn with_target_col(mut self, target: impl Into<String>) -> Self {
        self.target_col = Some(target.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_fill_value(mut self, fill: f64) -> Self {
        self.fill_value = fill;
        self
    }

    pub fn with_fallback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = Some(dir.into());
        self
    }

    pub fn with_params(mut self, params: BoostingParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_early_stopping_rounds(mut self, rounds: usize) -> Self {
        self.early_stopping_rounds = rounds;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_path.as_os_str().is_empty() {
            return Err(TrainerError::InvalidConfig("data path is required".into()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(TrainerError::InvalidConfig("output directory must not be empty".into()));
        }
        if self.n_splits < 2 {
            return Err(TrainerError::InvalidConfig(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }
        if !self.fill_value.is_finite() {
            return Err(TrainerError::InvalidConfig("fill_value must be finite".into()));
        }
        if self.early_stopping_rounds == 0 {
            return Err(TrainerError::InvalidConfig("early_stopping_rounds must be positive".into()));
        }
        self.params.validate()
    }

    pub fn preprocess_config(&self) -> PreprocessConfig {
        PreprocessConfig {
            fill_value: self.fill_value,
        }
    }

    pub fn cv_config(&self) -> CvConfig {
        CvConfig {
            n_splits: self.n_splits,
            seed: self.seed,
            early_stopping_rounds: self.early_stopping_rounds,
            eval_metric: self.eval_metric,
            params: self.params.clone(),
        }
    }
}
