//! Training configuration and fit-time options

use crate::error::{Result, TrainerError};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hyperparameters of the gradient-boosted classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    /// Maximum boosting rounds (early stopping usually ends sooner)
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// Maximum leaves per tree
    pub num_leaves: usize,
    pub max_depth: Option<usize>,
    pub min_child_samples: usize,
    /// Column subsample ratio per tree
    pub colsample_bytree: f64,
    /// Row subsample ratio per boosting round
    pub subsample: f64,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 1000,
            learning_rate: 0.05,
            num_leaves: 31,
            max_depth: None,
            min_child_samples: 20,
            colsample_bytree: 0.8,
            subsample: 0.8,
            reg_alpha: 0.0,
            reg_lambda: 1.0,
        }
    }
}

impl BoostingParams {
    /// Builder method to set number of boosting rounds
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Builder method to set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Builder method to set the leaf budget per tree
    pub fn with_num_leaves(mut self, leaves: usize) -> Self {
        self.num_leaves = leaves;
        self
    }

    /// Builder method to set minimum rows per leaf
    pub fn with_min_child_samples(mut self, n: usize) -> Self {
        self.min_child_samples = n;
        self
    }

    /// Builder method to set row and column subsampling
    pub fn with_sampling(mut self, subsample: f64, colsample_bytree: f64) -> Self {
        self.subsample = subsample;
        self.colsample_bytree = colsample_bytree;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(TrainerError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.num_leaves < 2 {
            return Err(TrainerError::InvalidConfig("num_leaves must be at least 2".into()));
        }
        for (name, ratio) in [("subsample", self.subsample), ("colsample_bytree", self.colsample_bytree)] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(TrainerError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {ratio}"
                )));
            }
        }
        if self.reg_alpha < 0.0 || self.reg_lambda < 0.0 {
            return Err(TrainerError::InvalidConfig("regularization must be non-negative".into()));
        }
        Ok(())
    }
}

/// Metric monitored on the validation set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMetric {
    #[default]
    Auc,
    BinaryLogloss,
}

impl EvalMetric {
    pub fn name(self) -> &'static str {
        match self {
            EvalMetric::Auc => "auc",
            EvalMetric::BinaryLogloss => "binary_logloss",
        }
    }

    /// Whether a larger value is better
    pub fn higher_is_better(self) -> bool {
        matches!(self, EvalMetric::Auc)
    }
}

impl fmt::Display for EvalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EvalMetric {
    type Err = TrainerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auc" => Ok(EvalMetric::Auc),
            "binary_logloss" | "logloss" => Ok(EvalMetric::BinaryLogloss),
            other => Err(TrainerError::InvalidConfig(format!("unknown eval metric: {other}"))),
        }
    }
}

/// Optional fit-time options a trainer may or may not accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FitOptionKind {
    EvalSet,
    EarlyStoppingRounds,
    Callbacks,
    EvalMetric,
    CategoricalFeature,
}

impl FitOptionKind {
    pub const ALL: [FitOptionKind; 5] = [
        FitOptionKind::EvalSet,
        FitOptionKind::EarlyStoppingRounds,
        FitOptionKind::Callbacks,
        FitOptionKind::EvalMetric,
        FitOptionKind::CategoricalFeature,
    ];

    /// Keyword the option is known by in trainer APIs
    pub fn keyword(self) -> &'static str {
        match self {
            FitOptionKind::EvalSet => "eval_set",
            FitOptionKind::EarlyStoppingRounds => "early_stopping_rounds",
            FitOptionKind::Callbacks => "callbacks",
            FitOptionKind::EvalMetric => "eval_metric",
            FitOptionKind::CategoricalFeature => "categorical_feature",
        }
    }
}

impl fmt::Display for FitOptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Held-out pair monitored during fitting
#[derive(Debug, Clone, Copy)]
pub struct EvalSet<'a> {
    pub x: ArrayView2<'a, f64>,
    pub y: ArrayView1<'a, f64>,
}

/// Callback hooks the trainer runs between boosting rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitCallback {
    EarlyStopping { rounds: usize },
}

/// Options passed alongside the training data to `fit`
#[derive(Debug, Clone, Default)]
pub struct FitOptions<'a> {
    pub eval_set: Option<EvalSet<'a>>,
    pub early_stopping_rounds: Option<usize>,
    pub callbacks: Vec<FitCallback>,
    pub eval_metric: Option<EvalMetric>,
    /// Column indices to treat as categorical
    pub categorical_feature: Option<Vec<usize>>,
}

impl<'a> FitOptions<'a> {
    /// No optional arguments at all
    pub fn none() -> Self {
        Self::default()
    }

    /// Kinds of the options that are set, in canonical order
    pub fn kinds(&self) -> Vec<FitOptionKind> {
        FitOptionKind::ALL
            .into_iter()
            .filter(|kind| self.has(*kind))
            .collect()
    }

    pub fn has(&self, kind: FitOptionKind) -> bool {
        match kind {
            FitOptionKind::EvalSet => self.eval_set.is_some(),
            FitOptionKind::EarlyStoppingRounds => self.early_stopping_rounds.is_some(),
            FitOptionKind::Callbacks => !self.callbacks.is_empty(),
            FitOptionKind::EvalMetric => self.eval_metric.is_some(),
            FitOptionKind::CategoricalFeature => self.categorical_feature.is_some(),
        }
    }

    /// Unset one option
    pub fn without(mut self, kind: FitOptionKind) -> Self {
        match kind {
            FitOptionKind::EvalSet => self.eval_set = None,
            FitOptionKind::EarlyStoppingRounds => self.early_stopping_rounds = None,
            FitOptionKind::Callbacks => self.callbacks.clear(),
            FitOptionKind::EvalMetric => self.eval_metric = None,
            FitOptionKind::CategoricalFeature => self.categorical_feature = None,
        }
        self
    }

    /// Early stopping patience from either the keyword or the callback form
    pub fn early_stopping_patience(&self) -> Option<usize> {
        let from_callback = self.callbacks.iter().find_map(|cb| match cb {
            FitCallback::EarlyStopping { rounds } => Some(*rounds),
        });
        match (self.early_stopping_rounds, from_callback) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Sorted keywords, used in logs and reports
    pub fn keywords(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.kinds().iter().map(|k| k.keyword().to_string()).collect();
        keys.sort();
        keys
    }
}
