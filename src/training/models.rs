//! Trainer backend and per-fold classifier traits

use super::capability::{CapabilitySet, TrainerInfo};
use super::config::{BoostingParams, FitOptions};
use crate::error::Result;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a classifier's `fit`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("fit() got an unexpected keyword argument '{0}'")]
    UnsupportedOption(String),

    #[error("invalid fit arguments: {0}")]
    Rejected(String),

    #[error("training failed: {0}")]
    Failed(String),
}

/// What a successful fit reports back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Boosting rounds kept in the model
    pub n_iterations: usize,
    /// Round with the best validation score, when monitored
    pub best_iteration: Option<usize>,
    pub best_score: Option<f64>,
}

/// A classifier trained on one fold
pub trait FoldClassifier: Send {
    /// Fit on the training slice with the given optional arguments
    fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        options: &FitOptions<'_>,
    ) -> std::result::Result<FitSummary, FitError>;

    /// Positive-class probabilities.
    ///
    /// `Ok(None)` means the classifier cannot produce probabilities at all;
    /// `Err` means it should have and failed.
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Option<Array1<f64>>>;

    /// Hard `0/1` predictions
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>>;

    /// Per-feature importances (if available)
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }

    /// Serialize the fitted model
    fn to_bytes(&self) -> Result<Vec<u8>>;
}

/// The installed training library, as seen by the cross-validation loop
pub trait TrainerBackend {
    type Classifier: FoldClassifier;

    /// Name and version of the trainer
    fn info(&self) -> TrainerInfo;

    /// Optional fit arguments this trainer accepts.
    ///
    /// Defaults to the versioned capability table lookup on [`TrainerBackend::info`].
    fn accepted_options(&self) -> CapabilitySet {
        CapabilitySet::from_table(&self.info())
    }

    /// A fresh, unfitted classifier
    fn new_classifier(&self, params: &BoostingParams, seed: u64) -> Self::Classifier;
}
