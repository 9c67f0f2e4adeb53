//! kfold_trainer - Robust cross-validated training for tabular binary classification
//!
//! A run takes a loosely specified data source and produces a model artifact,
//! out-of-fold predictions and a metrics summary:
//!
//! 1. [`data`] resolves a file, directory or misnamed path to a dataset
//! 2. [`preprocessing`] picks the target column and cleans the features
//! 3. [`training`] runs stratified k-fold boosting, negotiating which optional
//!    fit arguments the trainer accepts and falling back when a fit is rejected
//! 4. [`export`] writes `model_fold_last.bin`, `oof_preds.csv` and `metrics.json`
//!
//! [`pipeline::run`] chains the stages; [`cli`] wraps it for the command line.

pub mod error;
pub mod config;
pub mod diagnostics;

pub mod data;
pub mod preprocessing;
pub mod training;
pub mod export;

pub mod pipeline;
pub mod cli;

pub use error::{Result, TrainerError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::RunConfig;
    pub use crate::diagnostics::{Diagnostics, Stage};
    pub use crate::error::{Result, TrainerError};

    pub use crate::data::{DataLoader, DataResolver};
    pub use crate::preprocessing::{CleanedData, PreprocessConfig, Preprocessor, TargetSelector};
    pub use crate::training::{
        BoostingParams, CrossValidationTrainer, CvConfig, FoldClassifier, LightGbmBackend,
        StratifiedKFold, TrainerBackend,
    };
    pub use crate::export::{ArtifactWriter, MetricsSummary, ModelArtifact};
    pub use crate::pipeline::{inspect, run, run_with_backend, RunReport};
}
