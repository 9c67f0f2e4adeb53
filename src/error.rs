//! Error types for the k-fold trainer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for trainer operations
pub type Result<T> = std::result::Result<T, TrainerError>;

/// Main error type for the training pipeline
#[derive(Error, Debug)]
pub enum TrainerError {
    #[error(
        "Data file not found: '{}'. Current cwd: {}. {listing}",
        .path.display(),
        .cwd.display()
    )]
    DataNotFound {
        path: PathBuf,
        cwd: PathBuf,
        listing: String,
    },

    #[error("Failed to load '{}': {reason}", .path.display())]
    DataLoad { path: PathBuf, reason: String },

    #[error("Requested target column '{requested}' not found in file. Available columns: {available:?}")]
    TargetColumnNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error(
        "Could not find a target column. Please pass the column name with --target-col. \
         Available columns: {available:?}"
    )]
    NoTargetCandidate { available: Vec<String> },

    #[error("Length mismatch: X {features} rows vs y {labels} rows")]
    ShapeMismatch { features: usize, labels: usize },

    #[error("y has {found} unique class(es). Need >=2 classes for stratified CV")]
    InsufficientClasses { found: usize },

    #[error("y has {found} unique classes. Binary classification needs exactly 2")]
    TooManyClasses { found: usize },

    #[error("Target column has {count} missing value(s); every row needs a label")]
    MissingLabels { count: usize },

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Fit rejected on fold {fold} with options {options:?}: {reason}")]
    FitCompatibility {
        fold: usize,
        options: Vec<String>,
        reason: String,
    },

    #[error(
        "Training failed on fold {fold} after fallback. Tried modes: {attempts:?}. \
         Shapes: {shapes}. Feature dtypes: {dtypes:?}. Label sample: {label_sample:?}. Cause: {reason}"
    )]
    FatalTraining {
        fold: usize,
        attempts: Vec<String>,
        shapes: String,
        dtypes: Vec<String>,
        label_sample: Vec<f64>,
        reason: String,
    },

    #[error("Scoring failed on fold {fold}: {reason}")]
    Scoring { fold: usize, reason: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Model artifact error: {0}")]
    Artifact(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },
}

impl TrainerError {
    /// Whether the error is recovered inside the trainer rather than aborting the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TrainerError::FitCompatibility { .. })
    }
}

impl From<polars::error::PolarsError> for TrainerError {
    fn from(err: polars::error::PolarsError) -> Self {
        TrainerError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for TrainerError {
    fn from(err: serde_json::Error) -> Self {
        TrainerError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for TrainerError {
    fn from(err: bincode::Error) -> Self {
        TrainerError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TrainerError {
    fn from(err: ndarray::ShapeError) -> Self {
        TrainerError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
