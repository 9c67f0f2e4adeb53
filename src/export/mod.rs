//! Model export and run artifacts
//!
//! - Binary model envelope with metadata and checksum
//! - Out-of-fold predictions, metrics and feature ranking files

mod artifacts;
mod serializer;

pub use artifacts::{
    read_metrics, ArtifactPaths, ArtifactWriter, MetricsSummary, IMPORTANCE_FILE, METRICS_FILE,
    MODEL_FILE, OOF_COLUMN, OOF_FILE,
};
pub use serializer::{load_model_artifact, save_model_artifact, ModelArtifact, ModelMetadata};
