//! Persisting the run's outputs

use super::serializer::{save_model_artifact, ModelArtifact};
use crate::data::DataSaver;
use crate::error::Result;
use crate::training::{CvMetrics, TrainerInfo};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const MODEL_FILE: &str = "model_fold_last.bin";
pub const OOF_FILE: &str = "oof_preds.csv";
pub const METRICS_FILE: &str = "metrics.json";
pub const IMPORTANCE_FILE: &str = "feature_importance.csv";
/// Column name of the out-of-fold file
pub const OOF_COLUMN: &str = "oof";

/// Contents of `metrics.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    #[serde(flatten)]
    pub cv: CvMetrics,
    pub n_rows: usize,
    pub n_features: usize,
    pub n_splits: usize,
    pub target_column: String,
    /// How the target was chosen: explicit, common_name or heuristic
    pub target_source: String,
    pub label_classes: Vec<String>,
    pub categorical_features: Vec<String>,
    pub seed: u64,
    /// Fit calls attempted per fold
    pub fit_modes: Vec<Vec<String>>,
    pub best_iterations: Vec<Option<usize>>,
    pub trainer: TrainerInfo,
    pub created_at: String,
}

/// Where each output was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub oof: PathBuf,
    pub metrics: PathBuf,
    pub importance: Option<PathBuf>,
}

/// Writes model, out-of-fold predictions and metrics into one directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every artifact, creating the directory if needed
    pub fn write(
        &self,
        model: &ModelArtifact,
        oof: &Array1<f64>,
        metrics: &MetricsSummary,
        importance: Option<&[(String, f64)]>,
    ) -> Result<ArtifactPaths> {
        fs::create_dir_all(&self.output_dir)?;

        let model_path = self.output_dir.join(MODEL_FILE);
        save_model_artifact(model, &model_path)?;

        let oof_path = self.output_dir.join(OOF_FILE);
        let mut oof_frame = df!(OOF_COLUMN => oof.to_vec())?;
        DataSaver::save_csv(&mut oof_frame, &oof_path)?;

        let metrics_path = self.output_dir.join(METRICS_FILE);
        write_json(metrics, &metrics_path)?;

        let importance_path = match importance {
            Some(ranked) => {
                let path = self.output_dir.join(IMPORTANCE_FILE);
                let names: Vec<&str> = ranked.iter().map(|(name, _)| name.as_str()).collect();
                let values: Vec<f64> = ranked.iter().map(|(_, v)| *v).collect();
                let mut frame = df!("feature" => names, "importance" => values)?;
                DataSaver::save_csv(&mut frame, &path)?;
                Some(path)
            }
            None => None,
        };

        info!(
            dir = %self.output_dir.display(),
            rows = oof.len(),
            "Saved model, OOF predictions and metrics"
        );

        Ok(ArtifactPaths {
            model: model_path,
            oof: oof_path,
            metrics: metrics_path,
            importance: importance_path,
        })
    }
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Read a `metrics.json` written by [`ArtifactWriter`]
pub fn read_metrics(path: impl AsRef<Path>) -> Result<MetricsSummary> {
    let file = File::open(path.as_ref())?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}
