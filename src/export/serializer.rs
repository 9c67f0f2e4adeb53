//! Model artifact envelope
//!
//! The fitted model bytes are wrapped with metadata and an integrity checksum
//! and written with bincode.

use crate::error::{Result, TrainerError};
use crate::preprocessing::FeatureKind;
use crate::training::{BoostingParams, TrainerInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Model metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Trainer that produced the model
    pub trainer: TrainerInfo,
    /// Training timestamp (ISO 8601)
    pub trained_at: String,
    pub feature_names: Vec<String>,
    /// Per-feature kind, including categorical levels
    pub feature_kinds: Vec<FeatureKind>,
    pub target_name: String,
    /// Raw label per encoded class
    pub label_classes: Vec<String>,
    pub hyperparameters: BoostingParams,
    pub seed: u64,
    pub metrics: BTreeMap<String, f64>,
}

impl ModelMetadata {
    pub fn new(trainer: TrainerInfo, target_name: impl Into<String>) -> Self {
        Self {
            trainer,
            trained_at: chrono::Utc::now().to_rfc3339(),
            feature_names: Vec::new(),
            feature_kinds: Vec::new(),
            target_name: target_name.into(),
            label_classes: Vec::new(),
            hyperparameters: BoostingParams::default(),
            seed: 0,
            metrics: BTreeMap::new(),
        }
    }

    /// Set feature names and kinds
    pub fn with_features(mut self, names: Vec<String>, kinds: Vec<FeatureKind>) -> Self {
        self.feature_names = names;
        self.feature_kinds = kinds;
        self
    }

    pub fn with_label_classes(mut self, classes: Vec<String>) -> Self {
        self.label_classes = classes;
        self
    }

    pub fn with_hyperparameters(mut self, params: BoostingParams, seed: u64) -> Self {
        self.hyperparameters = params;
        self.seed = seed;
        self
    }

    /// Add metric
    pub fn add_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}

/// Serialized model with metadata and checksum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Magic bytes for format detection
    pub magic: [u8; 4],
    pub format_version: u32,
    pub metadata: ModelMetadata,
    /// Trainer-specific model bytes
    pub model_data: Vec<u8>,
    pub checksum: u64,
}

impl ModelArtifact {
    pub const MAGIC: [u8; 4] = *b"KFTM";
    pub const VERSION: u32 = 1;

    pub fn new(metadata: ModelMetadata, model_data: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(&model_data);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            metadata,
            model_data,
            checksum,
        }
    }

    /// Compute checksum using FNV-1a hash
    fn compute_checksum(data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0100_0000_01b3;

        data.iter().fold(FNV_OFFSET, |hash, &byte| {
            (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
        })
    }

    pub fn verify_checksum(&self) -> bool {
        Self::compute_checksum(&self.model_data) == self.checksum
    }

    /// Check magic bytes, format version and checksum
    pub fn validate(&self) -> Result<()> {
        if self.magic != Self::MAGIC {
            return Err(TrainerError::Artifact(format!(
                "unrecognized magic bytes {:?}",
                self.magic
            )));
        }
        if self.format_version != Self::VERSION {
            return Err(TrainerError::Artifact(format!(
                "unsupported format version {} (expected {})",
                self.format_version,
                Self::VERSION
            )));
        }
        if !self.verify_checksum() {
            return Err(TrainerError::Artifact("checksum mismatch".to_string()));
        }
        Ok(())
    }
}

/// Write an artifact to `path`
pub fn save_model_artifact(artifact: &ModelArtifact, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, artifact)?;
    writer.flush()?;
    Ok(())
}

/// Read and validate an artifact from `path`
pub fn load_model_artifact(path: impl AsRef<Path>) -> Result<ModelArtifact> {
    let file = File::open(path.as_ref())?;
    let artifact: ModelArtifact = bincode::deserialize_from(BufReader::new(file))
        .map_err(|e| TrainerError::Artifact(format!("failed to decode artifact: {}", e)))?;
    artifact.validate()?;
    Ok(artifact)
}
