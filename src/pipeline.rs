//! The training run: resolve, select target, clean, cross-validate, persist

use crate::config::RunConfig;
use crate::data::{DataResolver, Resolution};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::export::{ArtifactPaths, ArtifactWriter, MetricsSummary, ModelArtifact, ModelMetadata};
use crate::preprocessing::{Preprocessor, TargetSelector, TargetSource};
use crate::training::{
    rank_features, CrossValidationTrainer, FoldClassifier, FoldReport, FoldSplit, LightGbmBackend,
    TrainerBackend,
};
use ndarray::Array1;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Features logged from the importance ranking
const TOP_FEATURES: usize = 10;

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunReport {
    pub source: PathBuf,
    pub resolution: Resolution,
    pub target: String,
    pub target_source: TargetSource,
    pub metrics: MetricsSummary,
    pub folds: Vec<FoldReport>,
    pub splits: Vec<FoldSplit>,
    pub oof: Array1<f64>,
    /// Features by split gain of the final model, highest first
    pub feature_ranking: Vec<(String, f64)>,
    pub artifacts: ArtifactPaths,
    pub diagnostics: Diagnostics,
    pub elapsed_secs: f64,
}

/// Train with the built-in booster
pub fn run(config: &RunConfig) -> Result<RunReport> {
    run_with_backend(config, LightGbmBackend::new())
}

/// Train with any trainer backend
pub fn run_with_backend<B: TrainerBackend>(config: &RunConfig, backend: B) -> Result<RunReport> {
    config.validate()?;
    let start = Instant::now();
    let mut diag = Diagnostics::new();

    let resolved = resolver_for(config).resolve(&config.data_path, &mut diag)?;
    info!(
        source = %resolved.source.display(),
        rows = resolved.frame.height(),
        cols = resolved.frame.width(),
        "Loaded dataset"
    );

    let split = TargetSelector::new().select(&resolved.frame, config.target_col.as_deref(), &mut diag)?;
    let cleaned = Preprocessor::new(config.preprocess_config()).process(&split, &mut diag)?;

    let trainer = CrossValidationTrainer::new(backend, config.cv_config());
    let outcome = trainer.run(&cleaned, &mut diag)?;

    let features = &cleaned.features;
    let feature_ranking = outcome
        .model
        .feature_importances()
        .map(|imp| rank_features(&features.names, &imp))
        .unwrap_or_default();
    for (rank, (name, gain)) in feature_ranking.iter().take(TOP_FEATURES).enumerate() {
        info!(rank = rank + 1, feature = %name, gain = %format!("{:.4}", gain), "Feature importance");
    }

    let summary = MetricsSummary {
        cv: outcome.metrics.clone(),
        n_rows: features.n_rows(),
        n_features: features.n_features(),
        n_splits: config.n_splits,
        target_column: split.target.clone(),
        target_source: split.source.as_str().to_string(),
        label_classes: cleaned.label_encoding.classes.clone(),
        categorical_features: features.categorical_names(),
        seed: config.seed,
        fit_modes: outcome
            .folds
            .iter()
            .map(|f| f.attempts.iter().map(|m| m.describe()).collect())
            .collect(),
        best_iterations: outcome.folds.iter().map(|f| f.best_iteration).collect(),
        trainer: outcome.trainer.clone(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    let mut metadata = ModelMetadata::new(outcome.trainer.clone(), split.target.clone())
        .with_features(features.names.clone(), features.kinds.clone())
        .with_label_classes(cleaned.label_encoding.classes.clone())
        .with_hyperparameters(config.params.clone(), config.seed)
        .add_metric("oof_auc", summary.cv.oof_auc)
        .add_metric("auc_std", summary.cv.auc_std);
    if let Some(last_auc) = outcome.folds.last().and_then(|f| f.auc) {
        metadata = metadata.add_metric("last_fold_auc", last_auc);
    }
    let artifact = ModelArtifact::new(metadata, outcome.model.to_bytes()?);

    let ranking = (!feature_ranking.is_empty()).then_some(feature_ranking.as_slice());
    let artifacts = ArtifactWriter::new(&config.output_dir).write(&artifact, &outcome.oof, &summary, ranking)?;

    let elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        oof_auc = %format!("{:.5}", summary.cv.oof_auc),
        warnings = diag.len(),
        elapsed_secs = %format!("{:.2}", elapsed_secs),
        "Run complete"
    );

    Ok(RunReport {
        source: resolved.source,
        resolution: resolved.resolution,
        target: split.target,
        target_source: split.source,
        metrics: summary,
        folds: outcome.folds,
        splits: outcome.splits,
        oof: outcome.oof,
        feature_ranking,
        artifacts,
        diagnostics: diag,
        elapsed_secs,
    })
}

/// Summary of a dataset as the trainer would see it
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub source: PathBuf,
    pub n_rows: usize,
    pub n_columns: usize,
    /// `(name, dtype)` of every column
    pub dtypes: Vec<(String, String)>,
    pub target: String,
    pub target_source: TargetSource,
    /// Row count per raw label value, nulls as `"null"`
    pub class_balance: Vec<(String, usize)>,
}

/// Resolve the data and the target without training
pub fn inspect(config: &RunConfig) -> Result<(DatasetSummary, Diagnostics)> {
    let mut diag = Diagnostics::new();
    let resolved = resolver_for(config).resolve(&config.data_path, &mut diag)?;
    let split = TargetSelector::new().select(&resolved.frame, config.target_col.as_deref(), &mut diag)?;

    let frame = &resolved.frame;
    let dtypes = frame
        .get_columns()
        .iter()
        .map(|c| (c.name().to_string(), c.dtype().to_string()))
        .collect();

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let labels = split.labels.cast(&DataType::String)?;
    for value in labels.str()?.into_iter() {
        *counts.entry(value.unwrap_or("null").to_string()).or_default() += 1;
    }

    let summary = DatasetSummary {
        source: resolved.source,
        n_rows: frame.height(),
        n_columns: frame.width(),
        dtypes,
        target: split.target,
        target_source: split.source,
        class_balance: counts.into_iter().collect(),
    };
    Ok((summary, diag))
}

fn resolver_for(config: &RunConfig) -> DataResolver {
    let resolver = DataResolver::new();
    match &config.fallback_dir {
        Some(dir) => resolver.with_fallback_dir(dir),
        None => resolver,
    }
}
