//! Command-line interface for cross-validated training and dataset inspection.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

use crate::config::RunConfig;
use crate::diagnostics::Diagnostics;
use crate::pipeline::{self, DatasetSummary, RunReport};
use crate::training::EvalMetric;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn warn(s: &str) -> ColoredString   { s.truecolor(230, 190, 90) }

fn kv(key: &str, val: &str) {
    println!("  {:<22} {}", muted(key), val.white());
}

fn step_run(msg: &str) {
    println!("  {} {}...", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("  {} {}", ok("✓"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn print_warnings(diag: &Diagnostics) {
    if diag.is_empty() {
        return;
    }
    section("Warnings");
    for w in diag.warnings() {
        println!("  {} {} {}", warn("!"), dim(&format!("[{:?}]", w.stage)), w.message);
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "kfold-trainer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stratified k-fold gradient boosting trainer for tabular binary classification")]
#[command(long_about = None)]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that reads a dataset
#[derive(clap::Args, Debug, Clone)]
pub struct DataArgs {
    /// Data file or directory (CSV or Parquet)
    #[arg(long)]
    pub data_path: Option<PathBuf>,

    /// Name of the target/label column in the dataset
    #[arg(long)]
    pub target_col: Option<String>,

    /// Directory searched when the data path cannot be resolved
    #[arg(long)]
    pub fallback_dir: Option<PathBuf>,

    /// JSON run configuration; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train with stratified k-fold cross-validation and write artifacts
    Train {
        #[command(flatten)]
        data: DataArgs,

        /// Directory for the model, OOF predictions and metrics [default: artifacts/lightgbm]
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Number of cross-validation folds [default: 5]
        #[arg(long)]
        n_splits: Option<usize>,

        /// Random seed for splits and the booster [default: 42]
        #[arg(long)]
        seed: Option<u64>,

        /// Fill value for missing features [default: 0]
        #[arg(long)]
        fill_value: Option<f64>,

        /// Early stopping patience in rounds [default: 100]
        #[arg(long)]
        early_stopping_rounds: Option<usize>,

        /// Validation metric: auc or binary_logloss [default: auc]
        #[arg(long)]
        eval_metric: Option<EvalMetric>,

        /// Maximum boosting rounds [default: 1000]
        #[arg(long)]
        n_estimators: Option<usize>,

        /// Learning rate [default: 0.05]
        #[arg(long)]
        learning_rate: Option<f64>,
    },

    /// Resolve the dataset and target and print a summary without training
    Inspect {
        #[command(flatten)]
        data: DataArgs,
    },
}

impl DataArgs {
    /// Start from the config file (if any) and apply the data flags
    fn base_config(&self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        };
        if let Some(path) = &self.data_path {
            config.data_path = path.clone();
        }
        if let Some(target) = &self.target_col {
            config.target_col = Some(target.clone());
        }
        if let Some(dir) = &self.fallback_dir {
            config.fallback_dir = Some(dir.clone());
        }
        if config.data_path.as_os_str().is_empty() {
            anyhow::bail!("--data-path is required (or set data_path in --config)");
        }
        Ok(config)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Build the run configuration for `train` from file and flags
#[allow(clippy::too_many_arguments)]
pub fn train_config(
    data: &DataArgs,
    output_dir: Option<PathBuf>,
    n_splits: Option<usize>,
    seed: Option<u64>,
    fill_value: Option<f64>,
    early_stopping_rounds: Option<usize>,
    eval_metric: Option<EvalMetric>,
    n_estimators: Option<usize>,
    learning_rate: Option<f64>,
) -> anyhow::Result<RunConfig> {
    let mut config = data.base_config()?;
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    if let Some(k) = n_splits {
        config.n_splits = k;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if let Some(fill) = fill_value {
        config.fill_value = fill;
    }
    if let Some(rounds) = early_stopping_rounds {
        config.early_stopping_rounds = rounds;
    }
    if let Some(metric) = eval_metric {
        config.eval_metric = metric;
    }
    if let Some(n) = n_estimators {
        config.params.n_estimators = n;
    }
    if let Some(lr) = learning_rate {
        config.params.learning_rate = lr;
    }
    config.validate()?;
    Ok(config)
}

pub fn cmd_train(config: &RunConfig) -> anyhow::Result<()> {
    section("Train");
    kv("Data", &config.data_path.display().to_string());
    kv("Folds", &config.n_splits.to_string());
    kv("Seed", &config.seed.to_string());

    step_run("Running cross-validation");
    let report = pipeline::run(config)?;
    step_done(&format!("{:.2}s", report.elapsed_secs));

    print_train_report(&report);
    Ok(())
}

fn print_train_report(report: &RunReport) {
    let m = &report.metrics;

    section("Dataset");
    kv("Source", &report.source.display().to_string());
    kv("Rows × features", &format!("{} × {}", m.n_rows, m.n_features));
    kv("Target", &format!("{} ({})", report.target, report.target_source.as_str()));
    kv("Classes", &m.label_classes.join(", "));
    if !m.categorical_features.is_empty() {
        kv("Categorical", &m.categorical_features.join(", "));
    }

    section("Folds");
    for fold in &report.folds {
        let auc = fold
            .auc
            .map(|a| format!("{:.5}", a))
            .unwrap_or_else(|| "n/a".to_string());
        let mode = if fold.used_fallback() {
            warn("fallback").to_string()
        } else {
            ok("negotiated").to_string()
        };
        println!(
            "  {} {:<3} {} {}  {}",
            accent("›"),
            fold.fold,
            muted("auc"),
            auc.white(),
            dim(&format!("iters={} {}", fold.n_iterations, mode))
        );
    }

    section("Result");
    println!("  {:<22} {}", muted("OOF AUC (mean)"), format!("{:.5}", m.cv.oof_auc).white().bold());
    kv("AUC std", &format!("{:.5}", m.cv.auc_std));
    if let Some(pooled) = m.cv.pooled_oof_auc {
        kv("Pooled OOF AUC", &format!("{:.5}", pooled));
    }
    if let Some(loss) = m.cv.oof_log_loss {
        kv("OOF log-loss", &format!("{:.5}", loss));
    }
    kv("Trainer", &m.trainer.to_string());

    if !report.feature_ranking.is_empty() {
        section("Top features");
        for (name, gain) in report.feature_ranking.iter().take(10) {
            kv(name, &format!("{:.3}", gain));
        }
    }

    section("Artifacts");
    kv("Model", &report.artifacts.model.display().to_string());
    kv("OOF predictions", &report.artifacts.oof.display().to_string());
    kv("Metrics", &report.artifacts.metrics.display().to_string());
    if let Some(path) = &report.artifacts.importance {
        kv("Feature importance", &path.display().to_string());
    }

    print_warnings(&report.diagnostics);
    println!();
}

pub fn cmd_inspect(data: &DataArgs) -> anyhow::Result<()> {
    let config = data.base_config()?;
    section("Inspect");
    let (summary, diag) = pipeline::inspect(&config)?;
    print_summary(&summary);
    print_warnings(&diag);
    println!();
    Ok(())
}

fn print_summary(summary: &DatasetSummary) {
    kv("Source", &summary.source.display().to_string());
    kv("Rows × columns", &format!("{} × {}", summary.n_rows, summary.n_columns));
    kv("Target", &format!("{} ({})", summary.target, summary.target_source.as_str()));

    section("Columns");
    for (name, dtype) in &summary.dtypes {
        let marker = if *name == summary.target { accent("*") } else { dim(" ") };
        println!("  {} {:<30} {}", marker, name, dim(dtype));
    }

    section("Class balance");
    let total = summary.n_rows.max(1) as f64;
    for (label, count) in &summary.class_balance {
        kv(label, &format!("{} ({:.1}%)", count, 100.0 * *count as f64 / total));
    }
}
