//! Model training module
//!
//! Provides the cross-validated training core:
//! - Stratified k-fold splitting
//! - LightGBM-style leaf-wise gradient boosting (built-in backend)
//! - Capability negotiation of optional fit arguments
//! - Fold loop with fallback, out-of-fold scoring and AUC summary

mod config;
mod models;
pub mod capability;
pub mod cross_validation;
pub mod lightgbm;
pub mod metrics;
pub mod trainer;

pub use capability::{CapabilityNegotiator, CapabilitySet, Negotiated, TrainerInfo, CAPABILITY_TABLE};
pub use config::{BoostingParams, EvalMetric, EvalSet, FitCallback, FitOptionKind, FitOptions};
pub use cross_validation::{FoldSplit, StratifiedKFold};
pub use lightgbm::{LightGbmBackend, LightGbmClassifier};
pub use metrics::{log_loss, roc_auc, CvMetrics};
pub use models::{FitError, FitSummary, FoldClassifier, TrainerBackend};
pub use trainer::{CrossValidationTrainer, CvConfig, CvOutcome, FitMode, FoldReport};

use ndarray::Array1;

/// Feature names paired with their importance, highest first
pub fn rank_features(names: &[String], importances: &Array1<f64>) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = names
        .iter()
        .cloned()
        .zip(importances.iter().copied())
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rank_features() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ranked = rank_features(&names, &array![0.5, 2.0, 0.5]);
        assert_eq!(ranked[0].0, "b");
        assert_eq!(ranked[1].0, "a");
        assert_eq!(ranked[2].0, "c");
    }
}
