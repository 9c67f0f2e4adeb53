//! Ranking and probability metrics for binary classifiers

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

const LOG_LOSS_EPS: f64 = 1e-15;

/// Area under the ROC curve via the rank-sum formulation.
///
/// Tied scores receive their average rank. Returns `None` when `labels`
/// holds a single class, where AUC is undefined.
pub fn roc_auc(labels: ArrayView1<'_, f64>, scores: ArrayView1<'_, f64>) -> Option<f64> {
    if labels.len() != scores.len() || labels.is_empty() {
        return None;
    }

    let n_pos = labels.iter().filter(|&&y| y > 0.5).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum_pos = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; a tie group shares the mean of its ranks
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        let positives = order[start..end].iter().filter(|&&i| labels[i] > 0.5).count();
        rank_sum_pos += avg_rank * positives as f64;
        start = end;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Mean binary cross-entropy with probabilities clipped away from 0 and 1
pub fn log_loss(labels: ArrayView1<'_, f64>, probs: ArrayView1<'_, f64>) -> Option<f64> {
    if labels.len() != probs.len() || labels.is_empty() {
        return None;
    }
    let total: f64 = labels
        .iter()
        .zip(probs.iter())
        .map(|(&y, &p)| {
            let p = p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
            if y > 0.5 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    Some(total / labels.len() as f64)
}

/// Aggregated cross-validation scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvMetrics {
    /// Mean of the defined per-fold validation AUCs
    pub oof_auc: f64,
    /// Per-fold AUC; `None` where the validation slice held a single class
    pub fold_aucs: Vec<Option<f64>>,
    pub auc_std: f64,
    /// AUC of the full out-of-fold vector against all labels
    pub pooled_oof_auc: Option<f64>,
    pub oof_log_loss: Option<f64>,
}

impl CvMetrics {
    pub fn compute(
        fold_aucs: Vec<Option<f64>>,
        labels: ArrayView1<'_, f64>,
        oof: ArrayView1<'_, f64>,
    ) -> Self {
        let defined: Vec<f64> = fold_aucs.iter().flatten().copied().collect();
        let (oof_auc, auc_std) = if defined.is_empty() {
            (0.0, 0.0)
        } else {
            let n = defined.len() as f64;
            let mean = defined.iter().sum::<f64>() / n;
            let var = defined.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
            (mean, var.sqrt())
        };

        Self {
            oof_auc,
            fold_aucs,
            auc_std,
            pooled_oof_auc: roc_auc(labels, oof),
            oof_log_loss: log_loss(labels, oof),
        }
    }

    /// Number of folds that contributed to `oof_auc`
    pub fn n_scored_folds(&self) -> usize {
        self.fold_aucs.iter().filter(|a| a.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_auc_perfect_and_inverted() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        assert_eq!(roc_auc(y.view(), array![0.1, 0.2, 0.8, 0.9].view()), Some(1.0));
        assert_eq!(roc_auc(y.view(), array![0.9, 0.8, 0.2, 0.1].view()), Some(0.0));
    }

    #[test]
    fn test_auc_ties_count_half() {
        let y = array![0.0, 1.0];
        assert_eq!(roc_auc(y.view(), array![0.5, 0.5].view()), Some(0.5));

        let y = array![0.0, 0.0, 1.0, 1.0];
        let s = array![0.1, 0.4, 0.35, 0.8];
        assert!((roc_auc(y.view(), s.view()).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_auc_single_class_undefined() {
        let y = array![1.0, 1.0, 1.0];
        assert_eq!(roc_auc(y.view(), array![0.1, 0.5, 0.9].view()), None);
    }

    #[test]
    fn test_auc_nan_scores_rank_last() {
        // NaN sorts above every finite score and forms its own tie group
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0];
        let s = array![0.1, f64::NAN, 0.2, 0.9, f64::NAN];
        let auc = roc_auc(y.view(), s.view()).unwrap();
        assert!((0.0..=1.0).contains(&auc));
        assert!((auc - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_log_loss_clipped() {
        let y = array![1.0, 0.0];
        let loss = log_loss(y.view(), array![1.0, 0.0].view()).unwrap();
        assert!(loss >= 0.0 && loss < 1e-10);
        let loss = log_loss(y.view(), array![0.5, 0.5].view()).unwrap();
        assert!((loss - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn test_cv_metrics_skips_undefined_folds() {
        let y = array![0.0, 1.0, 0.0, 1.0];
        let oof = array![0.2, 0.7, 0.3, 0.9];
        let metrics = CvMetrics::compute(vec![Some(0.8), None, Some(0.6)], y.view(), oof.view());
        assert!((metrics.oof_auc - 0.7).abs() < 1e-12);
        assert!((metrics.auc_std - 0.1).abs() < 1e-12);
        assert_eq!(metrics.n_scored_folds(), 2);
        assert_eq!(metrics.pooled_oof_auc, Some(1.0));
    }

    #[test]
    fn test_cv_metrics_no_folds() {
        let y = array![0.0, 1.0];
        let oof = array![0.5, 0.5];
        let metrics = CvMetrics::compute(vec![], y.view(), oof.view());
        assert_eq!(metrics.oof_auc, 0.0);
    }
}
