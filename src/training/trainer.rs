//! Stratified k-fold training loop with fit-option negotiation and fallback

use super::capability::{CapabilityNegotiator, TrainerInfo};
use super::config::{BoostingParams, EvalMetric, EvalSet, FitCallback, FitOptions};
use super::cross_validation::{FoldSplit, StratifiedKFold};
use super::metrics::{roc_auc, CvMetrics};
use super::models::{FitSummary, FoldClassifier, TrainerBackend};
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::{Result, TrainerError};
use crate::preprocessing::CleanedData;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Distinct label values reported when training fails
const LABEL_SAMPLE_LIMIT: usize = 20;

/// Cross-validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvConfig {
    pub n_splits: usize,
    pub seed: u64,
    /// Patience for the early-stopping options
    pub early_stopping_rounds: usize,
    pub eval_metric: EvalMetric,
    pub params: BoostingParams,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            seed: 42,
            early_stopping_rounds: 100,
            eval_metric: EvalMetric::Auc,
            params: BoostingParams::default(),
        }
    }
}

impl CvConfig {
    pub fn with_n_splits(mut self, n_splits: usize) -> Self {
        self.n_splits = n_splits;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_params(mut self, params: BoostingParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_early_stopping_rounds(mut self, rounds: usize) -> Self {
        self.early_stopping_rounds = rounds;
        self
    }
}

/// One attempted `fit` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// The negotiated option set, by keyword
    Negotiated { options: Vec<String> },
    /// No optional arguments at all
    NoOptions,
}

impl FitMode {
    pub fn describe(&self) -> String {
        match self {
            FitMode::Negotiated { options } => format!("negotiated[{}]", options.join(",")),
            FitMode::NoOptions => "no_options".to_string(),
        }
    }
}

/// What happened on one fold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldReport {
    pub fold: usize,
    pub n_train: usize,
    pub n_valid: usize,
    /// Fit calls in order; a second entry means the fallback ran
    pub attempts: Vec<FitMode>,
    /// Candidate options the trainer does not accept
    pub dropped_options: Vec<String>,
    pub auc: Option<f64>,
    pub n_iterations: usize,
    pub best_iteration: Option<usize>,
    /// Scores came from `predict` rather than `predict_proba`
    pub hard_predictions: bool,
    pub elapsed_secs: f64,
}

impl FoldReport {
    pub fn used_fallback(&self) -> bool {
        self.attempts.len() > 1
    }
}

/// Result of a full cross-validation run
#[derive(Debug)]
pub struct CvOutcome<C> {
    /// Model of the final fold
    pub model: C,
    /// One score per input row, written by the fold that held it out
    pub oof: Array1<f64>,
    pub splits: Vec<FoldSplit>,
    pub folds: Vec<FoldReport>,
    pub metrics: CvMetrics,
    pub trainer: TrainerInfo,
}

/// Runs stratified k-fold training against a [`TrainerBackend`]
pub struct CrossValidationTrainer<B> {
    backend: B,
    config: CvConfig,
}

impl<B: TrainerBackend> CrossValidationTrainer<B> {
    pub fn new(backend: B, config: CvConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &CvConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Train one model per fold and collect out-of-fold scores
    pub fn run(&self, data: &CleanedData, diag: &mut Diagnostics) -> Result<CvOutcome<B::Classifier>> {
        let x = &data.features.values;
        let y = &data.labels;
        if x.nrows() != y.len() {
            return Err(TrainerError::ShapeMismatch {
                features: x.nrows(),
                labels: y.len(),
            });
        }

        let k = self.config.n_splits;
        let min_class = StratifiedKFold::min_class_count(y.view());
        if min_class < k {
            diag.warn(
                Stage::Train,
                format!(
                    "The least populated class in y has only {} members, which is less than n_splits={}",
                    min_class, k
                ),
            );
        }
        let splits = StratifiedKFold::new(k, self.config.seed).split(y.view())?;

        let negotiator = CapabilityNegotiator::probe(&self.backend);
        let trainer = negotiator.info().clone();
        let categorical: Vec<usize> = data
            .features
            .kinds
            .iter()
            .enumerate()
            .filter(|(_, kind)| kind.is_categorical())
            .map(|(i, _)| i)
            .collect();

        info!(
            trainer = %trainer,
            rows = x.nrows(),
            features = x.ncols(),
            n_splits = k,
            seed = self.config.seed,
            "Starting cross-validation"
        );

        let mut oof = Array1::<f64>::zeros(y.len());
        let mut fold_aucs = Vec::with_capacity(k);
        let mut reports = Vec::with_capacity(k);
        let mut last_model = None;

        for split in &splits {
            let start = Instant::now();
            let fold = split.fold;
            let x_train = x.select(Axis(0), &split.train_indices);
            let y_train = y.select(Axis(0), &split.train_indices);
            let x_valid = x.select(Axis(0), &split.valid_indices);
            let y_valid = y.select(Axis(0), &split.valid_indices);

            let rounds = self.config.early_stopping_rounds;
            let candidates = FitOptions {
                eval_set: Some(EvalSet {
                    x: x_valid.view(),
                    y: y_valid.view(),
                }),
                early_stopping_rounds: Some(rounds),
                callbacks: vec![FitCallback::EarlyStopping { rounds }],
                eval_metric: Some(self.config.eval_metric),
                categorical_feature: (!categorical.is_empty()).then(|| categorical.clone()),
            };
            let negotiated = negotiator.negotiate(candidates);
            let dropped: Vec<String> = negotiated
                .dropped
                .iter()
                .map(|kind| kind.keyword().to_string())
                .collect();
            if !dropped.is_empty() {
                debug!(fold, dropped = ?dropped, "Trainer does not accept some fit options");
            }

            let mut attempts = vec![FitMode::Negotiated {
                options: negotiated.options.keywords(),
            }];
            let mut model = self.backend.new_classifier(&self.config.params, self.config.seed);

            let summary: FitSummary = match model.fit(x_train.view(), y_train.view(), &negotiated.options) {
                Ok(summary) => summary,
                Err(err) => {
                    let compat = TrainerError::FitCompatibility {
                        fold,
                        options: negotiated.options.keywords(),
                        reason: err.to_string(),
                    };
                    diag.warn(
                        Stage::Train,
                        format!("{}. Retrying fit without optional arguments", compat),
                    );

                    attempts.push(FitMode::NoOptions);
                    model = self.backend.new_classifier(&self.config.params, self.config.seed);
                    model
                        .fit(x_train.view(), y_train.view(), &FitOptions::none())
                        .map_err(|err| TrainerError::FatalTraining {
                            fold,
                            attempts: attempts.iter().map(FitMode::describe).collect(),
                            shapes: format!(
                                "X_train={:?}, y_train=({},), X_valid={:?}",
                                x_train.dim(),
                                y_train.len(),
                                x_valid.dim()
                            ),
                            dtypes: data.features.dtype_summary(),
                            label_sample: label_sample(y_train.view()),
                            reason: err.to_string(),
                        })?
                }
            };

            let (scores, hard_predictions) = score_fold(&model, fold, x_valid.view(), diag)?;
            if scores.len() != split.valid_indices.len() {
                return Err(TrainerError::Scoring {
                    fold,
                    reason: format!(
                        "expected {} scores, got {}",
                        split.valid_indices.len(),
                        scores.len()
                    ),
                });
            }
            for (&row, &score) in split.valid_indices.iter().zip(scores.iter()) {
                oof[row] = score;
            }

            let auc = roc_auc(y_valid.view(), scores.view());
            match auc {
                Some(auc) => info!(
                    fold,
                    auc = %format!("{:.5}", auc),
                    iterations = summary.n_iterations,
                    "Fold finished"
                ),
                None => diag.warn(
                    Stage::Train,
                    format!(
                        "Fold {} validation slice holds a single class; AUC is undefined and excluded from the mean",
                        fold
                    ),
                ),
            }
            fold_aucs.push(auc);

            reports.push(FoldReport {
                fold,
                n_train: split.train_indices.len(),
                n_valid: split.valid_indices.len(),
                attempts,
                dropped_options: dropped,
                auc,
                n_iterations: summary.n_iterations,
                best_iteration: summary.best_iteration,
                hard_predictions,
                elapsed_secs: start.elapsed().as_secs_f64(),
            });
            last_model = Some(model);
        }

        let model = last_model.ok_or_else(|| TrainerError::InvalidConfig("no folds were trained".into()))?;
        let metrics = CvMetrics::compute(fold_aucs, y.view(), oof.view());
        info!(
            oof_auc = %format!("{:.5}", metrics.oof_auc),
            auc_std = %format!("{:.5}", metrics.auc_std),
            "Cross-validation complete"
        );

        Ok(CvOutcome {
            model,
            oof,
            splits,
            folds: reports,
            metrics,
            trainer,
        })
    }
}

/// Positive-class scores for the validation slice
fn score_fold<C: FoldClassifier>(
    model: &C,
    fold: usize,
    x_valid: ArrayView2<'_, f64>,
    diag: &mut Diagnostics,
) -> Result<(Array1<f64>, bool)> {
    let to_scoring = |err: TrainerError| TrainerError::Scoring {
        fold,
        reason: err.to_string(),
    };
    match model.predict_proba(x_valid).map_err(to_scoring)? {
        Some(proba) => Ok((proba, false)),
        None => {
            diag.warn(
                Stage::Train,
                format!(
                    "Fold {} classifier has no probability output; scoring with hard predictions",
                    fold
                ),
            );
            let preds = model.predict(x_valid).map_err(to_scoring)?;
            Ok((preds, true))
        }
    }
}

fn label_sample(y: ArrayView1<'_, f64>) -> Vec<f64> {
    let mut values: Vec<f64> = y.to_vec();
    values.sort_by(f64::total_cmp);
    values.dedup();
    values.truncate(LABEL_SAMPLE_LIMIT);
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{FeatureKind, FeatureMatrix, LabelEncoding};
    use crate::training::capability::CapabilitySet;
    use crate::training::lightgbm::LightGbmBackend;
    use crate::training::models::FitError;
    use ndarray::Array2;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn make_data(n: usize) -> CleanedData {
        let values = Array2::from_shape_fn((n, 3), |(i, j)| ((i * 7 + j * 13) % 17) as f64 + (i % 2) as f64 * 3.0);
        let labels = Array1::from_shape_fn(n, |i| (i % 2) as f64);
        CleanedData {
            features: FeatureMatrix {
                values,
                names: vec!["a".into(), "b".into(), "c".into()],
                kinds: vec![FeatureKind::Numeric; 3],
            },
            labels,
            label_encoding: LabelEncoding {
                classes: vec!["0".into(), "1".into()],
                encoded: false,
            },
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Behavior {
        /// Claims every option but fails any call that passes one
        RejectOptions,
        AlwaysFail,
        NoProbabilities,
    }

    #[derive(Debug)]
    struct MockClassifier {
        behavior: Behavior,
        fit_calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl FoldClassifier for MockClassifier {
        fn fit(
            &mut self,
            _x: ArrayView2<'_, f64>,
            _y: ArrayView1<'_, f64>,
            options: &FitOptions<'_>,
        ) -> std::result::Result<FitSummary, FitError> {
            self.fit_calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(options.keywords());
            match self.behavior {
                Behavior::AlwaysFail => Err(FitError::Failed("boom".into())),
                Behavior::RejectOptions if !options.kinds().is_empty() => {
                    Err(FitError::UnsupportedOption(options.keywords()[0].clone()))
                }
                _ => Ok(FitSummary {
                    n_iterations: 1,
                    ..Default::default()
                }),
            }
        }

        fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Option<Array1<f64>>> {
            if self.behavior == Behavior::NoProbabilities {
                return Ok(None);
            }
            Ok(Some(x.column(0).mapv(|v| v / 20.0)))
        }

        fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
            Ok(x.column(0).mapv(|v| if v > 10.0 { 1.0 } else { 0.0 }))
        }

        fn to_bytes(&self) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    struct MockBackend {
        behavior: Behavior,
        version: &'static str,
        probe_all: bool,
        fit_calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl MockBackend {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                version: "4.1.0",
                probe_all: true,
                fit_calls: Arc::new(AtomicUsize::new(0)),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl TrainerBackend for MockBackend {
        type Classifier = MockClassifier;

        fn info(&self) -> TrainerInfo {
            TrainerInfo::new("mock", self.version)
        }

        fn accepted_options(&self) -> CapabilitySet {
            if self.probe_all {
                CapabilitySet::all()
            } else {
                CapabilitySet::from_table(&self.info())
            }
        }

        fn new_classifier(&self, _params: &BoostingParams, _seed: u64) -> MockClassifier {
            MockClassifier {
                behavior: self.behavior,
                fit_calls: Arc::clone(&self.fit_calls),
                seen: Arc::clone(&self.seen),
            }
        }
    }

    #[test]
    fn test_rejecting_trainer_falls_back_on_every_fold() {
        let data = make_data(40);
        let backend = MockBackend::new(Behavior::RejectOptions);
        let calls = Arc::clone(&backend.fit_calls);
        let trainer = CrossValidationTrainer::new(backend, CvConfig::default().with_n_splits(4));
        let mut diag = Diagnostics::new();

        let outcome = trainer.run(&data, &mut diag).unwrap();

        assert_eq!(outcome.oof.len(), 40);
        assert_eq!(calls.load(Ordering::SeqCst), 8);
        assert!(outcome.folds.iter().all(|f| f.used_fallback()));
        assert!(outcome.folds.iter().all(|f| f.attempts[1] == FitMode::NoOptions));
        assert_eq!(diag.for_stage(Stage::Train).count(), 4);
        assert!((0.0..=1.0).contains(&outcome.metrics.oof_auc));
    }

    #[test]
    fn test_always_failing_trainer_is_fatal_after_one_fallback() {
        let data = make_data(40);
        let backend = MockBackend::new(Behavior::AlwaysFail);
        let calls = Arc::clone(&backend.fit_calls);
        let trainer = CrossValidationTrainer::new(backend, CvConfig::default().with_n_splits(4));
        let mut diag = Diagnostics::new();

        let err = trainer.run(&data, &mut diag).unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match err {
            TrainerError::FatalTraining {
                fold,
                attempts,
                dtypes,
                label_sample,
                ..
            } => {
                assert_eq!(fold, 0);
                assert_eq!(attempts.len(), 2);
                assert_eq!(dtypes.len(), 3);
                assert_eq!(label_sample, vec![0.0, 1.0]);
            }
            other => panic!("expected FatalTraining, got {other:?}"),
        }
    }

    #[test]
    fn test_negotiation_uses_versioned_table() {
        let data = make_data(30);
        let mut backend = MockBackend::new(Behavior::NoProbabilities);
        backend.probe_all = false;
        let seen = Arc::clone(&backend.seen);
        let trainer = CrossValidationTrainer::new(backend, CvConfig::default().with_n_splits(3));
        let mut diag = Diagnostics::new();

        let outcome = trainer.run(&data, &mut diag).unwrap();

        let seen = seen.lock().unwrap();
        let first = &seen[0];
        assert!(!first.contains(&"early_stopping_rounds".to_string()));
        assert!(first.contains(&"callbacks".to_string()));
        assert_eq!(outcome.folds[0].dropped_options, vec!["early_stopping_rounds"]);
        assert!(outcome.folds.iter().all(|f| f.hard_predictions));
        assert!(outcome.oof.iter().all(|&p| p == 0.0 || p == 1.0));
    }

    #[test]
    fn test_lightgbm_backend_end_to_end() {
        let data = make_data(120);
        let params = BoostingParams::default()
            .with_n_estimators(40)
            .with_min_child_samples(5)
            .with_num_leaves(8);
        let config = CvConfig::default()
            .with_n_splits(3)
            .with_params(params)
            .with_early_stopping_rounds(10);
        let trainer = CrossValidationTrainer::new(LightGbmBackend::new(), config);

        let mut diag = Diagnostics::new();
        let first = trainer.run(&data, &mut diag).unwrap();
        let second = trainer.run(&data, &mut Diagnostics::new()).unwrap();

        assert!(diag.is_empty());
        assert_eq!(first.splits, second.splits);
        assert_eq!(first.oof, second.oof);
        assert!(first.oof.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert!((0.0..=1.0).contains(&first.metrics.oof_auc));
        assert!(first.folds.iter().all(|f| !f.used_fallback()));
        assert!(first.folds.iter().all(|f| !f.dropped_options.is_empty()));
    }

    #[test]
    fn test_small_class_warns() {
        let mut data = make_data(20);
        data.labels = Array1::from_shape_fn(20, |i| if i < 3 { 1.0 } else { 0.0 });
        let backend = MockBackend::new(Behavior::NoProbabilities);
        let trainer = CrossValidationTrainer::new(backend, CvConfig::default().with_n_splits(5));
        let mut diag = Diagnostics::new();

        let outcome = trainer.run(&data, &mut diag).unwrap();
        assert!(diag
            .for_stage(Stage::Train)
            .any(|w| w.message.contains("least populated class")));
        assert_eq!(outcome.folds.len(), 5);
    }
}
