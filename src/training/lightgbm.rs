//! LightGBM-style gradient boosting with leaf-wise tree growth
//!
//! Binary classifier behind the built-in trainer backend:
//! - Leaf-wise (best-first) growth bounded by `num_leaves`
//! - One-vs-rest equality splits on categorical columns
//! - Validation monitoring with early stopping on `auc` or `binary_logloss`

use super::capability::{CapabilitySet, TrainerInfo};
use super::config::{BoostingParams, EvalMetric, FitOptions};
use super::metrics::{log_loss, roc_auc};
use super::models::{FitError, FitSummary, FoldClassifier, TrainerBackend};
use crate::error::{Result, TrainerError};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use tracing::debug;

pub const BACKEND_NAME: &str = "lightgbm-rs";
/// Fit signature generation the built-in booster implements
pub const BACKEND_VERSION: &str = "4.0.0";

const MIN_SUM_HESSIAN: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum SplitRule {
    /// `value <= threshold` goes left
    Threshold(f64),
    /// `value == category` goes left
    Category(f64),
}

impl SplitRule {
    fn goes_left(self, value: f64) -> bool {
        match self {
            SplitRule::Threshold(t) => value <= t,
            SplitRule::Category(c) => value == c,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum LGBNode {
    Leaf { value: f64 },
    Split {
        feature: usize,
        rule: SplitRule,
        gain: f64,
        left: Box<LGBNode>,
        right: Box<LGBNode>,
    },
}

impl LGBNode {
    fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        match self {
            LGBNode::Leaf { value } => *value,
            LGBNode::Split { feature, rule, left, right, .. } => {
                if rule.goes_left(row[*feature]) {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }

    fn accumulate_gain(&self, importance: &mut [f64]) {
        if let LGBNode::Split { feature, gain, left, right, .. } = self {
            importance[*feature] += *gain;
            left.accumulate_gain(importance);
            right.accumulate_gain(importance);
        }
    }
}

// ---- Tree building utilities ----

fn soft_threshold(g: f64, alpha: f64) -> f64 {
    if g.abs() <= alpha {
        0.0
    } else {
        g - alpha * g.signum()
    }
}

fn compute_leaf_weight(g: f64, h: f64, lambda: f64, alpha: f64) -> f64 {
    -soft_threshold(g, alpha) / (h + lambda)
}

fn leaf_score(g: f64, h: f64, lambda: f64, alpha: f64) -> f64 {
    let g = soft_threshold(g, alpha);
    g * g / (h + lambda)
}

/// Per-round inputs shared by every split search of one tree
struct GrowContext<'a> {
    x: ArrayView2<'a, f64>,
    gradients: &'a [f64],
    hessians: &'a [f64],
    categorical: &'a [bool],
    params: &'a BoostingParams,
}

impl GrowContext<'_> {
    fn sums(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(g, h), &i| {
            (g + self.gradients[i], h + self.hessians[i])
        })
    }

    fn make_leaf(&self, indices: &[usize]) -> LGBNode {
        let (g, h) = self.sums(indices);
        LGBNode::Leaf {
            value: compute_leaf_weight(g, h, self.params.reg_lambda, self.params.reg_alpha),
        }
    }

    fn split_gain(&self, left: (f64, f64), right: (f64, f64), parent: f64) -> f64 {
        let (lambda, alpha) = (self.params.reg_lambda, self.params.reg_alpha);
        leaf_score(left.0, left.1, lambda, alpha) + leaf_score(right.0, right.1, lambda, alpha)
            - parent
    }

    fn child_ok(&self, count: usize, hessian: f64) -> bool {
        count >= self.params.min_child_samples.max(1) && hessian >= MIN_SUM_HESSIAN
    }
}

struct SplitCandidate {
    feature: usize,
    rule: SplitRule,
    gain: f64,
    left_indices: Vec<usize>,
    right_indices: Vec<usize>,
}

fn find_numeric_split(ctx: &GrowContext<'_>, indices: &[usize], feature: usize) -> Option<SplitCandidate> {
    if indices.len() < 2 {
        return None;
    }
    let mut sorted: Vec<(usize, f64)> = indices.iter().map(|&i| (i, ctx.x[[i, feature]])).collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let (total_g, total_h) = ctx.sums(indices);
    let parent = leaf_score(total_g, total_h, ctx.params.reg_lambda, ctx.params.reg_alpha);

    let mut left_g = 0.0;
    let mut left_h = 0.0;
    let mut best_gain = 0.0;
    let mut best: Option<(f64, usize)> = None;

    for i in 0..sorted.len() - 1 {
        left_g += ctx.gradients[sorted[i].0];
        left_h += ctx.hessians[sorted[i].0];
        if sorted[i].1 == sorted[i + 1].1 {
            continue;
        }
        let right_h = total_h - left_h;
        if !ctx.child_ok(i + 1, left_h) || !ctx.child_ok(sorted.len() - i - 1, right_h) {
            continue;
        }

        let gain = ctx.split_gain((left_g, left_h), (total_g - left_g, right_h), parent);
        if gain > best_gain {
            best_gain = gain;
            best = Some(((sorted[i].1 + sorted[i + 1].1) / 2.0, i + 1));
        }
    }

    let (threshold, pos) = best?;
    Some(SplitCandidate {
        feature,
        rule: SplitRule::Threshold(threshold),
        gain: best_gain,
        left_indices: sorted[..pos].iter().map(|&(i, _)| i).collect(),
        right_indices: sorted[pos..].iter().map(|&(i, _)| i).collect(),
    })
}

fn find_categorical_split(ctx: &GrowContext<'_>, indices: &[usize], feature: usize) -> Option<SplitCandidate> {
    // keyed on the bit pattern so iteration order is fixed
    let mut stats: BTreeMap<u64, (f64, f64, usize)> = BTreeMap::new();
    for &i in indices {
        let entry = stats.entry(ctx.x[[i, feature]].to_bits()).or_insert((0.0, 0.0, 0));
        entry.0 += ctx.gradients[i];
        entry.1 += ctx.hessians[i];
        entry.2 += 1;
    }
    if stats.len() < 2 {
        return None;
    }

    let (total_g, total_h) = ctx.sums(indices);
    let parent = leaf_score(total_g, total_h, ctx.params.reg_lambda, ctx.params.reg_alpha);

    let mut best_gain = 0.0;
    let mut best_category = None;
    for (&bits, &(g, h, count)) in &stats {
        let right_h = total_h - h;
        if !ctx.child_ok(count, h) || !ctx.child_ok(indices.len() - count, right_h) {
            continue;
        }
        let gain = ctx.split_gain((g, h), (total_g - g, right_h), parent);
        if gain > best_gain {
            best_gain = gain;
            best_category = Some(f64::from_bits(bits));
        }
    }

    let category = best_category?;
    let (left_indices, right_indices) = indices
        .iter()
        .partition(|&&i| ctx.x[[i, feature]] == category);
    Some(SplitCandidate {
        feature,
        rule: SplitRule::Category(category),
        gain: best_gain,
        left_indices,
        right_indices,
    })
}

fn find_best_split(ctx: &GrowContext<'_>, indices: &[usize], features: &[usize]) -> Option<SplitCandidate> {
    let candidates: Vec<SplitCandidate> = features
        .par_iter()
        .filter_map(|&feat| {
            if ctx.categorical[feat] {
                find_categorical_split(ctx, indices, feat)
            } else {
                find_numeric_split(ctx, indices, feat)
            }
        })
        .collect();

    candidates
        .into_iter()
        .max_by(|a, b| a.gain.total_cmp(&b.gain))
}

struct PendingSplit {
    node_id: usize,
    split: SplitCandidate,
}

impl PartialEq for PendingSplit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingSplit {}

impl PartialOrd for PendingSplit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingSplit {
    fn cmp(&self, other: &Self) -> Ordering {
        // earlier nodes win ties so growth order is stable
        self.split
            .gain
            .total_cmp(&other.split.gain)
            .then_with(|| other.node_id.cmp(&self.node_id))
    }
}

enum NodeSlot {
    Leaf(Vec<usize>),
    Split {
        feature: usize,
        rule: SplitRule,
        gain: f64,
        left: usize,
        right: usize,
    },
}

/// Build one tree using leaf-wise (best-first) growth
fn build_lgb_tree(ctx: &GrowContext<'_>, indices: &[usize], features: &[usize]) -> LGBNode {
    let params = ctx.params;
    let max_depth = params.max_depth.unwrap_or(usize::MAX);
    let min_split_rows = params.min_child_samples.max(1) * 2;

    let mut nodes: Vec<NodeSlot> = vec![NodeSlot::Leaf(indices.to_vec())];
    let mut depths: Vec<usize> = vec![0];
    let mut heap: BinaryHeap<PendingSplit> = BinaryHeap::new();

    if indices.len() >= min_split_rows && max_depth > 0 {
        if let Some(split) = find_best_split(ctx, indices, features) {
            heap.push(PendingSplit { node_id: 0, split });
        }
    }

    let mut n_leaves = 1usize;
    while n_leaves < params.num_leaves {
        let Some(PendingSplit { node_id, split }) = heap.pop() else {
            break;
        };

        let depth = depths[node_id] + 1;
        let left_id = nodes.len();
        let right_id = left_id + 1;
        nodes[node_id] = NodeSlot::Split {
            feature: split.feature,
            rule: split.rule,
            gain: split.gain,
            left: left_id,
            right: right_id,
        };
        n_leaves += 1;

        for (child_indices, child_id) in [(split.left_indices, left_id), (split.right_indices, right_id)] {
            if depth < max_depth && child_indices.len() >= min_split_rows {
                if let Some(child_split) = find_best_split(ctx, &child_indices, features) {
                    heap.push(PendingSplit {
                        node_id: child_id,
                        split: child_split,
                    });
                }
            }
            nodes.push(NodeSlot::Leaf(child_indices));
            depths.push(depth);
        }
    }

    fn to_node(ctx: &GrowContext<'_>, nodes: &[NodeSlot], idx: usize) -> LGBNode {
        match &nodes[idx] {
            NodeSlot::Leaf(indices) => ctx.make_leaf(indices),
            NodeSlot::Split { feature, rule, gain, left, right } => LGBNode::Split {
                feature: *feature,
                rule: *rule,
                gain: *gain,
                left: Box::new(to_node(ctx, nodes, *left)),
                right: Box::new(to_node(ctx, nodes, *right)),
            },
        }
    }
    to_node(ctx, &nodes, 0)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn sample_rows(n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..n).collect();
    if ratio < 1.0 {
        let k = ((n as f64 * ratio).ceil() as usize).clamp(1, n);
        idx.shuffle(rng);
        idx.truncate(k);
        idx.sort_unstable();
    }
    idx
}

fn sample_features(n_features: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let n_selected = ((n_features as f64 * ratio).ceil() as usize).clamp(1, n_features.max(1));
    let mut features: Vec<usize> = (0..n_features).collect();
    features.shuffle(rng);
    features.truncate(n_selected);
    features.sort_unstable();
    features
}

fn score_metric(metric: EvalMetric, y: ArrayView1<'_, f64>, raw: &Array1<f64>) -> Option<f64> {
    let probs = raw.mapv(sigmoid);
    match metric {
        EvalMetric::Auc => roc_auc(y, probs.view()),
        EvalMetric::BinaryLogloss => log_loss(y, probs.view()),
    }
}

fn improved(metric: EvalMetric, score: f64, best: Option<f64>) -> bool {
    match best {
        None => true,
        Some(b) if metric.higher_is_better() => score > b,
        Some(b) => score < b,
    }
}

// ============ LightGBM Classifier ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightGbmClassifier {
    pub params: BoostingParams,
    seed: u64,
    accepted: CapabilitySet,
    trees: Vec<LGBNode>,
    base_score: f64,
    n_features: usize,
    fitted: bool,
}

impl LightGbmClassifier {
    /// Classifier accepting every optional fit argument
    pub fn new(params: BoostingParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            accepted: CapabilitySet::all(),
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
            fitted: false,
        }
    }

    /// Restrict the optional fit arguments this instance accepts
    pub fn with_accepted_options(mut self, accepted: CapabilitySet) -> Self {
        self.accepted = accepted;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn check_options(&self, options: &FitOptions<'_>) -> std::result::Result<(), FitError> {
        for kind in options.kinds() {
            if !self.accepted.accepts(kind) {
                return Err(FitError::UnsupportedOption(kind.keyword().to_string()));
            }
        }
        Ok(())
    }

    fn predict_raw(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        if !self.fitted {
            return Err(TrainerError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(TrainerError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        let lr = self.params.learning_rate;
        Ok(x.rows()
            .into_iter()
            .map(|row| self.base_score + self.trees.iter().map(|t| lr * t.predict(row)).sum::<f64>())
            .collect())
    }
}

impl FoldClassifier for LightGbmClassifier {
    fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        options: &FitOptions<'_>,
    ) -> std::result::Result<FitSummary, FitError> {
        self.check_options(options)?;

        let n = x.nrows();
        let n_features = x.ncols();
        if n == 0 {
            return Err(FitError::Failed("Empty dataset".into()));
        }
        if n != y.len() {
            return Err(FitError::Rejected(format!(
                "X has {} rows but y has {}",
                n,
                y.len()
            )));
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(FitError::Failed("binary labels must be 0 or 1".into()));
        }

        let patience = options.early_stopping_patience();
        if let Some(eval) = &options.eval_set {
            if eval.x.ncols() != n_features || eval.x.nrows() != eval.y.len() {
                return Err(FitError::Rejected(format!(
                    "eval_set shape {:?} does not match {} features",
                    eval.x.dim(),
                    n_features
                )));
            }
        } else if patience.is_some() {
            return Err(FitError::Rejected(
                "early stopping requires at least one validation set in eval_set".into(),
            ));
        }

        let mut categorical = vec![false; n_features];
        if let Some(columns) = &options.categorical_feature {
            for &col in columns {
                if col >= n_features {
                    return Err(FitError::Rejected(format!(
                        "categorical_feature index {col} out of range for {n_features} features"
                    )));
                }
                categorical[col] = true;
            }
        }

        let metric = options.eval_metric.unwrap_or(EvalMetric::BinaryLogloss);
        let pos_rate = (y.sum() / n as f64).clamp(1e-15, 1.0 - 1e-15);
        self.base_score = (pos_rate / (1.0 - pos_rate)).ln();
        self.n_features = n_features;
        self.trees.clear();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let mut raw = Array1::from_elem(n, self.base_score);
        let mut eval_raw = options
            .eval_set
            .as_ref()
            .map(|eval| Array1::from_elem(eval.x.nrows(), self.base_score));
        let mut best: Option<(usize, f64)> = None;
        let lr = self.params.learning_rate;

        for round in 0..self.params.n_estimators {
            let probs: Vec<f64> = raw.iter().map(|&r| sigmoid(r)).collect();
            let gradients: Vec<f64> = probs.iter().zip(y.iter()).map(|(&p, &yi)| p - yi).collect();
            let hessians: Vec<f64> = probs.iter().map(|&p| (p * (1.0 - p)).max(1e-16)).collect();

            let rows = sample_rows(n, self.params.subsample, &mut rng);
            let features = sample_features(n_features, self.params.colsample_bytree, &mut rng);
            let ctx = GrowContext {
                x: x.view(),
                gradients: &gradients,
                hessians: &hessians,
                categorical: &categorical,
                params: &self.params,
            };
            let tree = build_lgb_tree(&ctx, &rows, &features);

            for (i, row) in x.rows().into_iter().enumerate() {
                raw[i] += lr * tree.predict(row);
            }

            if let (Some(eval), Some(eval_raw)) = (&options.eval_set, eval_raw.as_mut()) {
                for (i, row) in eval.x.rows().into_iter().enumerate() {
                    eval_raw[i] += lr * tree.predict(row);
                }
                self.trees.push(tree);

                if let Some(score) = score_metric(metric, eval.y, eval_raw) {
                    if improved(metric, score, best.map(|b| b.1)) {
                        best = Some((round + 1, score));
                    }
                }
                if let (Some(p), Some((best_iter, _))) = (patience, best) {
                    if round + 1 - best_iter >= p {
                        debug!(round = round + 1, best_iteration = best_iter, "Early stopping");
                        break;
                    }
                }
            } else {
                self.trees.push(tree);
            }
        }

        if patience.is_some() {
            if let Some((best_iter, _)) = best {
                self.trees.truncate(best_iter);
            }
        }
        self.fitted = true;

        Ok(FitSummary {
            n_iterations: self.trees.len(),
            best_iteration: best.map(|b| b.0),
            best_score: best.map(|b| b.1),
        })
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Option<Array1<f64>>> {
        Ok(Some(self.predict_raw(x)?.mapv(sigmoid)))
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_raw(x)?
            .mapv(|r| if sigmoid(r) >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Total split gain per feature
    fn feature_importances(&self) -> Option<Array1<f64>> {
        if !self.fitted {
            return None;
        }
        let mut importance = vec![0.0; self.n_features];
        for tree in &self.trees {
            tree.accumulate_gain(&mut importance);
        }
        Some(Array1::from_vec(importance))
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }
}

/// Built-in backend producing [`LightGbmClassifier`]s
#[derive(Debug, Clone)]
pub struct LightGbmBackend {
    version: String,
}

impl Default for LightGbmBackend {
    fn default() -> Self {
        Self {
            version: BACKEND_VERSION.to_string(),
        }
    }
}

impl LightGbmBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emulate the fit signature of another trainer generation
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

impl TrainerBackend for LightGbmBackend {
    type Classifier = LightGbmClassifier;

    fn info(&self) -> TrainerInfo {
        TrainerInfo::new(BACKEND_NAME, self.version.clone())
    }

    fn new_classifier(&self, params: &BoostingParams, seed: u64) -> LightGbmClassifier {
        LightGbmClassifier::new(params.clone(), seed).with_accepted_options(self.accepted_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::config::{EvalSet, FitCallback, FitOptionKind};
    use ndarray::Array2;

    fn make_classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((100, 2), (0..200).map(|i| (i as f64) / 100.0).collect()).unwrap();
        let y = Array1::from_vec((0..100).map(|i| if i < 50 { 0.0 } else { 1.0 }).collect());
        (x, y)
    }

    fn small_params() -> BoostingParams {
        BoostingParams::default()
            .with_n_estimators(30)
            .with_num_leaves(8)
            .with_min_child_samples(2)
            .with_learning_rate(0.1)
            .with_sampling(1.0, 1.0)
    }

    #[test]
    fn test_lightgbm_classifier() {
        let (x, y) = make_classification_data();
        let mut model = LightGbmClassifier::new(small_params(), 42);
        let summary = model.fit(x.view(), y.view(), &FitOptions::none()).unwrap();
        assert_eq!(summary.n_iterations, 30);
        assert!(summary.best_iteration.is_none());

        let preds = model.predict(x.view()).unwrap();
        let acc = preds.iter().zip(y.iter()).filter(|(&p, &t)| p == t).count() as f64 / 100.0;
        assert!(acc > 0.9, "Accuracy too low: {}", acc);
    }

    #[test]
    fn test_predict_proba_in_unit_interval() {
        let (x, y) = make_classification_data();
        let mut model = LightGbmClassifier::new(small_params(), 42);
        model.fit(x.view(), y.view(), &FitOptions::none()).unwrap();
        let proba = model.predict_proba(x.view()).unwrap().unwrap();
        assert_eq!(proba.len(), 100);
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_early_stopping_truncates_to_best_iteration() {
        let (x, y) = make_classification_data();
        let params = small_params().with_n_estimators(200);
        let mut model = LightGbmClassifier::new(params, 42);
        let options = FitOptions {
            eval_set: Some(EvalSet { x: x.view(), y: y.view() }),
            callbacks: vec![FitCallback::EarlyStopping { rounds: 5 }],
            eval_metric: Some(EvalMetric::Auc),
            ..FitOptions::none()
        };

        let summary = model.fit(x.view(), y.view(), &options).unwrap();
        assert!(summary.n_iterations < 200);
        assert_eq!(Some(summary.n_iterations), summary.best_iteration);
        assert_eq!(model.n_trees(), summary.n_iterations);
    }

    #[test]
    fn test_unsupported_option_rejected() {
        let (x, y) = make_classification_data();
        let accepted = CapabilitySet::from_kinds([FitOptionKind::EvalSet]);
        let mut model = LightGbmClassifier::new(small_params(), 42).with_accepted_options(accepted);
        let options = FitOptions {
            eval_set: Some(EvalSet { x: x.view(), y: y.view() }),
            early_stopping_rounds: Some(10),
            ..FitOptions::none()
        };

        let err = model.fit(x.view(), y.view(), &options).unwrap_err();
        assert_eq!(err, FitError::UnsupportedOption("early_stopping_rounds".into()));
    }

    #[test]
    fn test_early_stopping_without_eval_set_rejected() {
        let (x, y) = make_classification_data();
        let mut model = LightGbmClassifier::new(small_params(), 42);
        let options = FitOptions {
            early_stopping_rounds: Some(10),
            ..FitOptions::none()
        };
        assert!(matches!(
            model.fit(x.view(), y.view(), &options),
            Err(FitError::Rejected(_))
        ));
    }

    #[test]
    fn test_categorical_equality_split() {
        // code 2 is the only positive level; threshold stumps cannot isolate it
        let codes = [0.0, 2.0, 1.0, 3.0];
        let x = Array2::from_shape_fn((80, 1), |(i, _)| codes[i % 4]);
        let y = Array1::from_shape_fn(80, |i| if codes[i % 4] == 2.0 { 1.0 } else { 0.0 });
        let params = small_params().with_num_leaves(2).with_n_estimators(10);

        let mut model = LightGbmClassifier::new(params, 7);
        let options = FitOptions {
            categorical_feature: Some(vec![0]),
            ..FitOptions::none()
        };
        model.fit(x.view(), y.view(), &options).unwrap();

        let proba = model.predict_proba(x.view()).unwrap().unwrap();
        assert_eq!(roc_auc(y.view(), proba.view()), Some(1.0));
        let importances = model.feature_importances().unwrap();
        assert!(importances[0] > 0.0);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let (x, y) = make_classification_data();
        let params = small_params().with_sampling(0.7, 0.5);
        let mut a = LightGbmClassifier::new(params.clone(), 3);
        let mut b = LightGbmClassifier::new(params, 3);
        a.fit(x.view(), y.view(), &FitOptions::none()).unwrap();
        b.fit(x.view(), y.view(), &FitOptions::none()).unwrap();
        assert_eq!(
            a.predict_proba(x.view()).unwrap(),
            b.predict_proba(x.view()).unwrap()
        );
    }

    #[test]
    fn test_bytes_roundtrip_preserves_predictions() {
        let (x, y) = make_classification_data();
        let mut model = LightGbmClassifier::new(small_params(), 42);
        model.fit(x.view(), y.view(), &FitOptions::none()).unwrap();

        let restored = LightGbmClassifier::from_bytes(&model.to_bytes().unwrap()).unwrap();
        assert_eq!(
            model.predict_proba(x.view()).unwrap(),
            restored.predict_proba(x.view()).unwrap()
        );
    }

    #[test]
    fn test_unfitted_predict_fails() {
        let model = LightGbmClassifier::new(small_params(), 42);
        let x = Array2::<f64>::zeros((2, 2));
        assert!(matches!(model.predict(x.view()), Err(TrainerError::ModelNotFitted)));
    }

    #[test]
    fn test_backend_versions() {
        let modern = LightGbmBackend::new();
        assert!(!modern.accepted_options().accepts(FitOptionKind::EarlyStoppingRounds));

        let legacy = LightGbmBackend::new().with_version("3.3.5");
        assert!(legacy.accepted_options().accepts(FitOptionKind::EarlyStoppingRounds));
    }
}
