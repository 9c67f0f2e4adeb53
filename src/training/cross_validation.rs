//! Stratified k-fold splitting

use crate::error::{Result, TrainerError};
use ndarray::ArrayView1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single train/validation split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSplit {
    pub fold: usize,
    pub train_indices: Vec<usize>,
    pub valid_indices: Vec<usize>,
}

/// Stratified K-Fold (maintains class distribution).
///
/// Rows of each class are shuffled with the seed and dealt round-robin into
/// folds; the dealing position carries over from one class to the next so
/// fold sizes differ by at most one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle: bool,
    seed: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self {
            n_splits,
            shuffle: true,
            seed,
        }
    }

    /// Keep rows in input order within each class
    pub fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Size of the smallest class, for the caller's balance warning
    pub fn min_class_count(y: ArrayView1<'_, f64>) -> usize {
        group_by_class(y).values().map(Vec::len).min().unwrap_or(0)
    }

    /// Generate `n_splits` splits over the rows of `y`
    pub fn split(&self, y: ArrayView1<'_, f64>) -> Result<Vec<FoldSplit>> {
        let n_samples = y.len();
        if self.n_splits < 2 {
            return Err(TrainerError::InvalidConfig(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < self.n_splits {
            return Err(TrainerError::InvalidConfig(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, self.n_splits
            )));
        }

        let mut class_indices = group_by_class(y);
        if class_indices.values().all(|rows| rows.len() < self.n_splits) {
            return Err(TrainerError::InvalidConfig(format!(
                "n_splits={} cannot be greater than the number of members in each class",
                self.n_splits
            )));
        }

        if self.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        let mut offset = 0;
        for indices in class_indices.values() {
            for (i, &idx) in indices.iter().enumerate() {
                folds[(offset + i) % self.n_splits].push(idx);
            }
            offset += indices.len();
        }
        for fold in &mut folds {
            fold.sort_unstable();
        }

        let splits = (0..self.n_splits)
            .map(|fold| {
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();
                FoldSplit {
                    fold,
                    train_indices,
                    valid_indices: folds[fold].clone(),
                }
            })
            .collect();

        Ok(splits)
    }
}

fn group_by_class(y: ArrayView1<'_, f64>) -> BTreeMap<i64, Vec<usize>> {
    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        class_indices.entry(val.round() as i64).or_default().push(idx);
    }
    class_indices
}
