//! Target column selection
//!
//! Strategy, first hit wins:
//! 1. explicit name (must exist)
//! 2. the first of [`COMMON_TARGET_NAMES`] present in the frame
//! 3. the integer/boolean/text column with the fewest distinct non-null values,
//!    at most [`MAX_TARGET_CARDINALITY`], ties broken by column order

use super::is_integer_dtype;
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::{Result, TrainerError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Label column names checked in order
pub const COMMON_TARGET_NAMES: [&str; 7] = [
    "target",
    "label",
    "y",
    "class",
    "satisfaction",
    "is_satisfied",
    "survived",
];

/// Largest distinct-value count the cardinality heuristic accepts
pub const MAX_TARGET_CARDINALITY: usize = 10;

/// How the target column was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSource {
    Explicit,
    CommonName,
    Heuristic { distinct: usize },
}

impl TargetSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetSource::Explicit => "explicit",
            TargetSource::CommonName => "common_name",
            TargetSource::Heuristic { .. } => "heuristic",
        }
    }
}

/// Features and label after target selection
#[derive(Debug, Clone)]
pub struct TargetSplit {
    pub features: DataFrame,
    pub labels: Series,
    pub target: String,
    pub source: TargetSource,
}

/// Chooses the label column of a dataset
#[derive(Debug, Clone)]
pub struct TargetSelector {
    common_names: Vec<String>,
    max_cardinality: usize,
}

impl Default for TargetSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetSelector {
    pub fn new() -> Self {
        Self {
            common_names: COMMON_TARGET_NAMES.iter().map(|s| s.to_string()).collect(),
            max_cardinality: MAX_TARGET_CARDINALITY,
        }
    }

    /// Replace the priority name list
    pub fn with_common_names(mut self, names: Vec<String>) -> Self {
        self.common_names = names;
        self
    }

    pub fn with_max_cardinality(mut self, max: usize) -> Self {
        self.max_cardinality = max;
        self
    }

    /// Split `frame` into features and label
    pub fn select(
        &self,
        frame: &DataFrame,
        explicit: Option<&str>,
        diag: &mut Diagnostics,
    ) -> Result<TargetSplit> {
        let columns: Vec<String> = frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        if let Some(requested) = explicit {
            if !columns.iter().any(|c| c == requested) {
                return Err(TrainerError::TargetColumnNotFound {
                    requested: requested.to_string(),
                    available: columns,
                });
            }
            return split(frame, requested, TargetSource::Explicit);
        }

        if let Some(name) = self
            .common_names
            .iter()
            .find(|name| columns.iter().any(|c| c == *name))
        {
            diag.warn(Stage::Target, format!("Using detected target column: '{}'", name));
            return split(frame, name, TargetSource::CommonName);
        }

        let mut best: Option<(&str, usize)> = None;
        for column in frame.get_columns() {
            let series = column.as_materialized_series();
            let dtype = series.dtype();
            let eligible = is_integer_dtype(dtype)
                || matches!(dtype, DataType::Boolean | DataType::String);
            if !eligible {
                continue;
            }
            let distinct = series.drop_nulls().n_unique()?;
            if distinct == 0 || distinct > self.max_cardinality {
                continue;
            }
            // Strict comparison keeps the earliest column on ties
            if best.map_or(true, |(_, d)| distinct < d) {
                best = Some((series.name().as_str(), distinct));
            }
        }

        match best {
            Some((name, distinct)) => {
                let name = name.to_string();
                diag.warn(
                    Stage::Target,
                    format!(
                        "Heuristic chose '{}' as target (unique values: {}). \
                         If this is wrong, re-run with --target-col <colname>.",
                        name, distinct
                    ),
                );
                split(frame, &name, TargetSource::Heuristic { distinct })
            }
            None => Err(TrainerError::NoTargetCandidate { available: columns }),
        }
    }
}

fn split(frame: &DataFrame, target: &str, source: TargetSource) -> Result<TargetSplit> {
    let labels = frame.column(target)?.as_materialized_series().clone();
    let features = frame.drop(target)?;
    info!(
        target = %target,
        source = ?source,
        features = features.width(),
        "Selected target column"
    );
    Ok(TargetSplit {
        features,
        labels,
        target: target.to_string(),
        source,
    })
}
