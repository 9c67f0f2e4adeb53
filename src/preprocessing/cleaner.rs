//! Feature cleaning and label normalization

use super::encoder::{format_number, CategoricalEncoder, LabelEncoding};
use super::is_numeric_dtype;
use super::target::TargetSplit;
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Preprocessing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Replacement for missing feature values
    pub fill_value: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { fill_value: 0.0 }
    }
}

/// How a feature column is presented to the trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureKind {
    Numeric,
    /// Values are codes into `levels`
    Categorical { levels: CategoricalEncoder },
}

impl FeatureKind {
    pub fn is_categorical(&self) -> bool {
        matches!(self, FeatureKind::Categorical { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            FeatureKind::Numeric => "float64".to_string(),
            FeatureKind::Categorical { levels } => format!("category({})", levels.cardinality()),
        }
    }
}

/// Dense row-major feature matrix with per-column metadata
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub values: Array2<f64>,
    pub names: Vec<String>,
    pub kinds: Vec<FeatureKind>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    /// Names of the categorical columns, in column order
    pub fn categorical_names(&self) -> Vec<String> {
        self.names
            .iter()
            .zip(&self.kinds)
            .filter(|(_, kind)| kind.is_categorical())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// `name: dtype` for every column
    pub fn dtype_summary(&self) -> Vec<String> {
        self.names
            .iter()
            .zip(&self.kinds)
            .map(|(name, kind)| format!("{}: {}", name, kind.describe()))
            .collect()
    }
}

/// Training-ready features and `0/1` labels
#[derive(Debug, Clone)]
pub struct CleanedData {
    pub features: FeatureMatrix,
    pub labels: Array1<f64>,
    pub label_encoding: LabelEncoding,
}

/// Cleans a [`TargetSplit`] into [`CleanedData`]
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Clean the output of target selection
    pub fn process(&self, split: &TargetSplit, diag: &mut Diagnostics) -> Result<CleanedData> {
        self.clean(&split.features, &split.labels, diag)
    }

    /// Fill missing values, encode text columns, and normalize the label
    pub fn clean(
        &self,
        features: &DataFrame,
        labels: &Series,
        diag: &mut Diagnostics,
    ) -> Result<CleanedData> {
        if features.height() != labels.len() {
            return Err(TrainerError::ShapeMismatch {
                features: features.height(),
                labels: labels.len(),
            });
        }

        let fill = self.config.fill_value;
        let fill_text = format_number(fill);
        let n_rows = features.height();

        let mut names = Vec::with_capacity(features.width());
        let mut kinds = Vec::with_capacity(features.width());
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(features.width());
        let mut filled = 0usize;
        let mut converted = Vec::new();

        for column in features.get_columns() {
            let series = column.as_materialized_series();
            let name = series.name().to_string();

            if is_numeric_dtype(series.dtype()) || matches!(series.dtype(), DataType::Boolean) {
                let cast = series.cast(&DataType::Float64)?;
                let values: Vec<f64> = cast
                    .f64()?
                    .into_iter()
                    .map(|v| match v {
                        Some(x) if !x.is_nan() => x,
                        _ => {
                            filled += 1;
                            fill
                        }
                    })
                    .collect();
                columns.push(values);
                kinds.push(FeatureKind::Numeric);
            } else {
                let cast = series.cast(&DataType::String)?;
                let ca = cast.str()?;
                filled += ca.null_count();
                let raw: Vec<&str> = ca
                    .into_iter()
                    .map(|v| v.unwrap_or(fill_text.as_str()))
                    .collect();
                let encoder = CategoricalEncoder::fit(raw.iter().copied().map(Some));
                let codes = raw
                    .iter()
                    .map(|v| encoder.code(v).map(|c| c as f64).unwrap_or(fill))
                    .collect();
                debug!(column = %name, levels = encoder.cardinality(), "Encoded categorical column");
                columns.push(codes);
                kinds.push(FeatureKind::Categorical { levels: encoder });
                converted.push(name.clone());
            }
            names.push(name);
        }

        if filled > 0 {
            diag.warn(
                Stage::Preprocess,
                format!("NaNs found in X ({} values). Filled with: {}", filled, fill_text),
            );
        }
        if !converted.is_empty() {
            diag.warn(
                Stage::Preprocess,
                format!("Converted object cols to category: {:?}", converted),
            );
        }

        let col_refs: Vec<&[f64]> = columns.iter().map(|c| c.as_slice()).collect();
        let values = Array2::from_shape_fn((n_rows, col_refs.len()), |(r, c)| col_refs[c][r]);

        let (label_encoding, codes) = LabelEncoding::fit_transform(labels)?;
        if label_encoding.encoded {
            diag.warn(
                Stage::Preprocess,
                format!("Label-encoded y. Classes: {:?}", label_encoding.classes),
            );
        }

        info!(
            rows = n_rows,
            features = names.len(),
            categorical = converted.len(),
            "Preprocessed features"
        );

        Ok(CleanedData {
            features: FeatureMatrix { values, names, kinds },
            labels: Array1::from_vec(codes),
            label_encoding,
        })
    }
}
