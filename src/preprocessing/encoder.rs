//! Categorical and label encodings

use super::is_numeric_dtype;
use crate::error::{Result, TrainerError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Maps the distinct values of a text column to dense integer codes.
///
/// Levels are sorted, so the code of a value does not depend on row order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CategoricalEncoder {
    levels: Vec<String>,
    index: HashMap<String, usize>,
}

impl From<Vec<String>> for CategoricalEncoder {
    fn from(levels: Vec<String>) -> Self {
        Self::from_levels(levels)
    }
}

impl From<CategoricalEncoder> for Vec<String> {
    fn from(encoder: CategoricalEncoder) -> Self {
        encoder.levels
    }
}

impl PartialEq for CategoricalEncoder {
    fn eq(&self, other: &Self) -> bool {
        self.levels == other.levels
    }
}

impl CategoricalEncoder {
    /// Fit on the non-null values of `values`
    pub fn fit<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        let levels: BTreeSet<&str> = values.into_iter().flatten().collect();
        Self::from_levels(levels.into_iter().map(str::to_string).collect())
    }

    pub fn from_levels(levels: Vec<String>) -> Self {
        let index = levels
            .iter()
            .enumerate()
            .map(|(i, level)| (level.clone(), i))
            .collect();
        Self { levels, index }
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn code(&self, value: &str) -> Option<usize> {
        self.index.get(value).copied()
    }

    pub fn cardinality(&self) -> usize {
        self.levels.len()
    }
}

/// Mapping from raw label values to the `0/1` codes used for training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoding {
    /// Raw label rendered as text, indexed by code
    pub classes: Vec<String>,
    /// False when the raw labels were already `0/1`
    pub encoded: bool,
}

impl LabelEncoding {
    /// Label whose probability the classifier reports
    pub fn positive_class(&self) -> Option<&str> {
        self.classes.get(1).map(String::as_str)
    }

    /// Fit the encoding on `labels` and return the encoded vector.
    ///
    /// Numeric labels already in `{0, 1}` pass through. Any other label set
    /// is encoded by sorted value. Exactly two classes are required.
    pub fn fit_transform(labels: &Series) -> Result<(Self, Vec<f64>)> {
        let missing = labels.null_count();
        if missing > 0 {
            return Err(TrainerError::MissingLabels { count: missing });
        }

        let (encoding, codes) = if is_numeric_dtype(labels.dtype()) {
            encode_numeric(labels)?
        } else {
            encode_text(labels)?
        };

        match encoding.classes.len() {
            2 => Ok((encoding, codes)),
            n if n < 2 => Err(TrainerError::InsufficientClasses { found: n }),
            n => Err(TrainerError::TooManyClasses { found: n }),
        }
    }
}

fn encode_numeric(labels: &Series) -> Result<(LabelEncoding, Vec<f64>)> {
    let cast = labels.cast(&DataType::Float64)?;
    let values: Vec<f64> = cast.f64()?.into_no_null_iter().collect();
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(TrainerError::DataError(format!("non-finite label value: {bad}")));
    }

    let mut distinct = values.clone();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();

    let classes: Vec<String> = distinct.iter().map(|v| format_number(*v)).collect();
    if distinct.iter().all(|v| *v == 0.0 || *v == 1.0) && distinct.len() == 2 {
        return Ok((LabelEncoding { classes, encoded: false }, values));
    }

    let codes = values
        .iter()
        .map(|v| distinct.partition_point(|d| d < v) as f64)
        .collect();
    Ok((LabelEncoding { classes, encoded: true }, codes))
}

fn encode_text(labels: &Series) -> Result<(LabelEncoding, Vec<f64>)> {
    let cast = labels.cast(&DataType::String)?;
    let ca = cast.str()?;
    let encoder = CategoricalEncoder::fit(ca.into_iter());
    let codes = ca
        .into_iter()
        .map(|v| {
            v.and_then(|s| encoder.code(s))
                .map(|c| c as f64)
                .ok_or(TrainerError::MissingLabels { count: 1 })
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok((
        LabelEncoding {
            classes: encoder.levels().to_vec(),
            encoded: true,
        },
        codes,
    ))
}

/// Render a float the way it would appear in a CSV cell
pub(crate) fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}
