//! Label selection and cleaning of the feature matrix
//!
//! - [`TargetSelector`] splits a frame into features and label
//! - [`Preprocessor`] fills missing values, encodes text columns as categories
//!   and normalizes the label to `0/1`

mod cleaner;
mod encoder;
mod target;

pub use cleaner::{CleanedData, FeatureKind, FeatureMatrix, PreprocessConfig, Preprocessor};
pub use encoder::{CategoricalEncoder, LabelEncoding};
pub use target::{TargetSelector, TargetSource, TargetSplit, COMMON_TARGET_NAMES, MAX_TARGET_CARDINALITY};

use polars::prelude::DataType;

/// Signed or unsigned integer column
pub(crate) fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Integer or floating point column
pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || matches!(dtype, DataType::Float32 | DataType::Float64)
}
