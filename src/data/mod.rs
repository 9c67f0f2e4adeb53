//! Data source resolution and tabular I/O

pub mod loader;
pub mod resolver;

pub use loader::{DataFormat, DataLoader, DataSaver};
pub use resolver::{candidate_files, DataResolver, Resolution, ResolvedDataset};
