//! Resolution of a path-like data source to a loaded dataset
//!
//! Order of resolution:
//! 1. An existing directory: the first recognized file (CSV names sorted, then
//!    Parquet names sorted) is loaded; more than one candidate is a warning.
//! 2. An existing file: loaded by extension, unknown extensions through the CSV reader.
//! 3. A missing path: the sibling path with the other recognized extension.
//! 4. The fallback directory (`<cwd>/data/processed` unless configured).
//! 5. Otherwise [`TrainerError::DataNotFound`] with the cwd and a listing of `./data`.

use super::loader::{DataFormat, DataLoader};
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::{Result, TrainerError};
use polars::prelude::DataFrame;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Which resolution rule produced the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Directory { candidates: usize },
    File,
    SiblingExtension,
    FallbackDirectory,
}

/// A loaded dataset plus where it came from
#[derive(Debug, Clone)]
pub struct ResolvedDataset {
    pub frame: DataFrame,
    pub source: PathBuf,
    pub resolution: Resolution,
}

/// Turns a file, directory or misnamed path into a [`ResolvedDataset`]
#[derive(Debug, Clone)]
pub struct DataResolver {
    loader: DataLoader,
    working_dir: PathBuf,
    fallback_dir: Option<PathBuf>,
}

impl Default for DataResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DataResolver {
    pub fn new() -> Self {
        Self {
            loader: DataLoader::new(),
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            fallback_dir: None,
        }
    }

    /// Directory used for the diagnostic listing and the default fallback
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Override the conventional `data/processed` fallback directory
    pub fn with_fallback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = Some(dir.into());
        self
    }

    pub fn with_loader(mut self, loader: DataLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn fallback_dir(&self) -> PathBuf {
        self.fallback_dir
            .clone()
            .unwrap_or_else(|| self.working_dir.join("data").join("processed"))
    }

    /// Resolve and load the dataset
    pub fn resolve(&self, path: &Path, diag: &mut Diagnostics) -> Result<ResolvedDataset> {
        if path.is_dir() {
            let candidates = candidate_files(path)?;
            let Some(chosen) = candidates.first() else {
                return Err(TrainerError::DataNotFound {
                    path: path.to_path_buf(),
                    cwd: self.working_dir.clone(),
                    listing: format!("No .csv or .parquet files in directory. {}", self.data_listing()),
                });
            };
            if candidates.len() > 1 {
                diag.warn(
                    Stage::Resolve,
                    format!(
                        "multiple candidate files found in {}. Picking: {}",
                        path.display(),
                        chosen.display()
                    ),
                );
            }
            return self.finish(chosen, Resolution::Directory { candidates: candidates.len() });
        }

        if path.exists() {
            return self.finish(path, Resolution::File);
        }

        let alt = sibling_path(path);
        debug!(requested = %path.display(), alternative = %alt.display(), "Trying sibling extension");
        if alt.is_file() {
            diag.warn(
                Stage::Resolve,
                format!(
                    "requested '{}' not found, loaded '{}' instead",
                    path.display(),
                    alt.display()
                ),
            );
            return self.finish(&alt, Resolution::SiblingExtension);
        }

        let fallback = self.fallback_dir();
        if fallback.is_dir() {
            if let Some(chosen) = candidate_files(&fallback)?.into_iter().next() {
                diag.warn(
                    Stage::Resolve,
                    format!(
                        "'{}' not found, loading first candidate from {}: {}",
                        path.display(),
                        fallback.display(),
                        chosen.display()
                    ),
                );
                return self.finish(&chosen, Resolution::FallbackDirectory);
            }
        }

        Err(TrainerError::DataNotFound {
            path: path.to_path_buf(),
            cwd: self.working_dir.clone(),
            listing: self.data_listing(),
        })
    }

    fn finish(&self, path: &Path, resolution: Resolution) -> Result<ResolvedDataset> {
        let frame = self.loader.load_auto(path)?;
        info!(
            source = %path.display(),
            rows = frame.height(),
            cols = frame.width(),
            resolution = ?resolution,
            "Loaded dataset"
        );
        Ok(ResolvedDataset {
            frame,
            source: path.to_path_buf(),
            resolution,
        })
    }

    fn data_listing(&self) -> String {
        let data_dir = self.working_dir.join("data");
        match list_dir(&data_dir) {
            Some(entries) => format!("Contents of ./data: {:?}", entries),
            None => "Contents of ./data: N/A".to_string(),
        }
    }
}

/// Recognized files in `dir`: CSV names sorted, then Parquet names sorted.
pub fn candidate_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut by_format: Vec<Vec<PathBuf>> = vec![Vec::new(); DataFormat::ALL.len()];

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        // Only exact lowercase extensions count, matching a `*.csv` glob
        let ext = path.extension().and_then(|e| e.to_str());
        if let Some(slot) = DataFormat::ALL.iter().position(|f| Some(f.extension()) == ext) {
            by_format[slot].push(path);
        }
    }

    Ok(by_format
        .into_iter()
        .flat_map(|mut paths| {
            paths.sort();
            paths
        })
        .collect())
}

/// Same path with the other recognized extension
fn sibling_path(path: &Path) -> PathBuf {
    let target = DataFormat::from_path(path).map_or(DataFormat::Csv, DataFormat::sibling);
    path.with_extension(target.extension())
}

fn list_dir(dir: &Path) -> Option<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Some(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(path: &Path, marker: &str) {
        fs::write(path, format!("x,marker\n1,{marker}\n2,{marker}\n")).unwrap();
    }

    #[test]
    fn test_sibling_path() {
        assert_eq!(sibling_path(Path::new("d/a.csv")), PathBuf::from("d/a.parquet"));
        assert_eq!(sibling_path(Path::new("d/a.parquet")), PathBuf::from("d/a.csv"));
        assert_eq!(sibling_path(Path::new("d/a")), PathBuf::from("d/a.csv"));
        assert_eq!(sibling_path(Path::new("d/a.PARQUET")), PathBuf::from("d/a.csv"));
    }

    #[test]
    fn test_candidates_csv_before_parquet() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.parquet"), b"").unwrap();
        fs::write(dir.path().join("z.csv"), b"").unwrap();
        fs::write(dir.path().join("b.csv"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let names: Vec<String> = candidate_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.csv", "z.csv", "a.parquet"]);
    }

    #[test]
    fn test_existing_file_loads_without_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        write_csv(&path, "a");

        let mut diag = Diagnostics::new();
        let resolved = DataResolver::new()
            .with_working_dir(dir.path())
            .resolve(&path, &mut diag)
            .unwrap();
        assert_eq!(resolved.resolution, Resolution::File);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_fallback_directory() {
        let dir = tempfile::tempdir().unwrap();
        let processed = dir.path().join("data").join("processed");
        fs::create_dir_all(&processed).unwrap();
        write_csv(&processed.join("clean.csv"), "fallback");

        let mut diag = Diagnostics::new();
        let resolved = DataResolver::new()
            .with_working_dir(dir.path())
            .resolve(&dir.path().join("missing.parquet"), &mut diag)
            .unwrap();
        assert_eq!(resolved.resolution, Resolution::FallbackDirectory);
        assert_eq!(resolved.source, processed.join("clean.csv"));
        assert_eq!(diag.len(), 1);
    }

    #[test]
    fn test_not_found_reports_cwd_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data").join("readme.md"), b"").unwrap();

        let mut diag = Diagnostics::new();
        let err = DataResolver::new()
            .with_working_dir(dir.path())
            .resolve(&dir.path().join("nope.csv"), &mut diag)
            .unwrap_err();

        match &err {
            TrainerError::DataNotFound { cwd, listing, .. } => {
                assert_eq!(cwd, dir.path());
                assert!(listing.contains("readme.md"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("nope.csv"));
    }

    #[test]
    fn test_empty_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut diag = Diagnostics::new();
        let err = DataResolver::new()
            .with_working_dir(dir.path())
            .resolve(dir.path(), &mut diag)
            .unwrap_err();
        assert!(matches!(err, TrainerError::DataNotFound { .. }));
    }
}
