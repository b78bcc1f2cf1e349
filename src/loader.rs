//! Dataset loading from local `.nc` and `.nc.gz` files
//!
//! [`load_nc_file`] loads one file and fails on any problem. [`load_mfiles`]
//! loads many, skipping the files that fail, and concatenates the rest
//! along [`TIME_DIM`].

use crate::dataset::{concat_datasets, Dataset, TIME_DIM};
use crate::errors::{PolarFetchError, Result};
use crate::gzip::unzip_to_nc;
use crate::netcdf_io::{open_dataset, open_dataset_from_bytes};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// On-disk encodings the loader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    NetCdf,
    GzipNetCdf,
}

impl FileFormat {
    /// Classify a path by suffix without touching the filesystem
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path.to_string_lossy();
        if name.ends_with(".gz") {
            Ok(FileFormat::GzipNetCdf)
        } else if name.ends_with(".nc") {
            Ok(FileFormat::NetCdf)
        } else {
            Err(PolarFetchError::InvalidExtension {
                path: path.to_path_buf(),
            })
        }
    }
}

/// A file that could not be loaded during a batch load
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: PolarFetchError,
}

/// Per-file outcome of a batch load
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<PathBuf>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn attempted(&self) -> usize {
        self.loaded.len() + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Load a `.nc` file, or a gzip-compressed one ending in `.gz`.
///
/// Any other suffix is rejected before the file is opened.
pub fn load_nc_file<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    match FileFormat::from_path(path)? {
        FileFormat::GzipNetCdf => {
            let buffer = unzip_to_nc(path)?;
            open_dataset_from_bytes(buffer.get_ref(), path)
        }
        FileFormat::NetCdf => open_dataset(path),
    }
}

/// Load every file and concatenate the successes along `time`.
///
/// Files that fail are logged and skipped. Fails only if none could be loaded
/// or the loaded datasets cannot be combined.
pub fn load_mfiles<P: AsRef<Path>>(paths: &[P]) -> Result<Dataset> {
    load_mfiles_with_report(paths).map(|(dataset, _)| dataset)
}

/// Like [`load_mfiles`], also returning which files were loaded and why others failed
pub fn load_mfiles_with_report<P: AsRef<Path>>(paths: &[P]) -> Result<(Dataset, LoadReport)> {
    let mut report = LoadReport::default();
    let mut datasets = Vec::with_capacity(paths.len());

    for path in paths {
        let path = path.as_ref();
        match load_nc_file(path) {
            Ok(dataset) => {
                datasets.push(dataset);
                report.loaded.push(path.to_path_buf());
            }
            Err(error) => {
                warn!("Failed to load file {}: {}", path.display(), error);
                report.failures.push(LoadFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }

    if datasets.is_empty() {
        return Err(PolarFetchError::NothingLoaded {
            attempted: report.attempted(),
        });
    }

    let combined = concat_datasets(datasets, TIME_DIM)?;
    info!(
        "Successfully loaded list of files ({} of {})",
        report.loaded.len(),
        report.attempted()
    );

    Ok((combined, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_format_from_path() {
        assert_eq!(
            FileFormat::from_path(Path::new("ims2024001_4km.nc")).unwrap(),
            FileFormat::NetCdf
        );
        assert_eq!(
            FileFormat::from_path(Path::new("ims2024001_4km.nc.gz")).unwrap(),
            FileFormat::GzipNetCdf
        );
        assert!(FileFormat::from_path(Path::new("bundle.zip")).is_err());
        assert!(FileFormat::from_path(Path::new("data.NC")).is_err());
    }

    #[test]
    fn test_load_nc_file_rejects_suffix_without_io() {
        // The path does not exist; only the suffix check can fail here
        let result = load_nc_file("/nonexistent/dir/notes.txt");
        match result {
            Err(PolarFetchError::InvalidExtension { path }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/dir/notes.txt"));
            }
            other => panic!("Expected InvalidExtension, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_mfiles_empty_list() {
        let paths: Vec<PathBuf> = Vec::new();
        let result = load_mfiles(&paths);
        assert!(matches!(
            result,
            Err(PolarFetchError::NothingLoaded { attempted: 0 })
        ));
    }
}
