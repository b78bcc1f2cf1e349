//! Centralized error handling for polar_fetch
//!
//! Every fallible operation in the crate returns [`Result`], so callers deal
//! with a single error type whether a failure came from the network, the
//! filesystem, or the NetCDF library.

use std::fmt;
use std::path::PathBuf;

/// Main error type for polar_fetch operations
#[derive(Debug)]
pub enum PolarFetchError {
    /// HTTP transport errors (connection, body read, client construction)
    Http(reqwest::Error),

    /// Server answered with a non-success status
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// URL could not be built or resolved
    InvalidUrl { url: String, message: String },

    /// Directory listing could not be parsed
    HtmlParse(String),

    /// File suffix is not one the loader accepts
    InvalidExtension { path: PathBuf },

    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Variable not found in dataset
    VariableNotFound { var: String },

    /// Datasets could not be combined
    ConcatError { message: String },

    /// Every file of a batch load failed
    NothingLoaded { attempted: usize },

    /// Generic error
    Generic(String),
}

impl fmt::Display for PolarFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolarFetchError::Http(e) => write!(f, "HTTP request failed: {}", e),
            PolarFetchError::HttpStatus { url, status } => {
                write!(f, "HTTP request to '{}' failed with status {}", url, status)
            }
            PolarFetchError::InvalidUrl { url, message } => {
                write!(f, "Invalid URL '{}': {}", url, message)
            }
            PolarFetchError::HtmlParse(msg) => write!(f, "Failed to parse directory listing: {}", msg),
            PolarFetchError::InvalidExtension { path } => write!(
                f,
                "File extension must be .gz or .nc: {}",
                path.display()
            ),
            PolarFetchError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            PolarFetchError::IoError(e) => write!(f, "I/O error: {}", e),
            PolarFetchError::ArrayError(e) => write!(f, "Array error: {}", e),
            PolarFetchError::VariableNotFound { var } => {
                write!(f, "Variable '{}' not found in dataset", var)
            }
            PolarFetchError::ConcatError { message } => {
                write!(f, "Cannot concatenate datasets: {}", message)
            }
            PolarFetchError::NothingLoaded { attempted } => write!(
                f,
                "no file was loaded ({} attempted). Check the file path",
                attempted
            ),
            PolarFetchError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for PolarFetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PolarFetchError::Http(e) => Some(e),
            PolarFetchError::NetCDFError(e) => Some(e),
            PolarFetchError::IoError(e) => Some(e),
            PolarFetchError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl PolarFetchError {
    /// True for the invalid-argument class of failures.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, PolarFetchError::InvalidExtension { .. })
    }
}

impl From<reqwest::Error> for PolarFetchError {
    fn from(error: reqwest::Error) -> Self {
        PolarFetchError::Http(error)
    }
}

impl From<netcdf::Error> for PolarFetchError {
    fn from(error: netcdf::Error) -> Self {
        PolarFetchError::NetCDFError(error)
    }
}

impl From<std::io::Error> for PolarFetchError {
    fn from(error: std::io::Error) -> Self {
        PolarFetchError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for PolarFetchError {
    fn from(error: ndarray::ShapeError) -> Self {
        PolarFetchError::ArrayError(error)
    }
}

impl From<String> for PolarFetchError {
    fn from(error: String) -> Self {
        PolarFetchError::Generic(error)
    }
}

impl From<&str> for PolarFetchError {
    fn from(error: &str) -> Self {
        PolarFetchError::Generic(error.to_string())
    }
}

/// Result type alias for polar_fetch operations
pub type Result<T> = std::result::Result<T, PolarFetchError>;
