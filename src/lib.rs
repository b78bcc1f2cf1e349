//! polar_fetch: fetch and load PolarWatch ERDDAP NetCDF files
//!
//! A small library for downloading NetCDF (and gzip-compressed NetCDF) files
//! from an ERDDAP file server and loading them into in-memory datasets.
//!
//! ## Module Organization
//!
//! - [`download`]: directory listing scraper and streaming file downloads
//! - [`gzip`]: in-memory gzip decompression
//! - [`loader`]: single and multi-file dataset loading
//! - [`dataset`]: the in-memory dataset model and concatenation
//! - [`netcdf_io`]: reading and writing NetCDF files
//! - [`metadata`]: dataset inspection and quick statistics
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use polar_fetch::prelude::*;
//!
//! // Download every file of 2024 into ./data/2024
//! let files = download_files_from_server(DEFAULT_SERVER, "2024", "data").unwrap();
//!
//! // Load them into one dataset concatenated along time
//! let dataset = load_mfiles(&files).unwrap();
//! polar_fetch::metadata::print_metadata(&dataset);
//! ```
//!
//! All operations are blocking. Progress is reported through `tracing`
//! events; install a subscriber to see them.

pub mod dataset;
pub mod download;
pub mod errors;
pub mod gzip;
pub mod loader;
pub mod metadata;
pub mod netcdf_io;

pub use dataset::*;
pub use download::*;
pub use errors::*;
pub use gzip::*;
pub use loader::*;
pub use metadata::*;
pub use netcdf_io::*;

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::dataset::{concat_datasets, DataVariable, Dataset, TIME_DIM};
    pub use crate::download::{
        download_file, download_files_from_server, Downloader, DEFAULT_SERVER,
    };
    pub use crate::errors::{PolarFetchError, Result};
    pub use crate::gzip::unzip_to_nc;
    pub use crate::loader::{load_mfiles, load_mfiles_with_report, load_nc_file, LoadReport};
}
