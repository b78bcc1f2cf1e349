//! Directory scraping and streaming downloads from an ERDDAP file server
//!
//! ERDDAP exposes its files as plain HTML directory listings, one directory
//! per year. [`Downloader::download_files_from_server`] reads the listing for a
//! year, keeps every link pointing at a `.nc`, `.zip` or `.gz` file and streams
//! each one to `dir_path/{year}/{filename}`.

use crate::errors::{PolarFetchError, Result};
use reqwest::blocking::Client;
use reqwest::Url;
use scraper::{Html, Selector};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// PolarWatch ERDDAP directory holding the USNIC IMS 4km snow and ice files
pub const DEFAULT_SERVER: &str = "https://polarwatch.noaa.gov/erddap/files/usnic_ims_4km";

/// Suffixes of the files picked up from a directory listing
pub const DATA_EXTENSIONS: [&str; 3] = [".nc", ".zip", ".gz"];

/// Size of the buffer used to stream response bodies to disk
pub const CHUNK_SIZE: usize = 8192;

/// A downloadable file discovered in a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub url: Url,
    pub file_name: String,
}

/// Blocking HTTP downloader
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    chunk_size: usize,
}

impl Downloader {
    /// Create a downloader with a default blocking client
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(Client::builder().build()?))
    }

    /// Create a downloader around a preconfigured client (timeouts, proxies, headers)
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Override the streaming chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Download every data file listed under `{server}/{year}/` into `dir_path/{year}`.
    ///
    /// The year directory is created first. A failing listing request aborts
    /// before any file is downloaded; a failing file download aborts the rest.
    /// Returns the local paths in listing order.
    #[instrument(skip(self, dir_path), fields(dir = %dir_path.as_ref().display()))]
    pub fn download_files_from_server<P: AsRef<Path>>(
        &self,
        server: &str,
        year: &str,
        dir_path: P,
    ) -> Result<Vec<PathBuf>> {
        let year_dir = dir_path.as_ref().join(year);
        if !year_dir.exists() {
            info!("{} doesn't exist. Creating directory ..", year_dir.display());
            fs::create_dir_all(&year_dir)?;
        }

        let files = self.list_remote_files(server, year)?;
        info!("Found {} data files for {}", files.len(), year);

        let mut downloaded = Vec::with_capacity(files.len());
        for remote in files {
            let path = year_dir.join(&remote.file_name);
            downloaded.push(self.download_file(remote.url.as_str(), path)?);
        }

        Ok(downloaded)
    }

    /// Fetch the listing for `{server}/{year}/` and return the data file links it contains
    #[instrument(skip(self))]
    pub fn list_remote_files(&self, server: &str, year: &str) -> Result<Vec<RemoteFile>> {
        let base = year_url(server, year)?;

        debug!("Requesting directory listing");
        let response = self.client.get(base.clone()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(PolarFetchError::HttpStatus {
                url: base.to_string(),
                status,
            });
        }

        let html = response.text()?;
        debug!("Retrieved listing, size: {} bytes", html.len());

        scrape_file_links(&html, &base)
    }

    /// Stream `url` to `path`, replacing any existing file.
    ///
    /// Nothing is written when the server answers with a non-success status.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn download_file<P: AsRef<Path>>(&self, url: &str, path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        let mut response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(PolarFetchError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let mut file = File::create(path)?;
        let mut buffer = vec![0u8; self.chunk_size];
        let mut written: u64 = 0;
        loop {
            let n = response.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n])?;
            written += n as u64;
        }
        file.flush()?;

        debug!("Wrote {} bytes", written);
        info!("Downloaded: {}", path.display());
        Ok(path.to_path_buf())
    }
}

/// Download every data file for `year` with a default [`Downloader`]
pub fn download_files_from_server<P: AsRef<Path>>(
    server: &str,
    year: &str,
    dir_path: P,
) -> Result<Vec<PathBuf>> {
    Downloader::new()?.download_files_from_server(server, year, dir_path)
}

/// Stream a single URL to `path` with a default [`Downloader`]
pub fn download_file<P: AsRef<Path>>(url: &str, path: P) -> Result<PathBuf> {
    Downloader::new()?.download_file(url, path)
}

/// Directory URL of a year on the server, always with a trailing slash
pub fn year_url(server: &str, year: &str) -> Result<Url> {
    let raw = format!("{}/{}/", server.trim_end_matches('/'), year);
    Url::parse(&raw).map_err(|e| PolarFetchError::InvalidUrl {
        url: raw.clone(),
        message: e.to_string(),
    })
}

/// True when `path` ends in one of [`DATA_EXTENSIONS`]
pub fn has_data_extension(path: &str) -> bool {
    DATA_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Extract the data file links of an HTML directory listing.
///
/// Only anchors whose `href` ends in a [`DATA_EXTENSIONS`] suffix are kept,
/// in document order, resolved against `base`. Data links that cannot be
/// resolved are skipped.
pub fn scrape_file_links(html: &str, base: &Url) -> Result<Vec<RemoteFile>> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]")
        .map_err(|e| PolarFetchError::HtmlParse(format!("{:?}", e)))?;

    let mut files = Vec::new();
    for element in document.select(&anchors) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        if !has_data_extension(href) {
            continue;
        }

        let url = match base.join(href) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping unresolvable link '{}': {}", href, e);
                continue;
            }
        };

        let file_name = url
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        if let Some(file_name) = file_name {
            debug!("Selected {}", file_name);
            files.push(RemoteFile { url, file_name });
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_data_extension() {
        assert!(has_data_extension("ims2024001_4km_v1.3.nc"));
        assert!(has_data_extension("ims2024001_4km_v1.3.nc.gz"));
        assert!(has_data_extension("bundle.zip"));
        assert!(!has_data_extension("readme.csv"));
        assert!(!has_data_extension("2024/"));
    }

    #[test]
    fn test_year_url_trailing_slash() {
        let url = year_url("https://example.org/erddap/files/ims/", "2024").unwrap();
        assert_eq!(url.as_str(), "https://example.org/erddap/files/ims/2024/");

        let url = year_url(DEFAULT_SERVER, "2023").unwrap();
        assert_eq!(
            url.as_str(),
            "https://polarwatch.noaa.gov/erddap/files/usnic_ims_4km/2023/"
        );
    }

    #[test]
    fn test_year_url_invalid() {
        let result = year_url("not a url", "2024");
        assert!(matches!(result, Err(PolarFetchError::InvalidUrl { .. })));
    }

    #[test]
    fn test_scrape_file_links_filters_suffixes() {
        let html = r#"
            <html><body>
            <a href="../">Parent Directory</a>
            <a href="?C=N;O=D">Name</a>
            <a href="a.nc">a.nc</a>
            <a href="b.csv">b.csv</a>
            <a href="c.gz">c.gz</a>
            <a href="d.zip">d.zip</a>
            <a>no href</a>
            </body></html>
        "#;
        let base = Url::parse("https://example.org/files/2024/").unwrap();

        let files = scrape_file_links(html, &base).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.nc", "c.gz", "d.zip"]);
        assert_eq!(files[1].url.as_str(), "https://example.org/files/2024/c.gz");
    }

    #[test]
    fn test_scrape_file_links_query_and_malformed_hrefs() {
        let html = r#"
            <a href="a.nc?download=1">query</a>
            <a href="http://[::1">broken</a>
            <a href="http://[bad.nc">broken data link</a>
            <a href="e.nc">e.nc</a>
        "#;
        let base = Url::parse("https://example.org/files/2024/").unwrap();

        let files = scrape_file_links(html, &base).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["e.nc"]);
    }

    #[test]
    fn test_scrape_file_links_absolute_href() {
        let html = r#"<a href="/erddap/files/ims/2024/x.nc.gz">x</a>"#;
        let base = Url::parse("https://example.org/erddap/files/ims/2024/").unwrap();

        let files = scrape_file_links(html, &base).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "x.nc.gz");
        assert_eq!(
            files[0].url.as_str(),
            "https://example.org/erddap/files/ims/2024/x.nc.gz"
        );
    }

    #[test]
    fn test_chunk_size_never_zero() {
        let downloader = Downloader::with_client(Client::new()).with_chunk_size(0);
        assert_eq!(downloader.chunk_size(), 1);
    }
}
