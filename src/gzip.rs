//! In-memory gzip decompression

use crate::errors::Result;
use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;
use tracing::debug;

/// Decompress a `.gz` file entirely into memory.
///
/// Concatenated gzip members are decoded as one stream. The returned cursor
/// is positioned at the start of the decompressed bytes.
pub fn unzip_to_nc<P: AsRef<Path>>(path: P) -> Result<Cursor<Vec<u8>>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut decoder = MultiGzDecoder::new(BufReader::new(file));

    let mut content = Vec::new();
    decoder.read_to_end(&mut content)?;
    debug!(
        "Decompressed {} into {} bytes",
        path.display(),
        content.len()
    );

    Ok(Cursor::new(content))
}
