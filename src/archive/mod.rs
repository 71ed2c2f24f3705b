//! ZIP archive creation and extraction.
//!
//! Entries use `/`-separated paths relative to the source root; directory
//! entries end with `/`; file entries are Deflate-compressed. A password
//! switches file entries to traditional ZIP encryption.

pub mod compress;
pub mod extract;

pub use compress::compress;
pub use extract::{extract, is_encrypted};

use crate::XzipError;
use zip::result::ZipError;

/// What an archive operation touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Regular files written.
    pub files: usize,
    /// Directory entries written.
    pub directories: usize,
    /// Uncompressed bytes of file content.
    pub bytes: u64,
}

fn map_zip_error(e: ZipError) -> XzipError {
    match e {
        ZipError::InvalidPassword => XzipError::InvalidPassword,
        ZipError::Io(e) => XzipError::ArchiveIO(e.to_string()),
        other => XzipError::Archive(other.to_string()),
    }
}
