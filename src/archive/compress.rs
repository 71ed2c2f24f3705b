//! Directory-to-ZIP compression.

use super::{map_zip_error, ArchiveSummary};
use crate::XzipError;
use ignore::WalkBuilder;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use zip::unstable::write::FileOptionsExt;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Compress `source` (a directory or a single file) into a new archive at
/// `target`.
///
/// With a password, every file entry is written with traditional ZIP
/// encryption. A partially written `target` is removed on failure.
pub fn compress(
    source: &Path,
    target: &Path,
    password: Option<&str>,
) -> Result<ArchiveSummary, XzipError> {
    info!(source = %source.display(), target = %target.display(), encrypted = password.is_some(), "Compressing");

    let metadata = fs::metadata(source)
        .map_err(|e| XzipError::ArchiveIO(format!("Cannot read {}: {}", source.display(), e)))?;

    let file = File::create(target)
        .map_err(|e| XzipError::ArchiveIO(format!("Cannot create {}: {}", target.display(), e)))?;
    let mut zip = ZipWriter::new(file);

    let result = if metadata.is_dir() {
        let skip = fs::canonicalize(target).ok();
        write_tree(&mut zip, source, skip.as_deref(), password)
    } else {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| XzipError::Archive(format!("No file name in {}", source.display())))?;
        let mut summary = ArchiveSummary::default();
        write_file(&mut zip, source, &name, password, &mut summary).map(|_| summary)
    };

    let summary = match result.and_then(|summary| zip.finish().map(|_| summary).map_err(map_zip_error)) {
        Ok(summary) => summary,
        Err(e) => {
            let _ = fs::remove_file(target);
            return Err(e);
        }
    };

    info!(
        files = summary.files,
        directories = summary.directories,
        bytes = summary.bytes,
        "Compression complete"
    );
    Ok(summary)
}

fn write_tree(
    zip: &mut ZipWriter<File>,
    root: &Path,
    skip: Option<&Path>,
    password: Option<&str>,
) -> Result<ArchiveSummary, XzipError> {
    let mut summary = ArchiveSummary::default();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        let entry = entry.map_err(|e| XzipError::ArchiveIO(format!("Walk failed: {}", e)))?;
        if entry.depth() == 0 {
            continue;
        }

        let path = entry.path();
        let Some(file_type) = entry.file_type() else {
            continue;
        };

        if skip.is_some() && fs::canonicalize(path).ok().as_deref() == skip {
            debug!(path = %path.display(), "Skipping the archive being written");
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .map_err(|e| XzipError::Archive(format!("Path outside source: {}", e)))?;
        let name = entry_name(relative)?;

        if file_type.is_dir() {
            zip.add_directory(format!("{}/", name), entry_options(path, None))
                .map_err(map_zip_error)?;
            summary.directories += 1;
        } else if file_type.is_file() {
            write_file(zip, path, &name, password, &mut summary)?;
        } else {
            warn!(path = %path.display(), "Skipping special file");
        }
    }

    Ok(summary)
}

fn write_file(
    zip: &mut ZipWriter<File>,
    path: &Path,
    name: &str,
    password: Option<&str>,
    summary: &mut ArchiveSummary,
) -> Result<(), XzipError> {
    let mut input = File::open(path)
        .map_err(|e| XzipError::ArchiveIO(format!("Cannot open {}: {}", path.display(), e)))?;

    let options = entry_options(path, password).compression_method(CompressionMethod::Deflated);
    zip.start_file(name, options).map_err(map_zip_error)?;

    let written = io::copy(&mut input, zip)
        .map_err(|e| XzipError::ArchiveIO(format!("Cannot write {}: {}", name, e)))?;

    summary.files += 1;
    summary.bytes += written;
    Ok(())
}

fn entry_options(path: &Path, password: Option<&str>) -> SimpleFileOptions {
    let mut options = SimpleFileOptions::default();
    if let Some(mode) = unix_mode(path) {
        options = options.unix_permissions(mode);
    }
    if let Some(password) = password {
        options = options.with_deprecated_encryption(password.as_bytes());
    }
    options
}

#[cfg(unix)]
fn unix_mode(path: &Path) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).ok().map(|m| m.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn unix_mode(_path: &Path) -> Option<u32> {
    None
}

/// Turn a relative path into a `/`-separated entry name.
fn entry_name(relative: &Path) -> Result<String, XzipError> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(XzipError::Archive(format!(
                    "Unsupported path component in {}",
                    relative.display()
                )))
            }
        }
    }
    if parts.is_empty() {
        return Err(XzipError::Archive("Empty entry name".to_string()));
    }
    Ok(parts.join("/"))
}

/// Default archive name for a source: `<name>.zip` next to it.
pub fn default_target(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    source.with_file_name(format!("{}.zip", name))
}
