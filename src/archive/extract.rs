//! ZIP extraction.

use super::{map_zip_error, ArchiveSummary};
use crate::XzipError;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{debug, info};
use zip::ZipArchive;

fn open(source: &Path) -> Result<ZipArchive<File>, XzipError> {
    let file = File::open(source)
        .map_err(|e| XzipError::ArchiveIO(format!("Cannot open {}: {}", source.display(), e)))?;
    ZipArchive::new(file).map_err(map_zip_error)
}

/// Name of the first encrypted entry, if any.
fn first_encrypted(archive: &mut ZipArchive<File>) -> Result<Option<String>, XzipError> {
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(map_zip_error)?;
        if entry.encrypted() {
            return Ok(Some(entry.name().to_string()));
        }
    }
    Ok(None)
}

/// Decrypt the first encrypted file entry in full, discarding the output.
///
/// ZipCrypto only checks one header byte up front, so a wrong password is
/// not reliably caught until the entry's checksum fails at the end.
fn check_password(archive: &mut ZipArchive<File>, password: &str) -> Result<(), XzipError> {
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(map_zip_error)?;
        if !entry.encrypted() || entry.is_dir() {
            continue;
        }
        drop(entry);

        let mut entry = archive
            .by_index_decrypt(i, password.as_bytes())
            .map_err(map_zip_error)?;
        return io::copy(&mut entry, &mut io::sink())
            .map(|_| ())
            .map_err(|e| {
                debug!(entry = %entry.name(), error = %e, "Password check failed");
                XzipError::InvalidPassword
            });
    }
    Ok(())
}

/// Whether any entry in the archive at `source` is encrypted.
pub fn is_encrypted(source: &Path) -> Result<bool, XzipError> {
    let mut archive = open(source)?;
    Ok(first_encrypted(&mut archive)?.is_some())
}

/// Extract the archive at `source` into `target`, creating it if needed.
///
/// Encrypted entries need `password`. A missing or wrong password is caught
/// before anything is written. Entries whose names would land outside
/// `target` are refused.
pub fn extract(
    source: &Path,
    target: &Path,
    password: Option<&str>,
) -> Result<ArchiveSummary, XzipError> {
    info!(source = %source.display(), target = %target.display(), "Extracting");

    let mut archive = open(source)?;

    match password {
        Some(password) => check_password(&mut archive, password)?,
        None => {
            if let Some(entry) = first_encrypted(&mut archive)? {
                return Err(XzipError::PasswordRequired { entry });
            }
        }
    }

    fs::create_dir_all(target)
        .map_err(|e| XzipError::ArchiveIO(format!("Cannot create {}: {}", target.display(), e)))?;

    let mut summary = ArchiveSummary::default();

    for i in 0..archive.len() {
        let encrypted = archive.by_index_raw(i).map_err(map_zip_error)?.encrypted();

        let mut entry = match (encrypted, password) {
            (true, Some(password)) => archive
                .by_index_decrypt(i, password.as_bytes())
                .map_err(map_zip_error)?,
            _ => archive.by_index(i).map_err(map_zip_error)?,
        };

        let name = entry.name().to_string();
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| XzipError::UnsafeEntry { entry: name.clone() })?;
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| {
                XzipError::ArchiveIO(format!("Cannot create {}: {}", out_path.display(), e))
            })?;
            summary.directories += 1;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                XzipError::ArchiveIO(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }

        let mut output = File::create(&out_path).map_err(|e| {
            XzipError::ArchiveIO(format!("Cannot create {}: {}", out_path.display(), e))
        })?;
        let written = io::copy(&mut entry, &mut output).map_err(|e| {
            if encrypted {
                // A wrong password can slip past the one-byte header check and
                // only show up as a checksum failure here.
                debug!(entry = %name, error = %e, "Encrypted entry failed to decode");
                XzipError::InvalidPassword
            } else {
                XzipError::ArchiveIO(format!("Cannot extract {}: {}", name, e))
            }
        })?;

        restore_mode(&out_path, entry.unix_mode())?;

        summary.files += 1;
        summary.bytes += written;
    }

    info!(
        files = summary.files,
        directories = summary.directories,
        bytes = summary.bytes,
        "Extraction complete"
    );
    Ok(summary)
}

#[cfg(unix)]
fn restore_mode(path: &Path, mode: Option<u32>) -> Result<(), XzipError> {
    use std::os::unix::fs::PermissionsExt;
    let Some(mode) = mode else {
        return Ok(());
    };
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777))
        .map_err(|e| XzipError::ArchiveIO(format!("Cannot set mode on {}: {}", path.display(), e)))
}

#[cfg(not(unix))]
fn restore_mode(_path: &Path, _mode: Option<u32>) -> Result<(), XzipError> {
    Ok(())
}
