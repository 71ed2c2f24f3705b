//! Locally stored license key.
//!
//! A single plaintext file, `~/.xzip/key` by default. Surrounding
//! whitespace is ignored.

use crate::XzipError;
use std::fs;
use std::path::Path;
use tracing::info;

/// Make sure the key file exists.
///
/// When it is missing, its directory (owner-only on unix) and an empty file
/// are created and `KeyFileCreated` is returned so the caller can tell the
/// user to populate it.
pub fn ensure_key_file(path: &Path) -> Result<(), XzipError> {
    if path.exists() {
        return Ok(());
    }

    prepare_dir(path)?;

    fs::write(path, b"")
        .map_err(|e| XzipError::KeyFileIO(format!("Failed to create {}: {}", path.display(), e)))?;

    info!(path = %path.display(), "Created empty key file");
    Err(XzipError::KeyFileCreated {
        path: path.to_path_buf(),
    })
}

/// Read the license key, trimming surrounding whitespace.
pub fn read_key(path: &Path) -> Result<String, XzipError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| XzipError::KeyFileIO(format!("Failed to read {}: {}", path.display(), e)))?;

    let key = contents.trim();
    if key.is_empty() {
        return Err(XzipError::KeyFileEmpty {
            path: path.to_path_buf(),
        });
    }

    Ok(key.to_string())
}

/// Write a key, creating the directory if needed.
pub fn write_key(path: &Path, key: &str) -> Result<(), XzipError> {
    prepare_dir(path)?;

    // Atomic write via temp + rename
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, format!("{}\n", key.trim()))
        .map_err(|e| XzipError::KeyFileIO(format!("Failed to write temp: {}", e)))?;
    fs::rename(&temp_path, path)
        .map_err(|e| XzipError::KeyFileIO(format!("Failed to rename: {}", e)))?;

    Ok(())
}

/// Create the key file's directory, owner-only, unless it already exists.
fn prepare_dir(path: &Path) -> Result<(), XzipError> {
    let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if dir.exists() {
        return Ok(());
    }

    fs::create_dir_all(dir)
        .map_err(|e| XzipError::KeyFileIO(format!("Failed to create {}: {}", dir.display(), e)))?;
    restrict_dir(dir)
}

#[cfg(unix)]
fn restrict_dir(dir: &Path) -> Result<(), XzipError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
        .map_err(|e| XzipError::KeyFileIO(format!("Failed to restrict {}: {}", dir.display(), e)))
}

#[cfg(not(unix))]
fn restrict_dir(_dir: &Path) -> Result<(), XzipError> {
    Ok(())
}
