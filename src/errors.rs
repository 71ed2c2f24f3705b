//! XZip error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while authorizing, archiving or serving keys.
///
/// The validation engine itself never produces one of these: every key
/// decision is a plain value. These cover the layers around it.
#[derive(Debug, Error)]
pub enum XzipError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The key file did not exist and an empty one was created.
    #[error("Created empty key file at {}; write your license key into it", path.display())]
    KeyFileCreated {
        /// Location of the new key file.
        path: PathBuf,
    },

    /// The key file exists but holds no key.
    #[error("Key file {} is empty; write your license key into it", path.display())]
    KeyFileEmpty {
        /// Location of the key file.
        path: PathBuf,
    },

    /// Key file I/O error.
    #[error("Key file I/O error: {0}")]
    KeyFileIO(String),

    /// HTTP transport error talking to the authorization server.
    #[error("Authorization transport error: {0}")]
    Transport(String),

    /// The authorization response did not arrive over TLS.
    #[error("Connection to the authorization server is not HTTPS")]
    NotHttps,

    /// The server certificate does not carry the expected service identity.
    #[error("Server certificate does not match {expected}; make sure you are talking to the real service")]
    IdentityMismatch {
        /// The identity the client was pinned to.
        expected: String,
    },

    /// Failed to parse an authorization protocol message.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server rejected the license key.
    #[error("Authorization rejected: purchase a license key at {purchase_url} to keep using xzip")]
    Rejected {
        /// Where a valid key can be obtained.
        purchase_url: String,
    },

    /// The server answered with a status code outside the protocol.
    #[error("Unexpected authorization status: {status}")]
    UnexpectedStatus {
        /// The status received.
        status: i32,
    },

    /// Archive file I/O error.
    #[error("Archive I/O error: {0}")]
    ArchiveIO(String),

    /// Malformed or unsupported archive.
    #[error("Archive error: {0}")]
    Archive(String),

    /// An encrypted entry was found but no password was supplied.
    #[error("Entry {entry} is encrypted but no password was provided")]
    PasswordRequired {
        /// Name of the encrypted entry.
        entry: String,
    },

    /// The supplied password does not decrypt the archive.
    #[error("Invalid archive password")]
    InvalidPassword,

    /// An archive entry would be written outside the extraction directory.
    #[error("Refusing to extract entry outside the target directory: {entry}")]
    UnsafeEntry {
        /// Name of the offending entry.
        entry: String,
    },

    /// Authorization server failed to start or run.
    #[error("Server error: {0}")]
    Server(String),
}
