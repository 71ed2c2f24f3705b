//! # XZip
//!
//! **License-gated ZIP archiving, plus the server that issues and checks the keys.**
//!
//! The `xzip` client refuses to compress or extract anything until its
//! locally stored license key has been accepted by the authorization server.
//! `xzip-authd` is that server: an in-memory key registry with enablement,
//! expiry and usage quotas behind a small JSON-over-HTTPS API.
//!
//! ## Features
//!
//! - **Atomic quota accounting**: validation holds the registry write lock
//!   across check and increment, so a key with `max_usage = N` is accepted at
//!   most N times no matter how many requests race
//! - **Opaque rejections**: unknown, disabled, expired and exhausted keys all
//!   get the same `-1` on the wire; reasons only reach the server log
//! - **Identity pinning**: the client accepts any TLS chain but checks the
//!   server certificate names the expected service before reading a reply
//! - **Password-protected archives**: traditional ZIP encryption, switchable
//!   off with a capability flag
//!
//! ## Quickstart
//!
//! ```no_run
//! use xzip::{ClientConfig, LicenseGate};
//! use std::path::Path;
//!
//! fn main() -> Result<(), xzip::XzipError> {
//!     let gate = LicenseGate::new(ClientConfig::new()?)?;
//!     let _authorization = gate.authorize()?;
//!
//!     xzip::archive::compress(Path::new("photos"), Path::new("photos.zip"), None)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Threat Model
//!
//! The gate protects against talking to an impostor server and against
//! reusing a key past its quota or expiry. It does **not** prevent binary
//! patching: client-side gating can always be bypassed by someone who
//! controls the binary.

#![warn(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Key material and certificate checks
pub mod crypto;

// Protocol layer
pub mod protocol;

// Key registry and validation
pub mod policy;
pub mod registry;

// Authorization server
pub mod server;

// Client transport and key file
pub mod client;

// License gate (main client API)
pub mod gate;

// Archive engine
pub mod archive;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::{ClientConfig, EncryptionSupport, ServerConfig};
pub use errors::XzipError;
pub use gate::{Authorization, LicenseGate};
pub use policy::validation::{Decision, RejectReason};
pub use protocol::models::AuthStatus;
pub use registry::record::KeyRecord;
pub use registry::store::KeyRegistry;
pub use server::AuthService;

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
