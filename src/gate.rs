//! License Gate - the client-side check in front of every archive operation.
//!
//! The `LicenseGate` runs the full authorization sequence:
//! - Read the locally stored key
//! - Send it to the authorization server
//! - Pin the server's certificate identity
//! - Interpret the status code
//!
//! Any failure is returned as an error and the caller must not proceed.

use crate::client::http::{AuthClient, AuthTransport, TransportReply};
use crate::client::keyfile::{ensure_key_file, read_key};
use crate::config::ClientConfig;
use crate::crypto::digest::key_fingerprint;
use crate::crypto::identity::verify_peer_identity;
use crate::protocol::models::{AuthRequest, AuthResponse, STATUS_ACCEPT, STATUS_REJECT};
use crate::XzipError;
use tracing::{debug, info, warn};

/// Proof that authorization succeeded.
///
/// Archive entry points in the CLI take one of these, so they cannot be
/// reached without a passing gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// Fingerprint of the key that was accepted.
    pub key_fingerprint: String,
}

/// Client-side license gate.
pub struct LicenseGate {
    config: ClientConfig,
    transport: Box<dyn AuthTransport>,
}

impl LicenseGate {
    /// Create a gate that talks to `config.auth_url` over HTTPS.
    ///
    /// # Errors
    /// Returns an error if configuration validation or HTTP client creation fails.
    pub fn new(config: ClientConfig) -> Result<Self, XzipError> {
        config.validate()?;
        let transport = AuthClient::new(&config)?;
        Ok(Self::with_transport(config, Box::new(transport)))
    }

    /// Create a gate with a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Box<dyn AuthTransport>) -> Self {
        Self { config, transport }
    }

    /// Authorize using the key stored in the configured key file.
    ///
    /// # Errors
    /// - `KeyFileCreated` - No key file existed; an empty one was created
    /// - `KeyFileEmpty` - The key file holds no key
    /// - `Transport` - The server could not be reached
    /// - `NotHttps` / `IdentityMismatch` - Server identity check failed
    /// - `Protocol` - Response body was not a status message
    /// - `Rejected` - The key was refused
    /// - `UnexpectedStatus` - Status outside the protocol
    pub fn authorize(&self) -> Result<Authorization, XzipError> {
        ensure_key_file(&self.config.key_file)?;
        let key = read_key(&self.config.key_file)?;
        self.authorize_key(&key)
    }

    /// Authorize an explicit key.
    pub fn authorize_key(&self, key: &str) -> Result<Authorization, XzipError> {
        let fingerprint = key_fingerprint(key);
        debug!(key = %fingerprint, "Authorizing license key");

        let reply = self.transport.post_authorize(&AuthRequest {
            key: key.to_string(),
        })?;

        // Identity before content: a body from an unverified peer is never read.
        verify_peer_identity(reply.peer_certificate.as_deref(), &self.config.service_identity)?;

        match parse_status(&reply)? {
            STATUS_ACCEPT => {
                info!(key = %fingerprint, "License authorized");
                Ok(Authorization {
                    key_fingerprint: fingerprint,
                })
            }
            STATUS_REJECT => {
                warn!(key = %fingerprint, "License rejected by server");
                Err(XzipError::Rejected {
                    purchase_url: self.config.purchase_url.clone(),
                })
            }
            status => Err(XzipError::UnexpectedStatus { status }),
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

fn parse_status(reply: &TransportReply) -> Result<i32, XzipError> {
    let body = reply.body_str()?;
    let response: AuthResponse = serde_json::from_str(body).map_err(|e| {
        XzipError::Protocol(format!(
            "Parse error (HTTP {}): {}",
            reply.status, e
        ))
    })?;
    Ok(response.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncryptionSupport;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    const SERVICE_CERT: &[u8] = include_bytes!("../tests/fixtures/service-cert.der");
    const IMPOSTOR_CERT: &[u8] = include_bytes!("../tests/fixtures/impostor-cert.der");

    struct MockTransport {
        reply: Result<TransportReply, String>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl AuthTransport for MockTransport {
        fn post_authorize(&self, request: &AuthRequest) -> Result<TransportReply, XzipError> {
            self.seen.lock().unwrap().push(request.key.clone());
            self.reply.clone().map_err(XzipError::Transport)
        }
    }

    fn test_config(key_file: PathBuf) -> ClientConfig {
        ClientConfig {
            auth_url: "https://xzip.com/authorize".to_string(),
            service_identity: "xzip.com".to_string(),
            purchase_url: "https://xzip.com".to_string(),
            key_file,
            timeout: Duration::from_secs(5),
            encryption: EncryptionSupport::Enabled,
        }
    }

    fn reply(cert: Option<&[u8]>, body: &str) -> TransportReply {
        TransportReply {
            status: 200,
            peer_certificate: cert.map(<[u8]>::to_vec),
            body: body.as_bytes().to_vec(),
        }
    }

    fn gate_with(
        key_file: PathBuf,
        reply: Result<TransportReply, String>,
    ) -> (LicenseGate, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let transport = MockTransport {
            reply,
            seen: seen.clone(),
        };
        (
            LicenseGate::with_transport(test_config(key_file), Box::new(transport)),
            seen,
        )
    }

    fn key_file_with(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("key");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_accept() {
        let dir = TempDir::new().unwrap();
        let path = key_file_with(&dir, "  cafebabe\n");
        let (gate, seen) = gate_with(path, Ok(reply(Some(SERVICE_CERT), r#"{"status":1}"#)));

        let auth = gate.authorize().unwrap();

        assert_eq!(auth.key_fingerprint, key_fingerprint("cafebabe"));
        assert_eq!(*seen.lock().unwrap(), vec!["cafebabe".to_string()]);
    }

    #[test]
    fn test_reject() {
        let dir = TempDir::new().unwrap();
        let path = key_file_with(&dir, "cafebabe");
        let (gate, _) = gate_with(path, Ok(reply(Some(SERVICE_CERT), r#"{"status":-1}"#)));

        let result = gate.authorize();

        assert!(matches!(
            result,
            Err(XzipError::Rejected { purchase_url }) if purchase_url == "https://xzip.com"
        ));
    }

    #[test]
    fn test_unexpected_status() {
        let dir = TempDir::new().unwrap();
        let path = key_file_with(&dir, "cafebabe");
        let (gate, _) = gate_with(path, Ok(reply(Some(SERVICE_CERT), r#"{"status":0}"#)));

        assert!(matches!(
            gate.authorize(),
            Err(XzipError::UnexpectedStatus { status: 0 })
        ));
    }

    #[test]
    fn test_malformed_body() {
        let dir = TempDir::new().unwrap();
        let path = key_file_with(&dir, "cafebabe");
        let (gate, _) = gate_with(path, Ok(reply(Some(SERVICE_CERT), "<html>oops</html>")));

        assert!(matches!(gate.authorize(), Err(XzipError::Protocol(_))));
    }

    #[test]
    fn test_identity_mismatch_wins_over_accept() {
        let dir = TempDir::new().unwrap();
        let path = key_file_with(&dir, "cafebabe");
        let (gate, _) = gate_with(path, Ok(reply(Some(IMPOSTOR_CERT), r#"{"status":1}"#)));

        assert!(matches!(
            gate.authorize(),
            Err(XzipError::IdentityMismatch { .. })
        ));
    }

    #[test]
    fn test_plain_http_refused() {
        let dir = TempDir::new().unwrap();
        let path = key_file_with(&dir, "cafebabe");
        let (gate, _) = gate_with(path, Ok(reply(None, r#"{"status":1}"#)));

        assert!(matches!(gate.authorize(), Err(XzipError::NotHttps)));
    }

    #[test]
    fn test_transport_error() {
        let dir = TempDir::new().unwrap();
        let path = key_file_with(&dir, "cafebabe");
        let (gate, _) = gate_with(path, Err("connection refused".to_string()));

        assert!(matches!(gate.authorize(), Err(XzipError::Transport(_))));
    }

    #[test]
    fn test_missing_key_file_never_contacts_server() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".xzip").join("key");
        let (gate, seen) = gate_with(path.clone(), Ok(reply(Some(SERVICE_CERT), r#"{"status":1}"#)));

        assert!(matches!(gate.authorize(), Err(XzipError::KeyFileCreated { .. })));
        assert!(path.exists());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_key_file_never_contacts_server() {
        let dir = TempDir::new().unwrap();
        let path = key_file_with(&dir, "\n");
        let (gate, seen) = gate_with(path, Ok(reply(Some(SERVICE_CERT), r#"{"status":1}"#)));

        assert!(matches!(gate.authorize(), Err(XzipError::KeyFileEmpty { .. })));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_new_validates_config() {
        let mut config = test_config(PathBuf::from("/tmp/key"));
        config.service_identity = String::new();
        assert!(matches!(LicenseGate::new(config), Err(XzipError::Config(_))));
    }
}
