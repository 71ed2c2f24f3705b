//! Reqwest-based transport for the authorization call.
//!
//! The TLS layer is configured to accept any certificate chain. Instead of
//! trusting it, the client captures the leaf certificate of every response so
//! the gate can pin the service identity itself.

use crate::config::ClientConfig;
use crate::protocol::models::AuthRequest;
use crate::XzipError;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::tls::TlsInfo;
use std::time::Duration;
use tracing::debug;

/// What came back from the authorization server.
#[derive(Debug, Clone)]
pub struct TransportReply {
    /// HTTP status code.
    pub status: u16,

    /// DER of the leaf certificate, `None` when the connection was not TLS.
    pub peer_certificate: Option<Vec<u8>>,

    /// Raw response body.
    pub body: Vec<u8>,
}

impl TransportReply {
    fn from_response(response: Response) -> Result<Self, XzipError> {
        let status = response.status().as_u16();

        let peer_certificate = response
            .extensions()
            .get::<TlsInfo>()
            .and_then(|info| info.peer_certificate())
            .map(<[u8]>::to_vec);

        let body = response
            .bytes()
            .map_err(|e| XzipError::Transport(format!("Failed to read body: {}", e)))?
            .to_vec();

        Ok(Self {
            status,
            peer_certificate,
            body,
        })
    }

    /// Get the body as a UTF-8 string.
    pub fn body_str(&self) -> Result<&str, XzipError> {
        std::str::from_utf8(&self.body)
            .map_err(|e| XzipError::Protocol(format!("Invalid UTF-8 in body: {}", e)))
    }
}

/// Sends an authorization request somewhere and returns the raw reply.
pub trait AuthTransport: Send + Sync {
    /// POST `request` to the authorization endpoint.
    fn post_authorize(&self, request: &AuthRequest) -> Result<TransportReply, XzipError>;
}

/// HTTPS client for the `/authorize` endpoint.
pub struct AuthClient {
    client: Client,
    url: String,
    user_agent: String,
}

impl AuthClient {
    /// Create a client from config.
    pub fn new(config: &ClientConfig) -> Result<Self, XzipError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            url: config.auth_url.clone(),
            user_agent: build_user_agent(),
        })
    }

    /// Rebuild the client with a different request timeout.
    pub fn try_with_timeout(mut self, timeout: Duration) -> Result<Self, XzipError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// The endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl AuthTransport for AuthClient {
    fn post_authorize(&self, request: &AuthRequest) -> Result<TransportReply, XzipError> {
        let body = serde_json::to_vec(request)
            .map_err(|e| XzipError::Protocol(format!("Failed to serialize: {}", e)))?;

        debug!(url = %self.url, "Sending authorization request");

        let response = self
            .client
            .post(&self.url)
            .header(USER_AGENT, &self.user_agent)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .map_err(|e| XzipError::Transport(format!("Request failed: {}", e)))?;

        TransportReply::from_response(response)
    }
}

fn build_client(timeout: Duration) -> Result<Client, XzipError> {
    Client::builder()
        .use_rustls_tls()
        // Chain validation is replaced by the identity pin in the gate.
        .danger_accept_invalid_certs(true)
        .tls_info(true)
        .timeout(timeout)
        .build()
        .map_err(|e| XzipError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Build a User-Agent string.
///
/// Format: `xzip/<version>`
pub fn build_user_agent() -> String {
    format!("xzip/{}", env!("CARGO_PKG_VERSION"))
}
