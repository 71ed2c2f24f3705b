//! Client and server configuration.

use crate::XzipError;
use chrono::Utc;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default authorization endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://xzip.com/authorize";

/// Identity the authorization server certificate must carry.
pub const DEFAULT_SERVICE_IDENTITY: &str = "xzip.com";

/// Where users are sent when their key is rejected.
pub const DEFAULT_PURCHASE_URL: &str = "https://xzip.com";

/// Key file location relative to the user's home directory.
pub const KEY_FILE_RELATIVE: &str = ".xzip/key";

/// Default service name reported by `/health`.
pub const DEFAULT_SERVICE_NAME: &str = "xzip-authd";

/// Default number of successful validations an issued key allows.
pub const DEFAULT_MAX_USAGE: u64 = 100;

/// Default lifetime of an issued key.
pub const DEFAULT_KEY_VALIDITY_DAYS: i64 = 365;

/// Whether the client may produce and open password-protected archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionSupport {
    /// Passwords are accepted for compress and extract.
    #[default]
    Enabled,
    /// Password options are refused.
    Disabled,
}

impl EncryptionSupport {
    /// Whether passwords are allowed.
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Configuration for the license-gated client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full URL of the `/authorize` endpoint.
    pub auth_url: String,

    /// DNS name the server certificate must present (SAN or CN).
    /// SECURITY: transport chain checks are off; this pin is the only identity check.
    pub service_identity: String,

    /// Shown to users whose key was rejected.
    pub purchase_url: String,

    /// Local file holding the license key.
    pub key_file: PathBuf,

    /// Request timeout for the authorization call.
    pub timeout: Duration,

    /// Password capability of this client.
    pub encryption: EncryptionSupport,
}

impl ClientConfig {
    /// Build a config with the production endpoint and `~/.xzip/key`.
    pub fn new() -> Result<Self, XzipError> {
        Ok(Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            service_identity: DEFAULT_SERVICE_IDENTITY.to_string(),
            purchase_url: DEFAULT_PURCHASE_URL.to_string(),
            key_file: default_key_file()?,
            timeout: Duration::from_secs(30),
            encryption: EncryptionSupport::Enabled,
        })
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), XzipError> {
        if !self.auth_url.starts_with("https://") && !self.auth_url.starts_with("http://") {
            return Err(XzipError::Config(format!(
                "auth_url must be an http(s) URL, got {}",
                self.auth_url
            )));
        }
        if self.service_identity.trim().is_empty() {
            return Err(XzipError::Config(
                "service_identity cannot be empty".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(XzipError::Config("timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Resolve `~/.xzip/key`.
pub fn default_key_file() -> Result<PathBuf, XzipError> {
    let home = dirs::home_dir()
        .ok_or_else(|| XzipError::Config("Could not find home directory".to_string()))?;
    Ok(home.join(KEY_FILE_RELATIVE))
}

/// Configuration for the authorization server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: SocketAddr,

    /// Name reported by `/health` and the status page.
    pub service_name: String,

    /// Usage ceiling for keys issued without an explicit value.
    pub default_max_usage: u64,

    /// Lifetime of keys issued without an explicit value.
    pub default_validity: chrono::Duration,

    /// PEM certificate chain; HTTPS is served when both cert and key are set.
    pub tls_cert: Option<PathBuf>,

    /// PEM private key.
    pub tls_key: Option<PathBuf>,

    /// Bearer token required on `/admin/*` when set.
    pub admin_token: Option<String>,

    /// Insert the demo key set at startup.
    pub seed_demo_keys: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8443)),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            default_max_usage: DEFAULT_MAX_USAGE,
            default_validity: chrono::Duration::days(DEFAULT_KEY_VALIDITY_DAYS),
            tls_cert: None,
            tls_key: None,
            admin_token: None,
            seed_demo_keys: false,
        }
    }
}

impl ServerConfig {
    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), XzipError> {
        if self.service_name.is_empty() {
            return Err(XzipError::Config(
                "service_name cannot be empty".to_string(),
            ));
        }
        if self.default_max_usage == 0 {
            return Err(XzipError::Config(
                "default_max_usage must be at least 1".to_string(),
            ));
        }
        if self.default_validity <= chrono::Duration::zero() {
            return Err(XzipError::Config(
                "default_validity must be positive".to_string(),
            ));
        }
        if Utc::now().checked_add_signed(self.default_validity).is_none() {
            return Err(XzipError::Config(
                "default_validity is out of range".to_string(),
            ));
        }
        if self.tls_cert.is_some() != self.tls_key.is_some() {
            return Err(XzipError::Config(
                "tls_cert and tls_key must be given together".to_string(),
            ));
        }
        if matches!(self.admin_token.as_deref(), Some("")) {
            return Err(XzipError::Config(
                "admin_token cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
