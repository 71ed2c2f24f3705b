//! Request and response bodies for the authorization and admin endpoints.

use serde::{Deserialize, Serialize};

/// Status code for an accepted key.
pub const STATUS_ACCEPT: i32 = 1;

/// Status code for any rejection or malformed request.
pub const STATUS_REJECT: i32 = -1;

/// Body of `POST /authorize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// The license key being presented.
    pub key: String,
}

/// Body returned by `POST /authorize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// `1` on acceptance, `-1` otherwise.
    pub status: i32,
}

/// Binary authorization outcome as seen on the wire.
///
/// Callers cannot tell *why* a key was rejected from this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// Key accepted; one use has been counted.
    Accept,
    /// Key rejected for any reason.
    Reject,
}

impl AuthStatus {
    /// Numeric wire code.
    pub fn code(self) -> i32 {
        match self {
            Self::Accept => STATUS_ACCEPT,
            Self::Reject => STATUS_REJECT,
        }
    }
}

impl From<AuthStatus> for AuthResponse {
    fn from(status: AuthStatus) -> Self {
        Self {
            status: status.code(),
        }
    }
}

/// Body returned by `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server is answering.
    pub status: String,
    /// Server time in unix seconds.
    pub timestamp: i64,
    /// Service name.
    pub service: String,
}

/// Optional body of `POST /admin/addkey`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddKeyRequest {
    /// Usage ceiling for the new key.
    #[serde(default)]
    pub max_usage: Option<u64>,
    /// Lifetime of the new key in days.
    #[serde(default)]
    pub valid_days: Option<i64>,
}

/// Body returned by `POST /admin/addkey`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddKeyResponse {
    /// The newly issued key.
    pub key: String,
    /// Human-readable confirmation.
    pub message: String,
    /// Expiry time, RFC 3339.
    pub expires: String,
}

/// Body returned by `GET /admin/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Number of keys ever issued.
    pub total_keys: usize,
    /// Keys that are enabled and not yet expired.
    pub valid_keys: usize,
    /// Sum of all usage counts.
    pub total_usage: u64,
    /// Server time, RFC 3339.
    pub server_time: String,
}

/// JSON error body for admin failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// What went wrong.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_wire_format() {
        let accept = serde_json::to_string(&AuthResponse::from(AuthStatus::Accept)).unwrap();
        let reject = serde_json::to_string(&AuthResponse::from(AuthStatus::Reject)).unwrap();
        assert_eq!(accept, r#"{"status":1}"#);
        assert_eq!(reject, r#"{"status":-1}"#);
    }

    #[test]
    fn test_auth_request_parse() {
        let req: AuthRequest = serde_json::from_str(r#"{"key":"00ff"}"#).unwrap();
        assert_eq!(req.key, "00ff");
    }

    #[test]
    fn test_auth_request_missing_key_fails() {
        assert!(serde_json::from_str::<AuthRequest>(r#"{"token":"00ff"}"#).is_err());
    }

    #[test]
    fn test_add_key_request_defaults() {
        let req: AddKeyRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, AddKeyRequest::default());

        let req: AddKeyRequest = serde_json::from_str(r#"{"max_usage":5}"#).unwrap();
        assert_eq!(req.max_usage, Some(5));
        assert_eq!(req.valid_days, None);
    }

    #[test]
    fn test_stats_response_field_names() {
        let stats = StatsResponse {
            total_keys: 3,
            valid_keys: 2,
            total_usage: 7,
            server_time: "2025-01-15T12:00:00+00:00".to_string(),
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["total_keys"], 3);
        assert_eq!(value["valid_keys"], 2);
        assert_eq!(value["total_usage"], 7);
        assert_eq!(value["server_time"], "2025-01-15T12:00:00+00:00");
    }
}
