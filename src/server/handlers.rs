//! HTTP handlers for the authorization server.

use crate::protocol::models::{
    AddKeyRequest, AddKeyResponse, AuthRequest, AuthResponse, AuthStatus, ErrorResponse,
    HealthResponse, StatsResponse,
};
use crate::server::page::render_status_page;
use crate::server::AppState;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use tracing::{debug, warn};

/// Headers attached to `/authorize` responses so browser clients may call it.
const CORS_HEADERS: [(header::HeaderName, &str); 3] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
];

/// `POST /authorize`.
///
/// Unreadable or unparseable bodies get the reject status, never a
/// transport error.
pub async fn authorize(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> impl IntoResponse {
    let request = body
        .map_err(|e| e.body_text())
        .and_then(|body| serde_json::from_slice::<AuthRequest>(&body).map_err(|e| e.to_string()));

    let status = match request {
        Ok(request) => state.service.authorize(&request.key),
        Err(e) => {
            warn!(error = %e, "Malformed authorization request");
            AuthStatus::Reject
        }
    };

    (CORS_HEADERS, Json(AuthResponse::from(status)))
}

/// `OPTIONS /authorize` pre-flight.
pub async fn preflight() -> impl IntoResponse {
    (StatusCode::OK, CORS_HEADERS)
}

/// `GET /health`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: state.service.now().timestamp(),
        service: state.service.service_name().to_string(),
    })
}

/// `POST /admin/addkey`.
///
/// An empty body issues a key with the server defaults.
pub async fn add_key(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(rejection) = check_admin(&state, &headers) {
        return rejection;
    }

    let request = if body.iter().all(u8::is_ascii_whitespace) {
        AddKeyRequest::default()
    } else {
        match serde_json::from_slice::<AddKeyRequest>(&body) {
            Ok(request) => request,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid request: {}", e)),
        }
    };

    if request.max_usage == Some(0) {
        return error_response(StatusCode::BAD_REQUEST, "max_usage must be at least 1".to_string());
    }
    let validity = match request.valid_days {
        Some(days) if days <= 0 => {
            return error_response(StatusCode::BAD_REQUEST, "valid_days must be positive".to_string());
        }
        Some(days) => match chrono::Duration::try_days(days) {
            Some(validity) => Some(validity),
            None => {
                return error_response(StatusCode::BAD_REQUEST, "valid_days is out of range".to_string());
            }
        },
        None => None,
    };

    let issued = match state.service.issue(request.max_usage, validity) {
        Ok(issued) => issued,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    Json(AddKeyResponse {
        message: format!(
            "Key issued with {} uses",
            issued.record.max_usage
        ),
        expires: issued.record.expires_at.to_rfc3339(),
        key: issued.key,
    })
    .into_response()
}

/// `GET /admin/stats`.
pub async fn stats(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = check_admin(&state, &headers) {
        return rejection;
    }

    let stats = state.service.stats();
    Json(StatsResponse {
        total_keys: stats.total_keys,
        valid_keys: stats.valid_keys,
        total_usage: stats.total_usage,
        server_time: stats.taken_at.to_rfc3339(),
    })
    .into_response()
}

/// `GET /`.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_status_page(
        state.service.service_name(),
        state.service.now(),
    ))
}

/// Enforce the bearer token on admin routes when one is configured.
fn check_admin(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Ok(());
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented == Some(expected) {
        Ok(())
    } else {
        debug!("Admin request without valid token");
        Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Missing or invalid admin token".to_string(),
        ))
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}
