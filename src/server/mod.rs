//! Authorization server: router, shared state and listener.

pub mod handlers;
pub mod page;
pub mod service;

use crate::config::ServerConfig;
use crate::XzipError;
use axum::routing::{get, post};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::sync::Arc;
use tracing::{info, warn};

pub use service::{AuthService, IssuedKey, KeyStats};

/// State threaded through every handler.
#[derive(Clone)]
pub struct AppState {
    /// The one registry-owning service for this process.
    pub service: Arc<AuthService>,
    /// Bearer token guarding `/admin/*`, if any.
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    /// Wrap a service and the admin token from `config`.
    pub fn new(service: Arc<AuthService>, config: &ServerConfig) -> Self {
        Self {
            service,
            admin_token: config.admin_token.as_deref().map(Arc::from),
        }
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route(
            "/authorize",
            post(handlers::authorize).options(handlers::preflight),
        )
        .route("/admin/addkey", post(handlers::add_key))
        .route("/admin/stats", get(handlers::stats))
        .with_state(state)
}

/// Install the process-wide rustls crypto provider.
///
/// Safe to call more than once; later calls are no-ops.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Serve `state` until `handle` is told to shut down.
///
/// Uses HTTPS when `config` names a certificate and key, plain HTTP
/// otherwise.
pub async fn serve(config: &ServerConfig, state: AppState, handle: Handle) -> Result<(), XzipError> {
    let app = build_router(state);

    match (&config.tls_cert, &config.tls_key) {
        (Some(cert), Some(key)) => {
            install_crypto_provider();
            let tls = RustlsConfig::from_pem_file(cert, key)
                .await
                .map_err(|e| XzipError::Server(format!("Failed to load TLS certificate: {}", e)))?;

            info!(addr = %config.bind, "Serving HTTPS");
            axum_server::bind_rustls(config.bind, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(|e| XzipError::Server(format!("HTTPS server failed: {}", e)))
        }
        _ => {
            warn!(addr = %config.bind, "No TLS certificate configured, serving plain HTTP");
            axum_server::bind(config.bind)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(|e| XzipError::Server(format!("HTTP server failed: {}", e)))
        }
    }
}
