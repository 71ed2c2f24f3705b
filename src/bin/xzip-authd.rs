//! XZip authorization server
//!
//! Issues license keys and answers `/authorize` checks from xzip clients.
//! Keys live in memory only and are lost on restart.
//!
//! Usage:
//!   xzip-authd --bind 0.0.0.0:8443 --tls-cert cert.pem --tls-key key.pem

use anyhow::{Context, Result};
use axum_server::Handle;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use xzip::config::{DEFAULT_KEY_VALIDITY_DAYS, DEFAULT_MAX_USAGE, DEFAULT_SERVICE_NAME};
use xzip::server::service::demo;
use xzip::server::{serve, AppState};
use xzip::{AuthService, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "xzip-authd", version)]
#[command(about = "XZip license authorization server")]
struct Args {
    /// Address to listen on
    #[arg(short, long, env = "XZIP_BIND", default_value = "0.0.0.0:8443")]
    bind: SocketAddr,

    /// Service name reported by /health
    #[arg(long, env = "XZIP_SERVICE_NAME", default_value = DEFAULT_SERVICE_NAME)]
    service_name: String,

    /// Usage ceiling for newly issued keys
    #[arg(long, env = "XZIP_MAX_USAGE", default_value_t = DEFAULT_MAX_USAGE)]
    max_usage: u64,

    /// Lifetime of newly issued keys, in days
    #[arg(long, env = "XZIP_VALID_DAYS", default_value_t = DEFAULT_KEY_VALIDITY_DAYS)]
    valid_days: i64,

    /// PEM certificate chain for HTTPS
    #[arg(long, env = "XZIP_TLS_CERT", requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    /// PEM private key for HTTPS
    #[arg(long, env = "XZIP_TLS_KEY", requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    /// Bearer token required on /admin endpoints
    #[arg(long, env = "XZIP_ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,

    /// Insert demo keys (active, disabled, expired, exhausted) at startup
    #[arg(long)]
    seed_demo_keys: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let validity = chrono::Duration::try_days(args.valid_days)
        .context("valid_days is out of range")?;
    let config = ServerConfig {
        bind: args.bind,
        service_name: args.service_name,
        default_max_usage: args.max_usage,
        default_validity: validity,
        tls_cert: args.tls_cert,
        tls_key: args.tls_key,
        admin_token: args.admin_token,
        seed_demo_keys: args.seed_demo_keys,
    };
    config.validate()?;

    info!(service = %config.service_name, "XZip authorization server starting...");

    let service = Arc::new(AuthService::new(&config));
    if config.seed_demo_keys {
        service.seed_demo_keys()?;
        println!("\n========================================");
        println!("  Demo keys");
        println!("========================================");
        println!("  active:    {}", demo::ACTIVE);
        println!("  disabled:  {}", demo::DISABLED);
        println!("  expired:   {}", demo::EXPIRED);
        println!("  exhausted: {}", demo::EXHAUSTED);
        println!("========================================\n");
    }
    if config.admin_token.is_none() {
        warn!("No admin token configured, /admin endpoints are open");
    }

    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            shutdown.graceful_shutdown(Some(Duration::from_secs(5)));
        }
    });

    let state = AppState::new(service, &config);
    serve(&config, state, handle).await?;
    Ok(())
}
