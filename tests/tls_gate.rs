//! End-to-end: blocking client gate against the HTTPS server.

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use xzip::client::keyfile::write_key;
use xzip::crypto::digest::key_fingerprint;
use xzip::server::service::demo;
use xzip::server::{build_router, install_crypto_provider, AppState};
use xzip::{AuthService, ClientConfig, EncryptionSupport, LicenseGate, ServerConfig, XzipError};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

struct TestServer {
    port: u16,
    service: Arc<AuthService>,
    handle: Handle,
    thread: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    /// Serve on a background runtime; HTTPS when `tls` is set.
    fn start(tls: bool) -> Self {
        let config = ServerConfig::default();
        let service = Arc::new(AuthService::new(&config));
        service.seed_demo_keys().unwrap();
        let app = build_router(AppState::new(service.clone(), &config));
        let handle = Handle::new();

        let (tx, rx) = mpsc::channel();
        let server_handle = handle.clone();
        let thread = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async move {
                let addr = "127.0.0.1:0".parse().unwrap();
                let listening = server_handle.clone();
                tokio::spawn(async move {
                    let bound = listening.listening().await.unwrap();
                    tx.send(bound.port()).unwrap();
                });

                if tls {
                    install_crypto_provider();
                    let rustls = RustlsConfig::from_pem_file(
                        fixture("service-cert.pem"),
                        fixture("service-key.pem"),
                    )
                    .await
                    .unwrap();
                    axum_server::bind_rustls(addr, rustls)
                        .handle(server_handle)
                        .serve(app.into_make_service())
                        .await
                        .unwrap();
                } else {
                    axum_server::bind(addr)
                        .handle(server_handle)
                        .serve(app.into_make_service())
                        .await
                        .unwrap();
                }
            });
        });

        let port = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        Self {
            port,
            service,
            handle,
            thread: Some(thread),
        }
    }

    fn url(&self, scheme: &str) -> String {
        format!("{}://127.0.0.1:{}/authorize", scheme, self.port)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn gate(url: String, identity: &str, key_file: PathBuf) -> LicenseGate {
    LicenseGate::new(ClientConfig {
        auth_url: url,
        service_identity: identity.to_string(),
        purchase_url: "https://xzip.com/buy".to_string(),
        key_file,
        timeout: Duration::from_secs(10),
        encryption: EncryptionSupport::Enabled,
    })
    .unwrap()
}

#[test]
fn stored_key_is_authorized_over_https() {
    let server = TestServer::start(true);
    let temp = TempDir::new().unwrap();
    let key_file = temp.path().join(".xzip/key");
    let issued = server.service.issue(Some(3), None).unwrap();
    write_key(&key_file, &issued.key).unwrap();

    let authorization = gate(server.url("https"), "xzip.com", key_file).authorize().unwrap();

    assert_eq!(authorization.key_fingerprint, key_fingerprint(&issued.key));
    assert_eq!(server.service.registry().get(&issued.key).unwrap().usage_count, 1);
}

#[test]
fn identity_is_case_insensitive() {
    let server = TestServer::start(true);
    let gate = gate(server.url("https"), "WWW.XZip.com", PathBuf::from("/unused"));

    assert!(gate.authorize_key(demo::ACTIVE).is_ok());
}

#[test]
fn wrong_identity_is_refused() {
    let server = TestServer::start(true);
    let gate = gate(server.url("https"), "other.example", PathBuf::from("/unused"));

    let err = gate.authorize_key(demo::ACTIVE).unwrap_err();

    assert!(matches!(err, XzipError::IdentityMismatch { .. }));
}

#[test]
fn rejected_key_points_to_purchase() {
    let server = TestServer::start(true);
    let gate = gate(server.url("https"), "xzip.com", PathBuf::from("/unused"));

    match gate.authorize_key(demo::EXHAUSTED).unwrap_err() {
        XzipError::Rejected { purchase_url } => assert_eq!(purchase_url, "https://xzip.com/buy"),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn quota_runs_out_across_runs() {
    let server = TestServer::start(true);
    let issued = server.service.issue(Some(2), None).unwrap();
    let gate = gate(server.url("https"), "xzip.com", PathBuf::from("/unused"));

    assert!(gate.authorize_key(&issued.key).is_ok());
    assert!(gate.authorize_key(&issued.key).is_ok());
    assert!(matches!(
        gate.authorize_key(&issued.key),
        Err(XzipError::Rejected { .. })
    ));
}

#[test]
fn plain_http_server_is_refused() {
    let server = TestServer::start(false);
    let gate = gate(server.url("http"), "xzip.com", PathBuf::from("/unused"));

    let err = gate.authorize_key(demo::ACTIVE).unwrap_err();

    assert!(matches!(err, XzipError::NotHttps));
}
