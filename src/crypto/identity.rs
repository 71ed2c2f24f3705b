//! Application-level pinning of the authorization server's identity.
//!
//! The client transport accepts any certificate chain. Trust comes from this
//! check instead: the leaf certificate presented on the connection must name
//! the expected service, either as a SAN DNS entry or as the subject CN.

use crate::XzipError;
use tracing::{debug, warn};
use x509_parser::prelude::*;

/// Verify that a DER certificate names `expected`.
///
/// # Returns
/// * `Ok(())` - A SAN DNS name or the subject CN matches
/// * `Err(NotHttps)` - No certificate was presented
/// * `Err(IdentityMismatch)` - Certificate is unparseable or names another host
pub fn verify_peer_identity(
    peer_certificate: Option<&[u8]>,
    expected: &str,
) -> Result<(), XzipError> {
    let der = peer_certificate.ok_or(XzipError::NotHttps)?;

    let names = certificate_names(der).map_err(|e| {
        warn!(error = %e, "Could not parse server certificate");
        XzipError::IdentityMismatch {
            expected: expected.to_string(),
        }
    })?;

    if names.iter().any(|name| name.eq_ignore_ascii_case(expected)) {
        debug!(identity = expected, "Server certificate identity verified");
        return Ok(());
    }

    warn!(?names, expected, "Server certificate identity mismatch");
    Err(XzipError::IdentityMismatch {
        expected: expected.to_string(),
    })
}

/// Collect SAN DNS names followed by subject common names.
pub fn certificate_names(der: &[u8]) -> Result<Vec<String>, String> {
    let (_, cert) = X509Certificate::from_der(der).map_err(|e| e.to_string())?;

    let mut names = Vec::new();

    if let Ok(Some(san)) = cert.subject_alternative_name() {
        for name in &san.value.general_names {
            if let GeneralName::DNSName(dns) = name {
                names.push((*dns).to_string());
            }
        }
    }

    for cn in cert.subject().iter_common_name() {
        if let Ok(value) = cn.as_str() {
            names.push(value.to_string());
        }
    }

    Ok(names)
}
