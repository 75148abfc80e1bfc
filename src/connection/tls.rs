// src/connection/tls.rs

//! Client-side TLS setup for the outbound link.

use crate::config::{ConnectionConfig, TlsConfig};
use crate::core::IrcLineError;
use rustls::pki_types::{CertificateDer, ServerName};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tracing::debug;

/// Builds the client config used when the caller does not supply one:
/// the webpki roots, plus any certificates from `ca_cert_path`.
pub fn default_client_config(tls: &TlsConfig) -> Result<Arc<rustls::ClientConfig>, IrcLineError> {
    let mut root_cert_store = rustls::RootCertStore::empty();
    root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if let Some(path) = &tls.ca_cert_path {
        let certs = load_certs(path)?;
        let (added, ignored) = root_cert_store.add_parsable_certificates(certs);
        if added == 0 {
            return Err(IrcLineError::InvalidConfig(format!(
                "No usable CA certificates in '{path}'"
            )));
        }
        debug!(added, ignored, "Loaded extra trust anchors from {path}");
    }

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();
    Ok(Arc::new(config))
}

/// Resolves the name to verify the peer certificate against.
pub fn server_name(config: &ConnectionConfig) -> Result<ServerName<'static>, IrcLineError> {
    let name = config
        .tls
        .server_name
        .as_deref()
        .unwrap_or(config.host.as_str());
    ServerName::try_from(name)
        .map(|n| n.to_owned())
        .map_err(|_| IrcLineError::InvalidServerName(name.to_string()))
}

/// Loads certificates from a PEM file.
fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>, IrcLineError> {
    let cert_file = File::open(path).map_err(|e| {
        IrcLineError::InvalidConfig(format!("Failed to open CA bundle '{path}': {e}"))
    })?;
    let mut cert_reader = BufReader::new(cert_file);
    let certs = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| IrcLineError::InvalidConfig(format!("Malformed CA bundle '{path}': {e}")))?;
    if certs.is_empty() {
        return Err(IrcLineError::InvalidConfig(format!(
            "No certificates found in '{path}'"
        )));
    }
    Ok(certs)
}
