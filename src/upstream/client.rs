//! HTTP client construction for upstream connections

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::UpstreamConfig;

/// System certificate bundles, tried in order
pub const CA_BUNDLE_SEARCH_PATHS: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/ssl/ca-bundle.pem",
    "/etc/pki/tls/cacert.pem",
    "/etc/pki/ca-trust/extracted/pem/tls-ca-bundle.pem",
    "/etc/ssl/cert.pem",
    "/usr/local/etc/openssl/cert.pem",
];

/// Pick the certificate bundle to trust.
///
/// An explicitly configured path wins even if it does not exist, so that a
/// typo fails loudly when the bundle is read.
pub fn select_ca_bundle(explicit: Option<&str>, search_paths: &[&str]) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }
    search_paths.iter().map(Path::new).find(|p| p.is_file()).map(Path::to_path_buf)
}

/// Build an HTTP client with TLS configuration
pub fn build_http_client(config: &UpstreamConfig) -> Result<reqwest::Client, Box<dyn std::error::Error>> {
    // no overall timeout: it would cut long streams, so bound connect only
    let mut client_builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.timeout_seconds))
        .pool_max_idle_per_host(10);

    if config.tls.accept_invalid_certs {
        client_builder = client_builder.danger_accept_invalid_certs(true);
        tracing::warn!("TLS: Accepting invalid certificates (use only for local debugging)");
    }

    match select_ca_bundle(config.tls.ca_bundle_path.as_deref(), CA_BUNDLE_SEARCH_PATHS) {
        Some(bundle_path) => {
            let pem = std::fs::read(&bundle_path)
                .map_err(|e| format!("Failed to read CA bundle {}: {}", bundle_path.display(), e))?;
            let certs = reqwest::Certificate::from_pem_bundle(&pem)?;
            let count = certs.len();
            for cert in certs {
                client_builder = client_builder.add_root_certificate(cert);
            }
            tracing::info!(
                bundle = %bundle_path.display(),
                certificates = count,
                "TLS: Loaded CA bundle"
            );
        }
        None => {
            tracing::debug!("TLS: No CA bundle found, using built-in roots");
        }
    }

    Ok(client_builder.build()?)
}
