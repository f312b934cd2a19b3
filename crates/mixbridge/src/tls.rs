//! TLS certificate loading for the HTTPS listener.

use anyhow::{Context, Result};
use mixconf::TlsConfig;
use std::path::PathBuf;

/// Resolved TLS certificate paths.
#[derive(Debug, Clone)]
pub struct TlsCertPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl TlsCertPaths {
    /// Resolve certificate paths from config, using XDG defaults if not specified.
    pub fn from_config(config: &TlsConfig) -> Result<Self> {
        let cert = config
            .resolved_cert_path()
            .context("Could not determine certificate path (HOME not set?)")?;
        let key = config
            .resolved_key_path()
            .context("Could not determine key path (HOME not set?)")?;

        Ok(Self { cert, key })
    }

    /// Check if both cert and key exist.
    pub fn exists(&self) -> bool {
        self.cert.exists() && self.key.exists()
    }
}

/// Load TLS configuration from certificate files.
pub async fn load_rustls_config(
    config: &TlsConfig,
) -> Result<axum_server::tls_rustls::RustlsConfig> {
    let paths = TlsCertPaths::from_config(config)?;

    if !paths.exists() {
        anyhow::bail!(
            "TLS enabled but certificates not found.\n\
             Expected:\n  cert: {}\n  key: {}\n\n\
             Point [tls] cert_path/key_path (or MIXBRIDGE_TLS_CERT/MIXBRIDGE_TLS_KEY)\n\
             at an existing PEM certificate and key.",
            paths.cert.display(),
            paths.key.display()
        );
    }

    axum_server::tls_rustls::RustlsConfig::from_pem_file(&paths.cert, &paths.key)
        .await
        .with_context(|| {
            format!(
                "Failed to load TLS config from {} and {}",
                paths.cert.display(),
                paths.key.display()
            )
        })
}
