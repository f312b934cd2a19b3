//! Infrastructure configuration - endpoints, bind addresses, certificates, telemetry.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the mixer lives and which local port receives its replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Mixer hostname or IP. There is no sensible default; startup fails without it.
    #[serde(default)]
    pub host: Option<String>,

    /// Mixer OSC port.
    /// Default: 10024 (X-Air series)
    #[serde(default = "MixerConfig::default_port")]
    pub port: u16,

    /// Local UDP port the bridge binds to receive mixer traffic.
    /// Default: 12000
    #[serde(default = "MixerConfig::default_local_port")]
    pub local_port: u16,
}

impl MixerConfig {
    fn default_port() -> u16 {
        10024
    }

    fn default_local_port() -> u16 {
        12000
    }

    /// `host:port` of the mixer, if a host is configured.
    pub fn endpoint(&self) -> Option<String> {
        self.host
            .as_ref()
            .map(|host| format!("{}:{}", host, self.port))
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: Self::default_port(),
            local_port: Self::default_local_port(),
        }
    }
}

/// HTTP/WebSocket listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener on.
    /// Default: 0.0.0.0
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: String,

    /// HTTP port for the WebSocket channel and health endpoint.
    /// Default: 4000
    #[serde(default = "ServerConfig::default_http_port")]
    pub http_port: u16,
}

impl ServerConfig {
    fn default_bind() -> String {
        "0.0.0.0".to_string()
    }

    fn default_http_port() -> u16 {
        4000
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.http_port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
            http_port: Self::default_http_port(),
        }
    }
}

/// TLS settings. Certificates are loaded, never generated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Serve HTTPS/WSS instead of plain HTTP.
    #[serde(default)]
    pub enabled: bool,

    /// PEM certificate path.
    /// Default: ~/.config/mixbridge/tls/cert.pem
    #[serde(default)]
    pub cert_path: Option<PathBuf>,

    /// PEM private key path.
    /// Default: ~/.config/mixbridge/tls/key.pem
    #[serde(default)]
    pub key_path: Option<PathBuf>,
}

impl TlsConfig {
    fn default_tls_dir() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("mixbridge/tls"))
    }

    /// Certificate path, falling back to the per-user config directory.
    pub fn resolved_cert_path(&self) -> Option<PathBuf> {
        self.cert_path
            .clone()
            .or_else(|| Self::default_tls_dir().map(|dir| dir.join("cert.pem")))
    }

    /// Key path, falling back to the per-user config directory.
    pub fn resolved_key_path(&self) -> Option<PathBuf> {
        self.key_path
            .clone()
            .or_else(|| Self::default_tls_dir().map(|dir| dir.join("key.pem")))
    }
}

/// Telemetry and observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// OTLP gRPC endpoint for OpenTelemetry. Empty disables export.
    /// Default: "" (stdout logging only)
    #[serde(default)]
    pub otlp_endpoint: String,

    /// Log filter directive (trace, debug, info, warn, error, or a full EnvFilter string).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }

    pub fn otlp_enabled(&self) -> bool {
        !self.otlp_endpoint.trim().is_empty()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: String::new(),
            log_level: Self::default_log_level(),
        }
    }
}
