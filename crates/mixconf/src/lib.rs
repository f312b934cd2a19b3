//! Configuration loading for mixbridge.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, table by table):
//! 1. `/etc/mixbridge/config.toml` (system)
//! 2. `~/.config/mixbridge/config.toml` (user)
//! 3. `./mixbridge.toml` or the path given with `--config`
//! 4. Environment variables (`MIXBRIDGE_*`, plus `XR18_IP` and `USE_HTTPS`)
//!
//! # Example Config
//!
//! ```toml
//! [mixer]
//! host = "192.168.1.50"
//! port = 10024
//! local_port = 12000
//!
//! [server]
//! bind = "0.0.0.0"
//! http_port = 4000
//!
//! [tls]
//! enabled = true
//! cert_path = "~/.cert/localhost.pem"
//! key_path = "~/.cert/localhost-key.pem"
//!
//! [telemetry]
//! otlp_endpoint = "127.0.0.1:4317"
//! log_level = "info"
//!
//! [timing]
//! throttle_ms = 16
//! query_timeout_ms = 500
//! ```

pub mod infra;
pub mod loader;
pub mod timing;

pub use infra::{MixerConfig, ServerConfig, TelemetryConfig, TlsConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use timing::TimingConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Mixer host is not set (use [mixer] host, MIXBRIDGE_MIXER_HOST or XR18_IP)")]
    MissingMixerHost,
}

/// Complete mixbridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub mixer: MixerConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub tls: TlsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub timing: TimingConfig,
}

impl BridgeConfig {
    /// Load configuration from all standard sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, with `config_path` replacing the local `./mixbridge.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report which files and env vars contributed.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::read_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let mut config = loader::from_table(merged, Path::new("<merged>"))?;
        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Check the values a running bridge cannot do without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.mixer.host.as_deref() {
            None => return Err(ConfigError::MissingMixerHost),
            Some(host) if host.trim().is_empty() => return Err(ConfigError::MissingMixerHost),
            Some(_) => {}
        }

        if self.timing.throttle_ms == 0 {
            return Err(ConfigError::Invalid("timing.throttle_ms must be > 0".into()));
        }
        if self.timing.heartbeat_ms == 0 {
            return Err(ConfigError::Invalid("timing.heartbeat_ms must be > 0".into()));
        }
        if self.timing.max_missed == 0 {
            return Err(ConfigError::Invalid("timing.max_missed must be > 0".into()));
        }
        Ok(())
    }

    /// Serialize config to a TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# mixbridge configuration\n\n");

        output.push_str("[mixer]\n");
        if let Some(host) = &self.mixer.host {
            output.push_str(&format!("host = \"{}\"\n", host));
        }
        output.push_str(&format!("port = {}\n", self.mixer.port));
        output.push_str(&format!("local_port = {}\n", self.mixer.local_port));

        output.push_str("\n[server]\n");
        output.push_str(&format!("bind = \"{}\"\n", self.server.bind));
        output.push_str(&format!("http_port = {}\n", self.server.http_port));

        output.push_str("\n[tls]\n");
        output.push_str(&format!("enabled = {}\n", self.tls.enabled));
        if let Some(path) = &self.tls.cert_path {
            output.push_str(&format!("cert_path = \"{}\"\n", path.display()));
        }
        if let Some(path) = &self.tls.key_path {
            output.push_str(&format!("key_path = \"{}\"\n", path.display()));
        }

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "otlp_endpoint = \"{}\"\n",
            self.telemetry.otlp_endpoint
        ));
        output.push_str(&format!("log_level = \"{}\"\n", self.telemetry.log_level));

        let t = &self.timing;
        output.push_str("\n[timing]\n");
        output.push_str(&format!("probe_stagger_ms = {}\n", t.probe_stagger_ms));
        output.push_str(&format!("probe_deadline_ms = {}\n", t.probe_deadline_ms));
        output.push_str(&format!("query_timeout_ms = {}\n", t.query_timeout_ms));
        output.push_str(&format!("throttle_ms = {}\n", t.throttle_ms));
        output.push_str(&format!("heartbeat_ms = {}\n", t.heartbeat_ms));
        output.push_str(&format!("stale_after_ms = {}\n", t.stale_after_ms));
        output.push_str(&format!("max_missed = {}\n", t.max_missed));

        output
    }
}
