//! Config file discovery, loading, and environment variable overlay.

use crate::{BridgeConfig, ConfigError};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/mixbridge/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("mixbridge/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("mixbridge.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a config file into a raw TOML table.
pub fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    contents
        .parse::<toml::Table>()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Load a single config file (defaults fill anything it leaves out).
pub fn load_from_file(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let table = read_table(path)?;
    from_table(table, path)
}

/// Deep-merge `overlay` into `base`. Nested tables merge key by key; any other
/// value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Turn a merged table into a typed config, expanding `~/` in paths.
pub fn from_table(table: toml::Table, origin: &Path) -> Result<BridgeConfig, ConfigError> {
    let mut config: BridgeConfig =
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

    config.tls.cert_path = config
        .tls
        .cert_path
        .map(|p| expand_path(&p.to_string_lossy()));
    config.tls.key_path = config
        .tls
        .key_path
        .map(|p| expand_path(&p.to_string_lossy()));

    Ok(config)
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut BridgeConfig, sources: &mut ConfigSources) {
    apply_overrides_with(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from an arbitrary lookup. `apply_env_overrides` passes the process env.
pub fn apply_overrides_with<F>(config: &mut BridgeConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut take = |key: &str| {
        let value = lookup(key)?;
        sources.env_overrides.push(key.to_string());
        Some(value)
    };

    // Mixer endpoint. XR18_IP is the legacy name and loses to MIXBRIDGE_MIXER_HOST.
    if let Some(v) = take("XR18_IP") {
        config.mixer.host = Some(v);
    }
    if let Some(v) = take("MIXBRIDGE_MIXER_HOST") {
        config.mixer.host = Some(v);
    }
    if let Some(port) = take("MIXBRIDGE_MIXER_PORT").and_then(|v| v.parse().ok()) {
        config.mixer.port = port;
    }
    if let Some(port) = take("MIXBRIDGE_LOCAL_PORT").and_then(|v| v.parse().ok()) {
        config.mixer.local_port = port;
    }

    // Listener
    if let Some(v) = take("MIXBRIDGE_BIND") {
        config.server.bind = v;
    }
    if let Some(port) = take("MIXBRIDGE_HTTP_PORT").and_then(|v| v.parse().ok()) {
        config.server.http_port = port;
    }

    // TLS
    if let Some(v) = take("USE_HTTPS") {
        config.tls.enabled = parse_bool(&v);
    }
    if let Some(v) = take("MIXBRIDGE_TLS") {
        config.tls.enabled = parse_bool(&v);
    }
    if let Some(v) = take("MIXBRIDGE_TLS_CERT") {
        config.tls.cert_path = Some(expand_path(&v));
    }
    if let Some(v) = take("MIXBRIDGE_TLS_KEY") {
        config.tls.key_path = Some(expand_path(&v));
    }

    // Telemetry
    if let Some(v) = take("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.telemetry.otlp_endpoint = v;
    }
    if let Some(v) = take("MIXBRIDGE_OTLP_ENDPOINT") {
        config.telemetry.otlp_endpoint = v;
    }
    if let Some(v) = take("MIXBRIDGE_LOG_LEVEL") {
        config.telemetry.log_level = v;
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            match env::var(var_name) {
                Ok(var_value) => PathBuf::from(var_value).join(&stripped[slash_pos + 1..]),
                Err(_) => PathBuf::from(path),
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn parse(contents: &str) -> BridgeConfig {
        let table: toml::Table = contents.parse().unwrap();
        from_table(table, Path::new("test.toml")).unwrap()
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/test/path");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_absolute() {
        assert_eq!(expand_path("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = parse(
            r#"
[mixer]
host = "10.0.0.7"
"#,
        );
        assert_eq!(config.mixer.host.as_deref(), Some("10.0.0.7"));
        assert_eq!(config.mixer.port, 10024);
        assert_eq!(config.server.http_port, 4000);
        assert_eq!(config.timing.throttle_ms, 16);
    }

    #[test]
    fn test_parse_full_toml() {
        let config = parse(
            r#"
[mixer]
host = "xr18.local"
port = 10023
local_port = 12001

[server]
bind = "127.0.0.1"
http_port = 4443

[tls]
enabled = true
cert_path = "/etc/mixbridge/cert.pem"
key_path = "/etc/mixbridge/key.pem"

[telemetry]
otlp_endpoint = "127.0.0.1:4317"
log_level = "debug"

[timing]
throttle_ms = 20
max_missed = 5
"#,
        );

        assert_eq!(config.mixer.endpoint().as_deref(), Some("xr18.local:10023"));
        assert_eq!(config.mixer.local_port, 12001);
        assert_eq!(config.server.listen_addr(), "127.0.0.1:4443");
        assert!(config.tls.enabled);
        assert_eq!(
            config.tls.cert_path,
            Some(PathBuf::from("/etc/mixbridge/cert.pem"))
        );
        assert!(config.telemetry.otlp_enabled());
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(config.timing.throttle_ms, 20);
        assert_eq!(config.timing.max_missed, 5);
        assert_eq!(config.timing.query_timeout_ms, 500);
    }

    #[test]
    fn test_merge_tables_is_deep() {
        let mut base: toml::Table = r#"
[mixer]
host = "a"
port = 1
[server]
http_port = 2
"#
        .parse()
        .unwrap();
        let overlay: toml::Table = r#"
[mixer]
host = "b"
"#
        .parse()
        .unwrap();

        merge_tables(&mut base, overlay);
        let config = from_table(base, Path::new("merged")).unwrap();
        assert_eq!(config.mixer.host.as_deref(), Some("b"));
        assert_eq!(config.mixer.port, 1);
        assert_eq!(config.server.http_port, 2);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nhttp_port = 4100").unwrap();

        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.server.http_port, 4100);
    }

    #[test]
    fn test_load_from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nhttp_port = ").unwrap();

        let err = load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_from_file(Path::new("/nonexistent/mixbridge.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("XR18_IP", "192.168.0.10"),
            ("MIXBRIDGE_HTTP_PORT", "4500"),
            ("USE_HTTPS", "true"),
            ("MIXBRIDGE_LOG_LEVEL", "warn"),
            ("MIXBRIDGE_LOCAL_PORT", "not-a-port"),
        ]
        .into_iter()
        .collect();

        let mut config = BridgeConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_with(&mut config, &mut sources, |key| {
            env.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.mixer.host.as_deref(), Some("192.168.0.10"));
        assert_eq!(config.server.http_port, 4500);
        assert!(config.tls.enabled);
        assert_eq!(config.telemetry.log_level, "warn");
        // Unparseable values leave the default alone
        assert_eq!(config.mixer.local_port, 12000);
        assert!(sources.env_overrides.contains(&"XR18_IP".to_string()));
    }

    #[test]
    fn test_specific_host_var_beats_legacy() {
        let env: HashMap<&str, &str> = [
            ("XR18_IP", "192.168.0.10"),
            ("MIXBRIDGE_MIXER_HOST", "mixer.lan"),
        ]
        .into_iter()
        .collect();

        let mut config = BridgeConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_with(&mut config, &mut sources, |key| {
            env.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.mixer.host.as_deref(), Some("mixer.lan"));
    }
}
