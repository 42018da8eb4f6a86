//! Server configuration
//!
//! An optional TOML file provides the base values, then `TRUENAS_*` and the
//! other process environment variables override them.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "/etc/nas-mcp/config.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub debug_mode: bool,
    /// Serve every tool from the in-memory mock instead of a real NAS.
    #[serde(default)]
    pub mock_truenas: bool,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub mock: MockConfig,
    #[serde(default)]
    pub truenas: TrueNasConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => bail!("Unknown log format '{other}' (expected compact or json)"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MockConfig {
    /// Artificial delay added to every mock operation
    #[serde(default = "default_mock_latency")]
    pub latency_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_mock_latency(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct TrueNasConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_true")]
    pub ssl_verify: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_log_timeout")]
    pub log_timeout_seconds: u64,
}

impl Default for TrueNasConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            username: default_username(),
            password: None,
            api_key: None,
            port: default_port(),
            protocol: default_protocol(),
            ssl_verify: true,
            request_timeout_seconds: default_request_timeout(),
            log_timeout_seconds: default_log_timeout(),
        }
    }
}

impl std::fmt::Debug for TrueNasConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueNasConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("ssl_verify", &self.ssl_verify)
            .finish()
    }
}

impl TrueNasConfig {
    pub fn url(&self) -> String {
        format!("{}://{}:{}/api/current", self.protocol, self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn log_timeout(&self) -> Duration {
        Duration::from_secs(self.log_timeout_seconds)
    }
}

fn default_host() -> String { "truenas.local".into() }
fn default_username() -> String { "mcp-service".into() }
fn default_port() -> u16 { 443 }
fn default_protocol() -> String { "wss".into() }
fn default_true() -> bool { true }
fn default_request_timeout() -> u64 { 30 }
fn default_log_timeout() -> u64 { 10 }
fn default_mock_latency() -> u64 { 100 }

/// Accepts `true/false/1/0/yes/no/on/off`, case-insensitively.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ServerConfig {
    /// Parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str| -> Result<Option<bool>> {
            match lookup(name) {
                None => Ok(None),
                Some(raw) => parse_bool(&raw)
                    .map(Some)
                    .with_context(|| format!("Invalid boolean for {name}: '{raw}'")),
            }
        };

        if let Some(v) = flag("DEBUG_MODE")? {
            self.debug_mode = v;
        }
        if let Some(v) = flag("MOCK_TRUENAS")? {
            self.mock_truenas = v;
        }
        if let Some(v) = flag("TRUENAS_SSL_VERIFY")? {
            self.truenas.ssl_verify = v;
        }
        if let Some(raw) = lookup("LOG_FORMAT") {
            self.log_format = raw.parse()?;
        }

        let truenas = &mut self.truenas;
        if let Some(host) = lookup("TRUENAS_HOST") {
            truenas.host = host;
        }
        if let Some(username) = lookup("TRUENAS_USERNAME") {
            truenas.username = username;
        }
        if let Some(password) = lookup("TRUENAS_PASSWORD") {
            truenas.password = Some(password);
        }
        if let Some(api_key) = lookup("TRUENAS_API_KEY") {
            truenas.api_key = Some(api_key);
        }
        if let Some(raw) = lookup("TRUENAS_PORT") {
            truenas.port = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid TRUENAS_PORT: '{raw}'"))?;
        }
        if let Some(protocol) = lookup("TRUENAS_PROTOCOL") {
            let protocol = protocol.trim().to_ascii_lowercase();
            if protocol != "ws" && protocol != "wss" {
                bail!("Invalid TRUENAS_PROTOCOL '{protocol}' (expected ws or wss)");
            }
            truenas.protocol = protocol;
        }
        Ok(())
    }
}

/// Config file location: `NAS_MCP_CONFIG`, or the default path.
pub fn config_path() -> PathBuf {
    std::env::var_os("NAS_MCP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load `path` when it exists (defaults otherwise), then apply the process
/// environment.
pub fn load_config(path: &Path) -> Result<ServerConfig> {
    let mut config = if path.exists() {
        ServerConfig::from_file(path)?
    } else {
        ServerConfig::default()
    };

    config.apply_env(|name| std::env::var(name).ok())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert!(!config.debug_mode);
        assert!(!config.mock_truenas);
        assert_eq!(config.log_format, LogFormat::Compact);
        assert_eq!(config.truenas.host, "truenas.local");
        assert_eq!(config.truenas.username, "mcp-service");
        assert_eq!(config.truenas.port, 443);
        assert!(config.truenas.ssl_verify);
        assert_eq!(config.truenas.url(), "wss://truenas.local:443/api/current");
        assert_eq!(config.truenas.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.truenas.protocol, "wss");
        assert_eq!(config.mock.latency_ms, 100);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
mock_truenas = true
log_format = "json"

[mock]
latency_ms = 0

[truenas]
host = "10.0.0.5"
port = 8443
ssl_verify = false
"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert!(config.mock_truenas);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.mock.latency_ms, 0);
        assert_eq!(config.truenas.url(), "wss://10.0.0.5:8443/api/current");
        assert!(!config.truenas.ssl_verify);
        assert_eq!(config.truenas.username, "mcp-service");
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.mock.latency_ms, 100);
        assert_eq!(config.truenas.request_timeout_seconds, 30);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "truenas = 5").unwrap();
        let err = ServerConfig::from_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env(&[
                ("TRUENAS_HOST", "nas.lan"),
                ("TRUENAS_PORT", "80"),
                ("TRUENAS_PROTOCOL", "WS"),
                ("TRUENAS_SSL_VERIFY", "off"),
                ("TRUENAS_PASSWORD", "pw"),
                ("MOCK_TRUENAS", "yes"),
                ("DEBUG_MODE", "1"),
                ("LOG_FORMAT", "json"),
            ]))
            .unwrap();

        assert_eq!(config.truenas.url(), "ws://nas.lan:80/api/current");
        assert!(!config.truenas.ssl_verify);
        assert_eq!(config.truenas.password.as_deref(), Some("pw"));
        assert!(config.mock_truenas);
        assert!(config.debug_mode);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let mut config = ServerConfig::default();
        assert!(config.apply_env(env(&[("TRUENAS_PORT", "abc")])).is_err());
        assert!(config.apply_env(env(&[("MOCK_TRUENAS", "maybe")])).is_err());
        assert!(config.apply_env(env(&[("TRUENAS_PROTOCOL", "http")])).is_err());
        assert!(config.apply_env(env(&[("LOG_FORMAT", "pretty")])).is_err());
    }

    #[test]
    fn test_parse_bool() {
        for v in ["true", "TRUE", "1", "yes", "On"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["false", "0", "no", "OFF"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let mut config = TrueNasConfig::default();
        config.password = Some("hunter2".into());
        let shown = format!("{config:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("<redacted>"));
    }
}
