//! Configuration management
//!
//! Settings live in `settings.json` inside the wallet directory:
//! ```json
//! {
//!   "server": { "port": 8080, "requestTimeoutMs": 30000, "shutdownTimeoutMs": 30000, "corsHosts": [] },
//!   "logging": { "level": "info", "format": "pretty" }
//! }
//! ```
//! Every field is optional. `WALLET_*` environment variables override the file.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub port: u16,
    pub request_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
    /// Allowed CORS origins; empty disables CORS entirely
    pub cors_hosts: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            request_timeout_ms: 30_000,
            shutdown_timeout_ms: 30_000,
            cors_hosts: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Default filter directive; RUST_LOG takes precedence when set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Wallet configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    // Sections this version does not know about survive a save
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Config {
    /// Load config from the wallet directory and apply environment overrides
    pub fn load(wallet_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_file(wallet_dir)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load `settings.json` only; a missing file yields the defaults
    pub fn load_file(wallet_dir: &Path) -> Result<Self, ConfigError> {
        let settings_path = wallet_dir.join(SETTINGS_FILE);
        if !settings_path.exists() {
            return Ok(Self::default());
        }

        let path = settings_path.display().to_string();
        let content = std::fs::read_to_string(&settings_path).map_err(|source| {
            ConfigError::Io {
                path: path.clone(),
                source,
            }
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Save config to the wallet directory
    pub fn save(&self, wallet_dir: &Path) -> Result<(), ConfigError> {
        let settings_path = wallet_dir.join(SETTINGS_FILE);
        let path = settings_path.display().to_string();
        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&settings_path, content).map_err(|source| ConfigError::Io { path, source })
    }

    /// Override fields from `WALLET_*` variables, looked up through `var`
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = parse_var(&var, "WALLET_PORT")? {
            self.server.port = port;
        }
        if let Some(ms) = parse_var(&var, "WALLET_REQUEST_TIMEOUT_MS")? {
            self.server.request_timeout_ms = ms;
        }
        if let Some(ms) = parse_var(&var, "WALLET_SHUTDOWN_TIMEOUT_MS")? {
            self.server.shutdown_timeout_ms = ms;
        }
        if let Some(hosts) = var("WALLET_CORS_HOSTS") {
            self.server.cors_hosts = hosts
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(level) = var("WALLET_LOG_LEVEL").filter(|l| !l.trim().is_empty()) {
            self.logging.level = level.trim().to_string();
        }
        if let Some(format) = parse_var(&var, "WALLET_LOG_FORMAT")? {
            self.logging.format = format;
        }
        Ok(())
    }
}

fn parse_var<F, T>(var: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match var(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_file(dir.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.server.shutdown_timeout(), Duration::from_secs(30));
        assert!(config.server.cors_hosts.is_empty());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_settings_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"server": {"port": 9000, "corsHosts": ["http://localhost:3000"]}}"#,
        )
        .unwrap();

        let config = Config::load_file(dir.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.request_timeout_ms, 30_000);
        assert_eq!(config.server.cors_hosts, vec!["http://localhost:3000"]);
    }

    #[test]
    fn test_malformed_settings_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();

        assert!(matches!(
            Config::load_file(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("WALLET_PORT", "3000"),
                ("WALLET_REQUEST_TIMEOUT_MS", "500"),
                ("WALLET_CORS_HOSTS", "http://a.test, http://b.test,"),
                ("WALLET_LOG_LEVEL", "wallet_core=debug"),
                ("WALLET_LOG_FORMAT", "JSON"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.request_timeout(), Duration::from_millis(500));
        assert_eq!(config.server.shutdown_timeout_ms, 30_000);
        assert_eq!(config.server.cors_hosts, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.logging.level, "wallet_core=debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[("WALLET_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: "WALLET_PORT", .. }));
    }

    #[test]
    fn test_save_preserves_unknown_sections() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"server": {"port": 9000}, "dashboard": {"theme": "dark"}}"#,
        )
        .unwrap();

        let mut config = Config::load_file(dir.path()).unwrap();
        config.server.port = 9100;
        config.save(dir.path()).unwrap();

        let raw: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(raw["server"]["port"], 9100);
        assert_eq!(raw["dashboard"]["theme"], "dark");
    }
}
