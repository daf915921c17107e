//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/afl.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//!
//! [history]
//! enabled = true
//! default_limit = 10
//! max_limit = 100
//! # endpoint = "http://127.0.0.1:7341"
//!
//! [ingest]
//! csv_delimiter = ","
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    #[serde(default = "default_max_limit")]
    pub max_limit: i64,
    /// Base URL of a remote history server. When unset, the CLI writes
    /// history straight into the local database.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_limit: 10,
            max_limit: 100,
            endpoint: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}
fn default_limit() -> i64 {
    10
}
fn default_max_limit() -> i64 {
    100
}

impl HistoryConfig {
    /// Turn a raw `limit` query value into the number of rows to fetch.
    ///
    /// Missing, malformed, and non-positive values fall back to
    /// `default_limit`; large values are clamped to `max_limit`.
    pub fn resolve_limit(&self, raw: Option<&str>) -> i64 {
        match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
            Some(n) if n > 0 => n.min(self.max_limit),
            _ => self.default_limit,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_csv_delimiter")]
    pub csv_delimiter: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            csv_delimiter: default_csv_delimiter(),
        }
    }
}

fn default_csv_delimiter() -> String {
    ",".to_string()
}

impl IngestConfig {
    pub fn delimiter_byte(&self) -> u8 {
        self.csv_delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

impl Config {
    /// Defaults for commands that can run without a config file.
    ///
    /// History is disabled: there is no database to write to.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/afl.sqlite"),
            },
            server: ServerConfig {
                bind: "127.0.0.1:7341".to_string(),
            },
            history: HistoryConfig {
                enabled: false,
                ..HistoryConfig::default()
            },
            ingest: IngestConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
///
/// A file that exists but fails to parse is still an error.
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.history.default_limit < 1 {
        anyhow::bail!("history.default_limit must be >= 1");
    }
    if config.history.max_limit < config.history.default_limit {
        anyhow::bail!("history.max_limit must be >= history.default_limit");
    }
    if config.ingest.csv_delimiter.len() != 1 {
        anyhow::bail!("ingest.csv_delimiter must be a single ASCII character");
    }
    if let Some(endpoint) = &config.history.endpoint {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            anyhow::bail!(
                "history.endpoint must be an http(s) URL, got '{}'",
                endpoint
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &str) -> Result<Config> {
        let content = format!(
            r#"
[db]
path = "/tmp/afl.sqlite"

[server]
bind = "127.0.0.1:0"
{}
"#,
            extra
        );
        let config: Config = toml::from_str(&content)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_defaults_applied() {
        let cfg = parse("").unwrap();
        assert!(cfg.history.enabled);
        assert_eq!(cfg.history.default_limit, 10);
        assert_eq!(cfg.history.max_limit, 100);
        assert!(cfg.history.endpoint.is_none());
        assert_eq!(cfg.ingest.delimiter_byte(), b',');
    }

    #[test]
    fn test_resolve_limit() {
        let h = HistoryConfig::default();
        assert_eq!(h.resolve_limit(None), 10);
        assert_eq!(h.resolve_limit(Some("5")), 5);
        assert_eq!(h.resolve_limit(Some("abc")), 10);
        assert_eq!(h.resolve_limit(Some("0")), 10);
        assert_eq!(h.resolve_limit(Some("-3")), 10);
        assert_eq!(h.resolve_limit(Some("5000")), 100);
    }

    #[test]
    fn test_rejects_bad_limits() {
        assert!(parse("[history]\ndefault_limit = 0").is_err());
        assert!(parse("[history]\ndefault_limit = 20\nmax_limit = 5").is_err());
    }

    #[test]
    fn test_rejects_bad_delimiter_and_endpoint() {
        assert!(parse("[ingest]\ncsv_delimiter = \";;\"").is_err());
        assert!(parse("[history]\nendpoint = \"ftp://x\"").is_err());
        assert!(parse("[history]\nendpoint = \"http://127.0.0.1:7341\"").is_ok());
    }

    #[test]
    fn test_minimal_disables_history() {
        assert!(!Config::minimal().history.enabled);
    }
}
