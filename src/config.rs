//! Configuration module for probewatch.
//!
//! File locations come from environment variables; the settings themselves
//! come from a TOML file with a `[main]` (mail) and a `[monitoring]` table.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::probe::{ProbeSettings, DEFAULT_HTTP_TIMEOUT, DEFAULT_TCP_TIMEOUT};

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Where the config file and the event database live.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    /// Path to the TOML config file (default: `monitoring.toml` beside the executable)
    pub config_path: PathBuf,
    /// Path to the SQLite database file (default: `monitoring.db` beside the config)
    pub db_path: PathBuf,
}

impl RuntimePaths {
    /// Resolve paths from environment variables.
    ///
    /// Environment variables:
    /// - `PROBEWATCH_CONFIG`: config file path
    /// - `PROBEWATCH_DB_PATH`: database file path
    pub fn load() -> Self {
        let config_path = env::var("PROBEWATCH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| executable_dir().join("monitoring.toml"));

        let db_path = env::var("PROBEWATCH_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| sibling(&config_path, "monitoring.db"));

        Self {
            config_path,
            db_path,
        }
    }
}

fn executable_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn sibling(path: &Path, file_name: &str) -> PathBuf {
    match path.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Full configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub main: SmtpConfig,
    pub monitoring: MonitoringConfig,
}

/// Mail session settings.
#[derive(Clone, Deserialize)]
pub struct SmtpConfig {
    pub smtp_host: String,
    #[serde(alias = "stmp_user")]
    pub smtp_user: String,
    pub smtp_password: String,
    #[serde(default = "default_true")]
    pub starttls: bool,
    #[serde(default = "default_smtp_port", alias = "port")]
    pub smtp_port: u16,
    pub smtp_from: String,
    pub smtp_to: String,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_user", &self.smtp_user)
            .field("starttls", &self.starttls)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_from", &self.smtp_from)
            .field("smtp_to", &self.smtp_to)
            .finish()
    }
}

/// Endpoint list and probe timeouts.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Comma-separated endpoint descriptors.
    pub urls: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_tcp_timeout_secs")]
    pub tcp_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_smtp_port() -> u16 {
    587
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT.as_secs()
}

fn default_tcp_timeout_secs() -> u64 {
    DEFAULT_TCP_TIMEOUT.as_secs()
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("smtp_host", &self.main.smtp_host),
            ("smtp_user", &self.main.smtp_user),
            ("smtp_password", &self.main.smtp_password),
            ("smtp_from", &self.main.smtp_from),
            ("smtp_to", &self.main.smtp_to),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }

        if self.endpoints().is_empty() {
            return Err(ConfigError::Missing("urls"));
        }
        if self.monitoring.http_timeout_secs == 0 || self.monitoring.tcp_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "probe timeouts must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }

    /// Endpoint descriptors in listed order.
    ///
    /// Newlines are stripped before splitting; entries are trimmed and empty
    /// entries dropped.
    pub fn endpoints(&self) -> Vec<String> {
        self.monitoring
            .urls
            .replace(['\r', '\n'], "")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            http_timeout: Duration::from_secs(self.monitoring.http_timeout_secs),
            tcp_timeout: Duration::from_secs(self.monitoring.tcp_timeout_secs),
        }
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Config::from_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
[main]
smtp_host = "mail.example.com"
smtp_user = "monitor@example.com"
smtp_password = "secret"
starttls = false
smtp_port = 2525
smtp_from = "monitor@example.com"
smtp_to = "ops@example.com"

[monitoring]
urls = """
https://example.com,
  db.internal:5432,
http://localhost:8080/health
"""
http_timeout_secs = 15
tcp_timeout_secs = 3
"#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(FULL).unwrap();

        assert_eq!(config.main.smtp_host, "mail.example.com");
        assert!(!config.main.starttls);
        assert_eq!(config.main.smtp_port, 2525);
        assert_eq!(
            config.endpoints(),
            vec![
                "https://example.com",
                "db.internal:5432",
                "http://localhost:8080/health"
            ]
        );

        let settings = config.probe_settings();
        assert_eq!(settings.http_timeout, Duration::from_secs(15));
        assert_eq!(settings.tcp_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_defaults_and_legacy_keys() {
        let content = r#"
[main]
smtp_host = "mail.example.com"
stmp_user = "monitor@example.com"
smtp_password = "secret"
port = 465
smtp_from = "monitor@example.com"
smtp_to = "ops@example.com"

[monitoring]
urls = "https://example.com,"
"#;
        let config = Config::from_toml(content).unwrap();

        assert_eq!(config.main.smtp_user, "monitor@example.com");
        assert_eq!(config.main.smtp_port, 465);
        assert!(config.main.starttls);
        assert_eq!(config.endpoints(), vec!["https://example.com"]);
        assert_eq!(config.probe_settings().http_timeout, Duration::from_secs(30));
        assert_eq!(config.probe_settings().tcp_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_default_port_is_587() {
        let content = FULL.replace("smtp_port = 2525\n", "");
        let config = Config::from_toml(&content).unwrap();
        assert_eq!(config.main.smtp_port, 587);
    }

    #[test]
    fn test_empty_required_setting_rejected() {
        let content = FULL.replace(r#"smtp_password = "secret""#, r#"smtp_password = """#);
        let err = Config::from_toml(&content).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("smtp_password")));
    }

    #[test]
    fn test_missing_table_rejected() {
        let err = Config::from_toml("[main]\nsmtp_host = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_url_list_rejected() {
        let content = FULL
            .replace("https://example.com,", "")
            .replace("  db.internal:5432,", "")
            .replace("http://localhost:8080/health", " , ");
        let err = Config::from_toml(&content).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("urls")));
    }

    #[test]
    fn test_debug_hides_password() {
        let config = Config::from_toml(FULL).unwrap();
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(FULL.as_bytes()).unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.endpoints().len(), 3);

        let err = load_config(Path::new("/nonexistent/monitoring.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_db_defaults_beside_config() {
        assert_eq!(
            sibling(Path::new("/etc/probewatch/monitoring.toml"), "monitoring.db"),
            PathBuf::from("/etc/probewatch/monitoring.db")
        );
    }
}
