//! Application configuration management
//!
//! This module handles loading and validating configuration from TOML files.
//! The upstream credentials fall back to the `OPENAI_API_KEY` and
//! `OPENAI_BASE_URL` environment variables when the file leaves them empty.

use anyhow::{Context, Result, bail};
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default buffered request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 60;

/// Default idle timeout between streamed chunks in seconds
const DEFAULT_STREAM_IDLE_TIMEOUT: u64 = 300;

/// Default server port, the one local Ollama clients probe
const DEFAULT_PORT: u16 = 11434;

/// Environment fallback for the upstream API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment fallback for the upstream base URL
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Errors raised when a [`ServerConfig`] is constructed from invalid values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Unsupported base URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpstreamSection {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_stream_idle_timeout")]
    pub stream_idle_timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ModelsSection {
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub extra: Vec<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_stream_idle_timeout() -> u64 {
    DEFAULT_STREAM_IDLE_TIMEOUT
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub upstream: UpstreamSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub models: ModelsSection,
}

/// Everything one proxy server instance needs, fixed for its lifetime
#[derive(Clone)]
pub struct ServerConfig {
    /// Secret sent upstream as a bearer token
    pub api_key: String,

    /// Absolute http(s) URL the upstream endpoints are joined onto
    pub base_url: Url,

    /// Bind host
    pub host: String,

    /// Bind port, `0` asks the OS for a free one
    pub port: u16,

    /// Capabilities reported by `/api/show` after `completion`
    pub capabilities: Vec<String>,

    /// Model names surfaced by `/api/tags` even if upstream omits them
    pub extra_models: Vec<String>,

    /// Overall timeout for buffered upstream calls
    pub request_timeout: Duration,

    /// Maximum silence between streamed chunks, `None` waits forever
    pub stream_idle_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Create a config with default timeouts and empty model lists
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `base_url` is not an absolute http(s) URL.
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        host: impl Into<String>,
        port: u16,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: parse_base_url(base_url)?,
            host: host.into(),
            port,
            capabilities: Vec::new(),
            extra_models: Vec::new(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            stream_idle_timeout: Some(Duration::from_secs(DEFAULT_STREAM_IDLE_TIMEOUT)),
        })
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_extra_models(mut self, extra_models: Vec<String>) -> Self {
        self.extra_models = extra_models;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_stream_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stream_idle_timeout = timeout;
        self
    }

    /// `host:port` string handed to the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("host", &self.host)
            .field("port", &self.port)
            .field("capabilities", &self.capabilities)
            .field("extra_models", &self.extra_models)
            .field("request_timeout", &self.request_timeout)
            .field("stream_idle_timeout", &self.stream_idle_timeout)
            .finish()
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

/// Application configuration loaded from a TOML file
#[derive(Debug, Clone)]
pub struct Config {
    /// Settings for the proxy server instance
    pub server: ServerConfig,

    /// Logging level
    pub log_level: String,
}

impl Config {
    /// Load configuration from a TOML file, consulting the process environment
    /// for missing upstream credentials
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The TOML file cannot be read or parsed
    /// - The API key or base URL is missing after environment fallback
    /// - The base URL is not an absolute http(s) URL
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read configuration file")?;
        Self::parse(&content, |key| std::env::var(key).ok())
    }

    /// Load configuration from the file named by `CONFIG_PATH`
    ///
    /// Looks for config.toml in current directory by default
    pub fn from_env() -> Result<Self> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        Self::from_file(config_path)
    }

    /// Parse TOML content, resolving credential fallbacks through `env`
    pub fn parse<F>(content: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config: TomlConfig =
            toml::from_str(content).context("Failed to parse TOML configuration")?;

        let api_key = non_empty(config.upstream.api_key)
            .or_else(|| env(API_KEY_ENV).and_then(non_empty));
        let base_url = non_empty(config.upstream.base_url)
            .or_else(|| env(BASE_URL_ENV).and_then(non_empty));

        let (api_key, base_url) = match (api_key, base_url) {
            (Some(key), Some(url)) => (key, url),
            _ => bail!("Missing API key or Base URL"),
        };

        let stream_idle_timeout = match config.upstream.stream_idle_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let server = ServerConfig::new(api_key, &base_url, config.server.host, config.server.port)
            .context("Invalid upstream configuration")?
            .with_capabilities(config.models.capabilities)
            .with_extra_models(config.models.extra)
            .with_request_timeout(Duration::from_secs(config.upstream.request_timeout))
            .with_stream_idle_timeout(stream_idle_timeout);

        Ok(Config {
            server,
            log_level: config.server.log_level,
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn create_test_config() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [upstream]
            api_key = "sk-test123"
            base_url = "https://api.example.com/v1"
            request_timeout = 30
            stream_idle_timeout = 0

            [server]
            host = "127.0.0.1"
            port = 11500
            log_level = "debug"

            [models]
            capabilities = ["tools", "vision"]
            extra = ["my-model"]
        "#
        )
        .unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_config() {
        let file = create_test_config();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.api_key, "sk-test123");
        assert_eq!(config.server.base_url.as_str(), "https://api.example.com/v1");
        assert_eq!(config.server.bind_address(), "127.0.0.1:11500");
        assert_eq!(config.server.capabilities, vec!["tools", "vision"]);
        assert_eq!(config.server.extra_models, vec!["my-model"]);
        assert_eq!(config.server.request_timeout, Duration::from_secs(30));
        assert_eq!(config.server.stream_idle_timeout, None);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_defaults_applied() {
        let content = r#"
            [upstream]
            api_key = "k"
            base_url = "http://localhost:8000/v1"
        "#;
        let config = Config::parse(content, no_env).unwrap();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 11434);
        assert_eq!(config.server.request_timeout, Duration::from_secs(60));
        assert_eq!(
            config.server.stream_idle_timeout,
            Some(Duration::from_secs(300))
        );
        assert!(config.server.capabilities.is_empty());
        assert!(config.server.extra_models.is_empty());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_env_fallback_for_credentials() {
        let env: HashMap<&str, &str> = HashMap::from([
            (API_KEY_ENV, "sk-from-env"),
            (BASE_URL_ENV, "https://env.example.com/v1/"),
        ]);
        let config = Config::parse("", |key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.server.api_key, "sk-from-env");
        assert_eq!(config.server.base_url.path(), "/v1/");
    }

    #[test]
    fn test_file_value_wins_over_env() {
        let content = r#"
            [upstream]
            api_key = "sk-file"
            base_url = "https://file.example.com"
        "#;
        let config = Config::parse(content, |_| Some("sk-env".to_string())).unwrap();
        assert_eq!(config.server.api_key, "sk-file");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let err = Config::parse("[upstream]\napi_key = \"k\"\n", no_env).unwrap_err();
        assert!(err.to_string().contains("Missing API key or Base URL"));
    }

    #[test]
    fn test_relative_base_url_rejected() {
        assert!(matches!(
            ServerConfig::new("k", "/v1", "localhost", 0),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        assert!(matches!(
            ServerConfig::new("k", "ftp://example.com/v1", "localhost", 0),
            Err(ConfigError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ServerConfig::new("sk-secret", "https://example.com", "localhost", 0).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
