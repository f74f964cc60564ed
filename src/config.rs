//! Configuration: optional TOML file, then environment overrides.
//!
//! ```toml
//! [logger]
//! level = "info"
//! concise = false
//!
//! [server]
//! base_url = "http://127.0.0.1:8080"
//! connect_timeout_secs = 3
//! request_timeout_secs = 45
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logger: LoggerConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// A `tracing_subscriber::EnvFilter` directive, e.g. `info` or
    /// `adventure_client=debug`.
    pub level: String,
    /// Use the compact single-line formatter.
    pub concise: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            concise: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            connect_timeout_secs: 3,
            request_timeout_secs: 45,
        }
    }
}

impl ServerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Parse a TOML document. Absent keys keep their defaults.
    pub fn from_toml_str(s: &str, origin: &str) -> Result<Self, ConfigError> {
        let mut cfg: Config = toml::from_str(s).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        cfg.normalize();
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    /// Load `path` if given, otherwise start from defaults, then apply the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|var| std::env::var(var).ok())?;
        Ok(cfg)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Recognized: `LOGGER_LEVEL`, `LOGGER_CONCISE`, `ADVENTURE_BASE_URL`,
    /// `ADVENTURE_CONNECT_TIMEOUT_SECS`, `ADVENTURE_REQUEST_TIMEOUT_SECS`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("LOGGER_LEVEL") {
            self.logger.level = level;
        }
        if let Some(concise) = lookup("LOGGER_CONCISE") {
            self.logger.concise = concise == "true";
        }
        if let Some(url) = lookup("ADVENTURE_BASE_URL") {
            self.server.base_url = url;
        }
        if let Some(secs) = parse_secs(&lookup, "ADVENTURE_CONNECT_TIMEOUT_SECS")? {
            self.server.connect_timeout_secs = secs;
        }
        if let Some(secs) = parse_secs(&lookup, "ADVENTURE_REQUEST_TIMEOUT_SECS")? {
            self.server.request_timeout_secs = secs;
        }
        self.normalize();
        Ok(())
    }

    /// Override the base URL (from a CLI flag).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.server.base_url = base_url.into();
        self.normalize();
        self
    }

    fn normalize(&mut self) {
        while self.server.base_url.ends_with('/') {
            self.server.base_url.pop();
        }
    }
}

fn parse_secs<F>(lookup: &F, var: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value,
            }),
    }
}
