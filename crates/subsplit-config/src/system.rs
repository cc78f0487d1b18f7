//! System configuration parsing.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use subsplit_core::SplitSet;
use tracing::info;

/// File looked up in the current directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Root directory for split workspaces.
    #[serde(rename = "working-directory")]
    pub working_directory: PathBuf,
    /// Monorepo URL. Push hooks for any other repository are skipped.
    pub url: String,
    /// Split targets, in publish order.
    pub splits: Vec<String>,
    /// Chat webhook endpoint. Empty disables notifications.
    pub slack_url: String,
    pub slack: SlackConfig,
    pub redis: RedisConfig,
    pub http: HttpConfig,
    pub split: SplitToolConfig,
}

/// Fixed fields of the chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub channel: String,
    pub username: String,
    pub icon_emoji: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            channel: "#asgardcmscom".to_string(),
            username: "buildbot".to_string(),
            icon_emoji: ":ghost:".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// `host:port` of the Redis server.
    pub host: String,
    pub password: String,
    pub db: i64,
    /// Namespace for the queue keys (`<prefix>:incoming`, ...).
    pub prefix: String,
    /// Keep outcome records in `<prefix>:processed` and `<prefix>:failures`.
    pub record_outcomes: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost:6379".to_string(),
            password: String::new(),
            db: 0,
            prefix: String::new(),
            record_outcomes: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub route: String,
    /// Shared secret for `X-Hub-Signature-256` verification.
    pub secret: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            route: "/".to_string(),
            secret: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitToolConfig {
    /// Command prefix for the split tool, e.g. `git subsplit`.
    pub tool: String,
    /// Maximum number of split targets published at once. With 1 the whole
    /// split set is published by a single invocation.
    pub parallelism: usize,
}

impl Default for SplitToolConfig {
    fn default() -> Self {
        Self {
            tool: "git subsplit".to_string(),
            parallelism: 1,
        }
    }
}

impl SplitterConfig {
    pub fn split_set(&self) -> SplitSet {
        SplitSet::new(self.splits.clone())
    }

    pub fn notifications_enabled(&self) -> bool {
        !self.slack_url.is_empty()
    }

    /// Check the fields the worker and the intake server depend on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.working_directory.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("working-directory".to_string()));
        }
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingField("url".to_string()));
        }
        if self.splits.is_empty() {
            return Err(ConfigError::MissingField("splits".to_string()));
        }
        if let Some(index) = self.splits.iter().position(|s| s.trim().is_empty()) {
            return Err(invalid(format!("splits[{}]", index), "split target is blank"));
        }
        if self.notifications_enabled() {
            url::Url::parse(&self.slack_url).map_err(|e| invalid("slack_url", e.to_string()))?;
        }
        if self.redis.host.trim().is_empty() {
            return Err(ConfigError::MissingField("redis.host".to_string()));
        }
        if self.http.port == 0 {
            return Err(invalid("http.port", "port must be non-zero"));
        }
        if !self.http.route.starts_with('/') {
            return Err(invalid("http.route", "route must start with '/'"));
        }
        if self.split.tool.trim().is_empty() {
            return Err(ConfigError::MissingField("split.tool".to_string()));
        }
        if self.split.parallelism == 0 {
            return Err(invalid("split.parallelism", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

/// Parse and validate configuration from JSON text.
pub fn parse_config(json: &str) -> ConfigResult<SplitterConfig> {
    let config: SplitterConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Read, parse and validate the configuration file at `path`.
pub fn load_config(path: &Path) -> ConfigResult<SplitterConfig> {
    info!(path = %path.display(), "Looking for config");
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&json)
}

/// `config.json` in the current directory.
pub fn default_config_path() -> ConfigResult<PathBuf> {
    Ok(std::env::current_dir()?.join(DEFAULT_CONFIG_FILE))
}

/// Use the explicit path when given, else [`default_config_path`].
pub fn resolve_config_path(explicit: Option<PathBuf>) -> ConfigResult<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => default_config_path(),
    }
}
