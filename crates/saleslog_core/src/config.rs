//! Runtime configuration.
//!
//! Values come from an optional TOML file, then `SALESLOG_*` environment
//! variables override individual keys.

use crate::logging::{default_log_level, normalize_level, LoggingError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_DB_PATH: &str = "saleslog.sqlite3";

pub const ENV_DB_PATH: &str = "SALESLOG_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "SALESLOG_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "SALESLOG_LOG_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required config field `{field}`")]
    MissingField { field: &'static str },
    #[error(transparent)]
    Logging(#[from] LoggingError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Canonical level name (`trace` .. `error`).
    pub log_level: String,
    /// Rolling log directory; file logging is off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads `path` when given, then applies process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let contents = match path {
            Some(path) => Some(std::fs::read_to_string(path).map_err(|source| {
                ConfigError::ReadFile {
                    path: path.to_path_buf(),
                    source,
                }
            })?),
            None => None,
        };
        Self::from_sources(contents.as_deref(), |key| std::env::var(key).ok())
    }

    /// Builds a config from TOML text and an environment lookup.
    pub fn from_sources<F>(file_contents: Option<&str>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = match file_contents {
            Some(contents) => toml::from_str(contents)?,
            None => Self::default(),
        };

        if let Some(db_path) = non_blank(env(ENV_DB_PATH)) {
            config.db_path = PathBuf::from(db_path);
        }
        if let Some(level) = non_blank(env(ENV_LOG_LEVEL)) {
            config.log_level = level;
        }
        if let Some(log_dir) = non_blank(env(ENV_LOG_DIR)) {
            config.log_dir = Some(PathBuf::from(log_dir));
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField { field: "db_path" });
        }
        self.log_level = normalize_level(&self.log_level)?.to_string();
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DEFAULT_DB_PATH, ENV_DB_PATH, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let config = AppConfig::from_sources(None, env_of(&[])).unwrap();
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn env_overrides_file_values() {
        let file = r#"
            db_path = "from-file.sqlite3"
            log_level = "warn"
        "#;
        let config = AppConfig::from_sources(
            Some(file),
            env_of(&[(ENV_DB_PATH, "/data/crm.sqlite3"), (ENV_LOG_LEVEL, "")]),
        )
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/data/crm.sqlite3"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn log_level_is_normalized_and_checked() {
        let config =
            AppConfig::from_sources(Some("log_level = \"WARNING\""), env_of(&[])).unwrap();
        assert_eq!(config.log_level, "warn");

        let error = AppConfig::from_sources(None, env_of(&[(ENV_LOG_LEVEL, "loud")])).unwrap_err();
        assert!(matches!(error, ConfigError::Logging(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = AppConfig::from_sources(Some("database = \"x\""), env_of(&[])).unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }
}
