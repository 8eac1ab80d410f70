//! Runtime configuration sourced from the environment.
//!
//! # Responsibility
//! - Read `PM_*` keys (after loading an optional `.env` file).
//! - Normalize values into typed settings with documented defaults.
//!
//! # Invariants
//! - Every rejected value is reported with the key that carried it.

use crate::interval::BoundaryPolicy;
use crate::logging::{default_log_level, normalize_level};
use std::env;
use std::fmt;
use std::path::PathBuf;

pub const DATABASE_PATH_KEY: &str = "PM_DATABASE_PATH";
pub const LOG_LEVEL_KEY: &str = "PM_LOG_LEVEL";
pub const LOG_DIR_KEY: &str = "PM_LOG_DIR";
pub const OVERLAP_POLICY_KEY: &str = "PM_OVERLAP_POLICY";

/// Settings shared by every entry point of the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite file. `None` selects an in-memory database.
    pub database_path: Option<PathBuf>,
    pub log_level: &'static str,
    /// Absolute log directory. `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
    pub overlap_policy: BoundaryPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level(),
            log_dir: None,
            overlap_policy: BoundaryPolicy::default(),
        }
    }
}

impl CoreConfig {
    /// Loads `.env` (when present) and then reads the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let database_path = read(DATABASE_PATH_KEY).map(PathBuf::from);

        let log_level = match read(LOG_LEVEL_KEY) {
            Some(value) => normalize_level(&value).map_err(|reason| ConfigError::Invalid {
                key: LOG_LEVEL_KEY,
                reason,
            })?,
            None => default_log_level(),
        };

        let log_dir = match read(LOG_DIR_KEY).map(PathBuf::from) {
            Some(path) if !path.is_absolute() => {
                return Err(ConfigError::Invalid {
                    key: LOG_DIR_KEY,
                    reason: format!("must be an absolute path, got `{}`", path.display()),
                })
            }
            other => other,
        };

        let overlap_policy = match read(OVERLAP_POLICY_KEY) {
            Some(value) => value
                .parse::<BoundaryPolicy>()
                .map_err(|reason| ConfigError::Invalid {
                    key: OVERLAP_POLICY_KEY,
                    reason,
                })?,
            None => BoundaryPolicy::default(),
        };

        Ok(Self {
            database_path,
            log_level,
            log_dir,
            overlap_policy,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, reason } => write!(f, "{key}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
