//! Configuration for the `taskclaim` binary.
//!
//! Read from environment variables:
//! - `NOTION_TOKEN` - Required for store access. Passed through to the notion CLI.
//! - `NOTION_TASKS_DB_ID` - Required for store access. The tasks database.
//! - `NOTION_BIN` - Optional. The notion CLI executable. Defaults to `notion`.
//! - `TASKCLAIM_STATE_FILE` - Optional. Local claim state file.
//!   Defaults to `$HOME/.taskclaim/state/current-task.json`.
//! - `TASKCLAIM_LEASE_MINUTES` - Optional. Lease length for claim and heartbeat. Defaults to `15`.
//! - `TASKCLAIM_AGENT_NAME` - Optional. Written to the `Agent` property on claim.

use std::path::PathBuf;

use taskclaim_core::ServiceConfig;
use thiserror::Error;

pub const TOKEN_VAR: &str = "NOTION_TOKEN";
pub const DB_ID_VAR: &str = "NOTION_TASKS_DB_ID";

const DEFAULT_BIN: &str = "notion";
const STATE_FILE_SUFFIX: &str = ".taskclaim/state/current-task.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingEnvVar(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("Cannot locate the claim state file: set TASKCLAIM_STATE_FILE or HOME")]
    NoStateFile,
}

/// Store access settings, present only when both variables are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub token: String,
    pub database_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub notion_token: Option<String>,
    pub tasks_db_id: Option<String>,
    pub notion_bin: String,
    pub state_file: PathBuf,
    pub lease_minutes: u32,
    pub agent_name: Option<String>,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let state_file = match get("TASKCLAIM_STATE_FILE") {
            Some(path) => PathBuf::from(path),
            None => get("HOME")
                .map(|home| PathBuf::from(home).join(STATE_FILE_SUFFIX))
                .ok_or(ConfigError::NoStateFile)?,
        };

        let lease_minutes = match get("TASKCLAIM_LEASE_MINUTES") {
            Some(raw) => parse_minutes("TASKCLAIM_LEASE_MINUTES", &raw)?,
            None => ServiceConfig::default().lease_minutes,
        };

        Ok(Self {
            notion_token: get(TOKEN_VAR),
            tasks_db_id: get(DB_ID_VAR),
            notion_bin: get("NOTION_BIN").unwrap_or_else(|| DEFAULT_BIN.to_string()),
            state_file,
            lease_minutes,
            agent_name: get("TASKCLAIM_AGENT_NAME"),
        })
    }

    /// Token and database id, or the first one missing.
    pub fn store(&self) -> Result<StoreConfig, ConfigError> {
        let token = self
            .notion_token
            .clone()
            .ok_or(ConfigError::MissingEnvVar(TOKEN_VAR))?;
        let database_id = self
            .tasks_db_id
            .clone()
            .ok_or(ConfigError::MissingEnvVar(DB_ID_VAR))?;
        Ok(StoreConfig { token, database_id })
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            lease_minutes: self.lease_minutes,
            heartbeat_minutes: self.lease_minutes,
            agent_name: self.agent_name.clone(),
            ..ServiceConfig::default()
        }
    }
}

pub(crate) fn parse_minutes(name: &'static str, raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            name,
            reason: "must be at least 1".to_string(),
        }),
        Ok(minutes) => Ok(minutes),
        Err(e) => Err(ConfigError::InvalidValue {
            name,
            reason: format!("'{raw}': {e}"),
        }),
    }
}
