//! Configuration management module
//!
//! A single YAML document holding the flow policy and trigger settings.
//! Every key is optional; absent keys keep their defaults.

use std::path::Path;
use std::time::Duration;

use action_flow::{FlowError, FlowPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

pub const ENV_GENERIC_ATTEMPTS: &str = "HANDOFF_GENERIC_ATTEMPTS";
pub const ENV_GENERIC_INTERVAL_MS: &str = "HANDOFF_GENERIC_INTERVAL_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value '{value}' for {key}")]
    InvalidOverride { key: String, value: String },

    #[error("invalid run deadline '{value}': {reason}")]
    InvalidDeadline { value: String, reason: String },

    #[error(transparent)]
    Policy(#[from] FlowError),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub flow: FlowPolicy,
    pub trigger: TriggerSettings,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSettings {
    /// Operator default for the wait-for-return switch
    pub wait_for_return: bool,
    /// Whole-run deadline in humantime form ("30s", "2m")
    pub run_deadline: Option<String>,
}

impl TriggerSettings {
    pub fn deadline(&self) -> Result<Option<Duration>, ConfigError> {
        self.run_deadline
            .as_deref()
            .map(parse_deadline)
            .transpose()
    }
}

pub fn parse_deadline(value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|err| ConfigError::InvalidDeadline {
        value: value.to_string(),
        reason: err.to_string(),
    })
}

impl Config {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub async fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_yaml_str(&raw)
    }

    /// Apply `HANDOFF_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_GENERIC_ATTEMPTS) {
            self.flow.timings.generic_attempts = parse_override(ENV_GENERIC_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_GENERIC_INTERVAL_MS) {
            self.flow.timings.generic_interval_ms =
                parse_override(ENV_GENERIC_INTERVAL_MS, &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.flow.validate()?;
        self.trigger.deadline()?;
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            key: key.to_string(),
            value: value.to_string(),
        })
}
