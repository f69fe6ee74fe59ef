//! Config file discovery and environment overrides

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::toml::{load_from_file, validate_config, QuarryToml};
use crate::ConfigResult;
use quarry_core::error::QuarryError;
use quarry_core::types::UpgradeStrategy;

/// File name looked up by `ConfigLoader`
pub const CONFIG_FILE_NAME: &str = "quarry.toml";

/// Overrides the index URL
pub const ENV_INDEX_URL: &str = "QUARRY_INDEX_URL";

/// Overrides the upgrade strategy
pub const ENV_UPGRADE_STRATEGY: &str = "QUARRY_UPGRADE_STRATEGY";

const ENV_PREFIX: &str = "QUARRY_";

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// A quarry.toml file
    File(Utf8PathBuf),
    /// No file was found; built-in defaults
    Defaults,
}

/// Finds and loads the project configuration
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    cwd: Utf8PathBuf,
}

impl ConfigLoader {
    pub fn new(cwd: impl Into<Utf8PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Nearest `filename` in the working directory or one of its ancestors
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        self.cwd
            .ancestors()
            .map(|dir| dir.join(filename))
            .find(|candidate| candidate.is_file())
    }

    /// Load quarry.toml, falling back to defaults when there is none
    pub fn load_project_config(&self) -> ConfigResult<(QuarryToml, ConfigSource)> {
        match self.resolve_config_path(CONFIG_FILE_NAME) {
            Some(path) => {
                debug!("loading configuration from {}", path);
                let config = load_from_file(&path)?;
                Ok((config, ConfigSource::File(path)))
            },
            None => {
                debug!("no {} above {}, using defaults", CONFIG_FILE_NAME, self.cwd);
                Ok((QuarryToml::default(), ConfigSource::Defaults))
            },
        }
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }
}

/// Environment overrides applied on top of a loaded configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigLayering {
    env_overrides: HashMap<String, String>,
}

impl ConfigLayering {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides taken from the process environment
    pub fn from_env() -> Self {
        Self {
            env_overrides: Self::collect_env_overrides(),
        }
    }

    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.insert(key.into(), value.into());
        self
    }

    /// `QUARRY_*` variables from the process environment
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }

    /// Apply the overrides and re-validate the result
    pub fn apply(&self, mut config: QuarryToml) -> ConfigResult<QuarryToml> {
        for (key, value) in &self.env_overrides {
            match key.as_str() {
                ENV_INDEX_URL => {
                    config.index.url = value.clone();
                },
                ENV_UPGRADE_STRATEGY => {
                    config.resolver.upgrade_strategy =
                        value.parse::<UpgradeStrategy>().map_err(|e| match e {
                            QuarryError::ConfigValidation { reason, .. } => {
                                QuarryError::ConfigValidation {
                                    field: ENV_UPGRADE_STRATEGY.to_string(),
                                    reason,
                                }
                            },
                            other => other,
                        })?;
                },
                _ => {
                    // Unknown variable, ignore
                },
            }
        }

        validate_config(&config).map_err(|e| match e {
            QuarryError::ConfigValidation { field, reason } if field == "index.url" => {
                QuarryError::ConfigValidation {
                    field: ENV_INDEX_URL.to_string(),
                    reason,
                }
            },
            other => other,
        })?;
        Ok(config)
    }
}
