//! Application-level configuration loading, including the cascade engine tunables.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    dao::record_store::MAX_PAGE_SIZE,
    services::cascade::{CascadeSettings, DEFAULT_BATCH_SIZE},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SIDELINE_BACK_CONFIG_PATH";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    cascade: CascadeSettings,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        batch_size = app_config.cascade.batch_size,
                        page_size = app_config.cascade.page_size,
                        "loaded cascade settings from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse the JSON document. Out-of-range cascade values are replaced by defaults.
    fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let raw = serde_json::from_str::<RawConfig>(contents)?;
        Ok(raw.into())
    }

    /// Tunables handed to the cascade service.
    pub fn cascade(&self) -> CascadeSettings {
        self.cascade
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    cascade: Option<RawCascadeSettings>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let Some(raw) = value.cascade else {
            return Self::default();
        };

        match raw.validate() {
            Ok(()) => Self {
                cascade: CascadeSettings {
                    batch_size: raw.batch_size,
                    page_size: raw.page_size,
                },
            },
            Err(errors) => {
                warn!(error = %errors, "invalid cascade settings; using defaults");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
/// JSON representation of the `cascade` section.
struct RawCascadeSettings {
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1, max = 100))]
    batch_size: usize,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 1000))]
    page_size: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_cascade_section() {
        let config =
            AppConfig::from_json(r#"{"cascade": {"batch_size": 25, "page_size": 200}}"#).unwrap();
        assert_eq!(
            config.cascade(),
            CascadeSettings {
                batch_size: 25,
                page_size: 200
            }
        );
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = AppConfig::from_json(r#"{"cascade": {"batch_size": 4}}"#).unwrap();
        assert_eq!(config.cascade().batch_size, 4);
        assert_eq!(config.cascade().page_size, MAX_PAGE_SIZE);

        let empty = AppConfig::from_json("{}").unwrap();
        assert_eq!(empty, AppConfig::default());
    }

    #[test]
    fn out_of_range_values_fall_back_to_defaults() {
        let zero = AppConfig::from_json(r#"{"cascade": {"batch_size": 0}}"#).unwrap();
        assert_eq!(zero.cascade(), CascadeSettings::default());

        let oversized = AppConfig::from_json(r#"{"cascade": {"page_size": 5000}}"#).unwrap();
        assert_eq!(oversized.cascade(), CascadeSettings::default());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(AppConfig::from_json("{ not json").is_err());
        assert!(AppConfig::from_json(r#"{"cascade": {"batch_size": "ten"}}"#).is_err());
    }
}
