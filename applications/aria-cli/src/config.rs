//! CLI configuration
//!
//! Loaded from an optional TOML file, then `ARIA_`-prefixed environment
//! variables. Nested keys use a double underscore:
//! `ARIA_ENGINE__PROGRESS_INTERVAL_MS=250`, `ARIA_LOG_FILTER=aria=debug`.

use crate::error::{CliError, Result};
use aria_playback::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "aria.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    /// JSON file holding effect and playback settings
    #[serde(default = "default_preferences_path")]
    pub preferences_path: PathBuf,

    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Run audio through the in-process effects rack
    #[serde(default = "default_software_effects")]
    pub software_effects: bool,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// A missing file is fine for the default path; an explicitly requested
    /// file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("ARIA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.engine.validate().map_err(CliError::Config)?;

        if self.log_filter.trim().is_empty() {
            return Err(CliError::Config("log_filter must not be empty".to_string()));
        }

        if self.preferences_path.as_os_str().is_empty() {
            return Err(CliError::Config(
                "preferences_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// Default values
fn default_preferences_path() -> PathBuf {
    PathBuf::from("./data/preferences.json")
}

fn default_log_filter() -> String {
    "aria=info".to_string()
}

fn default_software_effects() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            preferences_path: default_preferences_path(),
            log_filter: default_log_filter(),
            software_effects: default_software_effects(),
        }
    }
}
