//! Configuration loading
//!
//! Every setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error; the service starts on defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::endpoint::Endpoint;
use crate::{Error, Result};

pub const ENDPOINT_ENV: &str = "NAS_ENDPOINT";
pub const LOG_LEVEL_ENV: &str = "NAS_LOG_LEVEL";
pub const CONFIG_FILE_ENV: &str = "NAS_CONFIG";

/// Values used when nothing else is configured
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub endpoint: String,
    pub log_level: String,
    pub event_capacity: usize,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/".to_string(),
            log_level: "info".to_string(),
            event_capacity: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. `debug` or `nas_common=trace`
    pub level: Option<String>,
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL for resource URIs, must end with `/`
    pub endpoint: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Notification buffer per subscriber
    pub event_capacity: Option<usize>,
}

/// Settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub log_level: Option<String>,
    pub config_file: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub endpoint: Endpoint,
    pub log_level: String,
    pub event_capacity: usize,
}

impl ServiceConfig {
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let defaults = CompiledDefaults::default();
        let file = match config_file_path(overrides.config_file.as_deref()) {
            Some(path) => load_toml_config(&path)?.unwrap_or_default(),
            None => TomlConfig::default(),
        };

        let endpoint = pick(
            overrides.endpoint.clone(),
            ENDPOINT_ENV,
            file.endpoint,
            defaults.endpoint,
        );
        let log_level = pick(
            overrides.log_level.clone(),
            LOG_LEVEL_ENV,
            file.logging.level,
            defaults.log_level,
        );
        let event_capacity = file.event_capacity.unwrap_or(defaults.event_capacity);
        if event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".to_string()));
        }

        Ok(Self {
            endpoint: Endpoint::new(endpoint)?,
            log_level,
            event_capacity,
        })
    }
}

fn pick(cli: Option<String>, env_var: &str, file: Option<String>, default: String) -> String {
    cli.or_else(|| std::env::var(env_var).ok().filter(|v| !v.is_empty()))
        .or(file)
        .unwrap_or(default)
}

/// Locate the config file
///
/// An explicit path wins over `NAS_CONFIG`, which wins over
/// `<platform config dir>/nas/config.toml`.
pub fn config_file_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|d| d.join("nas").join("config.toml"))
}

/// Read and check a TOML config file
///
/// Returns `Ok(None)` with a warning when the file is missing or cannot be
/// read. Invalid contents are a `Config` error.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), "Config file not loaded ({}), using defaults", e);
            return Ok(None);
        }
    };

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))?;

    if let Some(endpoint) = &config.endpoint {
        if !endpoint.ends_with('/') {
            return Err(Error::Config(format!(
                "Invalid config file {}: endpoint must end with a slash",
                path.display()
            )));
        }
    }

    debug!(path = %path.display(), "Loaded config file");
    Ok(Some(config))
}
