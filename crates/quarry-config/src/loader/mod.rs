//! Configuration layering: defaults, file, environment and CLI overrides

use quarry_core::error::QuarryError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::settings::{parse_bool, Settings};
use crate::ConfigResult;


/// Prefix of environment variables that override settings
pub const ENV_PREFIX: &str = "QUARRY_";

/// Where an override came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

/// Builds `Settings` from layered sources.
///
/// Later layers win: defaults, then the TOML file, then `QUARRY_*`
/// environment variables, then explicit overrides.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config_file: Option<PathBuf>,
    env_overrides: HashMap<String, String>,
    cli_overrides: Vec<(String, String)>,
}

impl ConfigLoader {
    /// Loader reading overrides from the process environment
    pub fn new() -> Self {
        Self::default().with_env(std::env::vars())
    }

    /// Use an explicit configuration file; it must exist
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Replace the environment layer, keeping only `QUARRY_*` variables
    pub fn with_env<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env_overrides = vars
            .into_iter()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect();
        self
    }

    /// Add a CLI override by settings key
    pub fn with_override(mut self, key: &str, value: impl Into<String>) -> Self {
        self.cli_overrides.push((key.to_string(), value.into()));
        self
    }

    /// Default configuration file location, `~/.config/quarry/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("quarry").join("config.toml"))
    }

    /// Resolve all layers into validated settings
    pub async fn load(&self) -> ConfigResult<Settings> {
        let mut settings = match &self.config_file {
            Some(path) => load_from_file(path).await?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => load_from_file(&path).await?,
                _ => {
                    tracing::debug!("No configuration file found, using defaults");
                    Settings::default()
                },
            },
        };

        let mut env: Vec<(&String, &String)> = self.env_overrides.iter().collect();
        env.sort();
        for (var, value) in env {
            let key = var[ENV_PREFIX.len()..].to_ascii_lowercase();
            if !is_known_key(&key) {
                continue;
            }
            apply_override(&mut settings, &key, value, &ConfigSource::Environment(var.clone()))?;
        }

        for (key, value) in &self.cli_overrides {
            apply_override(&mut settings, key, value, &ConfigSource::CommandLine)?;
        }

        settings.validate()
    }
}

/// Parse a TOML settings file
pub async fn load_from_file(path: &Path) -> ConfigResult<Settings> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        QuarryError::io(format!("Failed to read config file: {}", path.display()), e)
    })?;
    tracing::debug!("Loaded configuration from {}", path.display());
    parse_settings(&content, path)
}

/// Parse settings from TOML text
pub fn parse_settings(content: &str, origin: &Path) -> ConfigResult<Settings> {
    toml::from_str(content).map_err(|e| QuarryError::ConfigParse {
        path: origin.display().to_string(),
        message: e.to_string(),
    })
}

const KNOWN_KEYS: &[&str] = &[
    "chunk_size",
    "max_retries",
    "attempt_timeout_secs",
    "file_check_content",
    "galaxy_url",
    "pypi_url",
    "core_repo_url",
    "core_package",
    "core_version_file",
    "collection_cache",
    "trust_collection_cache",
    "core_cache",
    "trust_core_cache",
];

fn is_known_key(key: &str) -> bool {
    KNOWN_KEYS.contains(&key)
}

fn apply_override(
    settings: &mut Settings,
    key: &str,
    value: &str,
    source: &ConfigSource,
) -> ConfigResult<()> {
    let field = match source {
        ConfigSource::Environment(var) => var.clone(),
        ConfigSource::CommandLine => key.to_string(),
    };
    let number = |value: &str| -> ConfigResult<u64> {
        value.trim().parse::<u64>().map_err(|_| QuarryError::ConfigValidation {
            field: field.clone(),
            reason: format!("'{}' is not a non-negative integer", value),
        })
    };
    let path = |value: &str| {
        if value.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(value.trim()))
        }
    };

    match key {
        "chunk_size" => settings.chunk_size = number(value)? as usize,
        "max_retries" => {
            settings.max_retries = u32::try_from(number(value)?).map_err(|_| {
                QuarryError::ConfigValidation {
                    field: field.clone(),
                    reason: "value too large".to_string(),
                }
            })?
        },
        "attempt_timeout_secs" => settings.attempt_timeout_secs = number(value)?,
        "file_check_content" => settings.file_check_content = number(value)?,
        "galaxy_url" => settings.galaxy_url = value.trim().to_string(),
        "pypi_url" => settings.pypi_url = value.trim().to_string(),
        "core_repo_url" => settings.core_repo_url = value.trim().to_string(),
        "core_package" => settings.core_package = value.trim().to_string(),
        "core_version_file" => settings.core_version_file = value.trim().to_string(),
        "collection_cache" => settings.collection_cache = path(value),
        "trust_collection_cache" => settings.trust_collection_cache = parse_bool(&field, value)?,
        "core_cache" => settings.core_cache = path(value),
        "trust_core_cache" => settings.trust_core_cache = parse_bool(&field, value)?,
        _ => {
            return Err(QuarryError::ConfigValidation {
                field,
                reason: "unknown setting".to_string(),
            })
        },
    }
    tracing::debug!("Setting {} overridden from {:?}", key, source);
    Ok(())
}
