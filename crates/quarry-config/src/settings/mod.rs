//! Settings consumed by the acquisition engine

use quarry_core::error::QuarryError;
use quarry_core::CopyOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::ConfigResult;

/// Immutable engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Read size for downloads, hashing and comparisons
    pub chunk_size: usize,

    /// Attempts per guarded request
    pub max_retries: u32,

    /// Per-attempt timeout in seconds
    pub attempt_timeout_secs: u64,

    /// Files up to this size are compared before overwriting; 0 disables
    pub file_check_content: u64,

    /// Collection registry server
    pub galaxy_url: String,

    /// Package index server
    pub pypi_url: String,

    /// Upstream source repository of the core runtime
    pub core_repo_url: String,

    /// Package index name of the core runtime
    pub core_package: String,

    /// Version file inside a core source checkout
    pub core_version_file: String,

    /// Collection artifact cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_cache: Option<PathBuf>,

    /// Reuse cached collections without re-verifying them
    pub trust_collection_cache: bool,

    /// Core artifact cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_cache: Option<PathBuf>,

    /// Reuse cached core artifacts without re-verifying them
    pub trust_core_cache: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            max_retries: 10,
            attempt_timeout_secs: 20,
            file_check_content: 262_144,
            galaxy_url: "https://galaxy.ansible.com/".to_string(),
            pypi_url: "https://pypi.org/".to_string(),
            core_repo_url: "https://github.com/ansible/ansible/".to_string(),
            core_package: "ansible-core".to_string(),
            core_version_file: "lib/ansible/release.py".to_string(),
            collection_cache: None,
            trust_collection_cache: false,
            core_cache: None,
            trust_core_cache: false,
        }
    }
}

impl Settings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Copy behaviour for cache reads and writes
    pub fn copy_options(&self) -> CopyOptions {
        CopyOptions {
            check_content: true,
            file_check_content: self.file_check_content,
            chunk_size: self.chunk_size,
        }
    }

    /// Parsed collection registry URL
    pub fn galaxy_base(&self) -> ConfigResult<Url> {
        parse_server_url("galaxy_url", &self.galaxy_url)
    }

    /// Parsed package index URL
    pub fn pypi_base(&self) -> ConfigResult<Url> {
        parse_server_url("pypi_url", &self.pypi_url)
    }

    /// Check invariants and normalize paths and URLs
    pub fn validate(mut self) -> ConfigResult<Self> {
        if self.chunk_size == 0 {
            return Err(QuarryError::ConfigValidation {
                field: "chunk_size".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.max_retries == 0 {
            return Err(QuarryError::ConfigValidation {
                field: "max_retries".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        if self.attempt_timeout_secs == 0 {
            return Err(QuarryError::ConfigValidation {
                field: "attempt_timeout_secs".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        self.galaxy_url = with_trailing_slash(&self.galaxy_url);
        self.pypi_url = with_trailing_slash(&self.pypi_url);
        self.galaxy_base()?;
        self.pypi_base()?;
        parse_server_url("core_repo_url", &self.core_repo_url)?;

        if self.core_package.trim().is_empty() {
            return Err(QuarryError::ConfigValidation {
                field: "core_package".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        self.collection_cache = self.collection_cache.as_deref().map(expand_home);
        self.core_cache = self.core_cache.as_deref().map(expand_home);
        Ok(self)
    }
}

fn parse_server_url(field: &str, raw: &str) -> ConfigResult<Url> {
    Url::parse(raw).map_err(|e| QuarryError::ConfigValidation {
        field: field.to_string(),
        reason: format!("'{}' is not a valid URL: {}", raw, e),
    })
}

// Relative API paths are joined onto the server URL
fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Parse a boolean the way configuration files and environments spell it
pub fn parse_bool(field: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(QuarryError::ConfigValidation {
            field: field.to_string(),
            reason: format!("'{}' is not a boolean", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.chunk_size, 4096);
        assert_eq!(settings.max_retries, 10);
        assert_eq!(settings.attempt_timeout(), Duration::from_secs(20));
        assert_eq!(settings.file_check_content, 262_144);
        assert!(!settings.trust_collection_cache);
        assert!(!settings.trust_core_cache);
        assert!(settings.collection_cache.is_none());
    }

    #[test]
    fn test_validate_normalizes_urls() {
        let settings = Settings {
            galaxy_url: "https://galaxy.example.com/mirror".to_string(),
            ..Settings::default()
        }
        .validate()
        .unwrap();
        assert_eq!(settings.galaxy_url, "https://galaxy.example.com/mirror/");
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let result = Settings {
            chunk_size: 0,
            ..Settings::default()
        }
        .validate();
        assert!(matches!(result, Err(QuarryError::ConfigValidation { ref field, .. }) if field == "chunk_size"));
    }

    #[test]
    fn test_validate_rejects_zero_attempt_timeout() {
        let result = Settings {
            attempt_timeout_secs: 0,
            ..Settings::default()
        }
        .validate();
        assert!(
            matches!(result, Err(QuarryError::ConfigValidation { ref field, .. }) if field == "attempt_timeout_secs")
        );
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let result = Settings {
            pypi_url: "not a url".to_string(),
            ..Settings::default()
        }
        .validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_bool() {
        for yes in ["yes", "TRUE", "1", "on"] {
            assert!(parse_bool("x", yes).unwrap());
        }
        for no in ["no", "False", "0", "off"] {
            assert!(!parse_bool("x", no).unwrap());
        }
        assert!(parse_bool("x", "maybe").is_err());
    }

    #[test]
    fn test_expand_home() {
        let absolute = Path::new("/var/cache/quarry");
        assert_eq!(expand_home(absolute), absolute);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/cache")), home.join("cache"));
        }
    }
}
