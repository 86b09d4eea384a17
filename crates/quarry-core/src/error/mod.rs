//! Error types and result aliases for Quarry operations.
//!
//! Definitive failures (not found, unsatisfiable constraints, integrity
//! failures) are kept apart from transient network failures, which only
//! surface once the retry budget is spent.

use thiserror::Error;

/// Unified error type for all Quarry operations
#[derive(Error, Debug)]
pub enum QuarryError {
    // Config errors
    #[error("Failed to parse configuration file {path}: {message}")]
    ConfigParse { path: String, message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Registry errors
    #[error("No {kind} found at: {url}")]
    NotFound { kind: String, url: String },

    #[error("{spec} did not match with any version of {name}.")]
    NoSuchVersion { name: String, spec: String },

    #[error("{package} {version} does not exist on {server}")]
    UnknownVersion {
        package: String,
        version: String,
        server: String,
    },

    #[error(
        "Information retrieved from {url} seems to indicate neither Galaxy v2 API nor Galaxy v3 API"
    )]
    DialectDiscovery { url: String },

    #[error("Repeated error when calling {call}: received status codes {}", .failures.join(", "))]
    RetriesExhausted { call: String, failures: Vec<String> },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Version errors
    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("Invalid version specification '{input}': {reason}")]
    InvalidSpec { input: String, reason: String },

    #[error("Invalid collection name '{input}': expected <namespace>.<name>")]
    InvalidCollectionName { input: String },

    // Integrity errors
    #[error("{url} failed to download correctly. Expected checksum: {expected}")]
    IntegrityFailure { url: String, expected: String },

    // Build errors
    #[error("Building {source_dir} failed: {reason}")]
    CannotBuild { source_dir: String, reason: String },

    #[error("Command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Quarry operations
pub type QuarryResult<T> = Result<T, QuarryError>;

impl QuarryError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Create a not-found error for a registry resource
    pub fn not_found(kind: &str, url: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            url: url.into(),
        }
    }

    /// Check if repeating the whole operation later could plausibly succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            QuarryError::RetriesExhausted { .. } | QuarryError::Network { .. } | QuarryError::Io { .. }
        )
    }

    /// Check if this error is a definitive answer from the registry
    pub fn is_definitive(&self) -> bool {
        matches!(
            self,
            QuarryError::NotFound { .. }
                | QuarryError::NoSuchVersion { .. }
                | QuarryError::UnknownVersion { .. }
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            QuarryError::NotFound { .. } => {
                Some("Check the collection name spelling and the configured registry URL")
            },
            QuarryError::NoSuchVersion { .. } => {
                Some("Relax the version specification or allow prereleases")
            },
            QuarryError::RetriesExhausted { .. } | QuarryError::Network { .. } => {
                Some("Check your internet connection and try again")
            },
            QuarryError::IntegrityFailure { .. } => {
                Some("The artifact may have been replaced upstream; remove stale cache entries and retry")
            },
            QuarryError::CannotBuild { .. } => {
                Some("Make sure the 'build' Python package is installed")
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_exhausted_lists_every_failure() {
        let err = QuarryError::RetriesExhausted {
            call: "GET https://example.com/api/".to_string(),
            failures: vec!["timeout".to_string(), "502".to_string(), "503".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Repeated error when calling GET https://example.com/api/: received status codes timeout, 502, 503"
        );
        assert!(err.is_recoverable());
        assert!(!err.is_definitive());
    }

    #[test]
    fn test_not_found_is_definitive() {
        let err = QuarryError::not_found("collection", "https://galaxy.example/api/v2/collections/a/b/");
        assert!(err.is_definitive());
        assert!(!err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "No collection found at: https://galaxy.example/api/v2/collections/a/b/"
        );
    }
}
