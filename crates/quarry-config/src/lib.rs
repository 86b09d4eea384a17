//! Configuration for the Quarry acquisition engine
//!
//! `Settings` is an immutable value built once by `ConfigLoader` and passed
//! explicitly to every client, cache and acquirer.

pub mod loader;
pub mod settings;

// Re-export main types
pub use loader::{ConfigLoader, ConfigSource};
pub use settings::Settings;

use quarry_core::error::QuarryError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, QuarryError>;
