//! Artifact cache for Quarry
//!
//! A flat directory of previously downloaded artifacts. A cached file is
//! reused either on trust alone or only after its digest matches the
//! registry's current record.

pub mod artifact;

// Re-export main types
pub use artifact::{ArtifactCache, CachePolicy};

use quarry_core::error::QuarryError;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, QuarryError>;
