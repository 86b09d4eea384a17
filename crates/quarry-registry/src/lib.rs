//! Registry clients for Quarry
//!
//! This crate provides the retrying HTTP primitive shared by every network
//! call, a collection registry client that speaks both paginated API
//! generations, and a package index client for the core runtime.

pub mod api;
pub mod client;
pub mod galaxy;
pub mod pypi;

// Re-export main types
pub use api::{ArtifactInfo, CollectionInfo, ReleaseFile, ReleaseInfo};
pub use client::{GetRequest, RetryPolicy, RetryingClient};
pub use galaxy::{Dialect, GalaxyClient, GalaxyContext, GalaxyContextCache};
pub use pypi::PackageIndexClient;

use quarry_core::error::QuarryError;
use url::Url;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, QuarryError>;

/// Resolve `reference` against `base` the way browsers resolve links
pub fn join_url(base: &Url, reference: &str) -> RegistryResult<Url> {
    base.join(reference).map_err(|e| {
        QuarryError::network(format!("Cannot resolve '{}' against {}: {}", reference, base, e), e)
    })
}
