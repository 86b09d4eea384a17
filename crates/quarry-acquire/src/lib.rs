//! Artifact acquisition for Quarry
//!
//! Acquirers tie the registry clients, the artifact cache and the hash
//! verifier together: resolve a version, try the cache, download, verify,
//! then store the result for next time. The core runtime can additionally
//! be built from a local or freshly cloned source tree.

pub mod collection;
pub mod download;
pub mod process;
pub mod runtime;
pub mod sdist;

// Re-export main types
pub use collection::CollectionAcquirer;
pub use download::VerifiedDownloader;
pub use runtime::{CorePlan, CoreAcquirer, CoreSelector};
pub use process::{CommandRunner, OutputLevel, TokioCommandRunner};
pub use sdist::{checkout_from_git, create_sdist};

use quarry_core::error::QuarryError;

/// Result type for acquisition operations
pub type AcquireResult<T> = Result<T, QuarryError>;
