//! Core data types for Quarry.
//!
//! This module provides the fundamental types used throughout Quarry:
//! - Semantic versions and version specifications for collections
//! - Package index versions for the core runtime
//! - Artifact references, digests and download results

pub mod artifact;
pub mod pyversion;
pub mod version;

// Re-export all public types
pub use artifact::{CollectionName, DigestSet, DownloadResult};
pub use pyversion::{PreKind, PyPiVersion};
pub use version::{Comparator, Op, PartialVersion, Version, VersionSpec};
