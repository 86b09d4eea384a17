//! # quarry-core
//!
//! Core types and utilities shared across all Quarry crates.
//!
//! This crate provides:
//! - Collection versions and version specs (semantic versioning)
//! - Package index versions (PEP 440 style, used by the core runtime)
//! - Artifact references, digest sets and download results
//! - QuarryError enum for unified error handling
//! - Streaming hash verification and content-aware file copies
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, VersionSpec, PyPiVersion, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Hash verification and file I/O helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{QuarryError, QuarryResult};
pub use types::{
    CollectionName, DigestSet, DownloadResult, PyPiVersion, Version, VersionSpec,
};
pub use utils::{copy_file, CopyOptions, HashAlgorithm, HashVerifier};
