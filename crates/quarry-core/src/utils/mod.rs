//! Utility functions and helpers.
//!
//! Digest verification and file copying shared by the cache and acquirers.

pub mod hash;
pub mod io;

pub use hash::{HashAlgorithm, HashVerifier};
pub use io::{copy_file, CopyOptions};
