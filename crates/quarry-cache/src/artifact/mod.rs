//! Cache admission and storage

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use quarry_config::Settings;
use quarry_core::{copy_file, CopyOptions, DigestSet, HashVerifier};

use crate::CacheResult;

#[cfg(test)]
mod tests;

/// How a cached file earns reuse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Reuse any file with the expected name
    Trusting,
    /// Reuse only after the digest matches the registry record
    Verifying,
}

impl CachePolicy {
    pub fn from_trust_flag(trust: bool) -> Self {
        if trust {
            CachePolicy::Trusting
        } else {
            CachePolicy::Verifying
        }
    }
}

/// Directory of previously downloaded artifacts
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: Option<PathBuf>,
    policy: CachePolicy,
    verifier: HashVerifier,
    copy: CopyOptions,
}

impl ArtifactCache {
    pub fn new(dir: Option<PathBuf>, policy: CachePolicy, settings: &Settings) -> Self {
        Self {
            dir,
            policy,
            verifier: HashVerifier::new(settings.chunk_size),
            copy: settings.copy_options(),
        }
    }

    /// Cache for collection artifacts
    pub fn for_collections(settings: &Settings) -> Self {
        Self::new(
            settings.collection_cache.clone(),
            CachePolicy::from_trust_flag(settings.trust_collection_cache),
            settings,
        )
    }

    /// Cache for core runtime artifacts
    pub fn for_core(settings: &Settings) -> Self {
        Self::new(
            settings.core_cache.clone(),
            CachePolicy::from_trust_flag(settings.trust_core_cache),
            settings,
        )
    }

    /// A cache without a directory never hits and never stores
    pub fn disabled(settings: &Settings) -> Self {
        Self::new(None, CachePolicy::Verifying, settings)
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn is_trusting(&self) -> bool {
        self.dir.is_some() && self.policy == CachePolicy::Trusting
    }

    fn existing(&self, filename: &str) -> Option<PathBuf> {
        let candidate = self.dir.as_ref()?.join(filename);
        candidate.is_file().then_some(candidate)
    }

    /// Reuse the first cached file among `filenames` without checking it.
    ///
    /// Only answers in trusting mode; returns the copy inside `dest_dir`.
    pub async fn reuse_trusted(
        &self,
        filenames: &[String],
        dest_dir: &Path,
    ) -> CacheResult<Option<PathBuf>> {
        if !self.is_trusting() {
            return Ok(None);
        }
        for filename in filenames {
            if let Some(cached) = self.existing(filename) {
                let dest = dest_dir.join(filename);
                copy_file(&cached, &dest, &self.copy).await?;
                info!("Reusing trusted cache entry {}", cached.display());
                return Ok(Some(dest));
            }
        }
        debug!("No trusted cache entry among {:?}", filenames);
        Ok(None)
    }

    /// Reuse a cached file once its digest matches `digests`.
    ///
    /// A stale or unverifiable entry is ignored so the caller downloads
    /// afresh.
    pub async fn reuse_verified(
        &self,
        filename: &str,
        digests: &DigestSet,
        dest_dir: &Path,
    ) -> CacheResult<Option<PathBuf>> {
        let Some(cached) = self.existing(filename) else {
            return Ok(None);
        };
        if !self.verifier.verify_any(&cached, digests).await? {
            info!(
                "Cached {} does not match the registry checksum, ignoring it",
                cached.display()
            );
            return Ok(None);
        }
        let dest = dest_dir.join(filename);
        copy_file(&cached, &dest, &self.copy).await?;
        info!("Reusing verified cache entry {}", cached.display());
        Ok(Some(dest))
    }

    /// Copy a freshly verified download into the cache.
    ///
    /// Failures are logged and otherwise ignored. Concurrent writers of the
    /// same filename are not serialized.
    pub async fn store(&self, downloaded: &Path, filename: &str) {
        let Some(dir) = self.dir.as_ref() else {
            return;
        };
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("Cannot create cache directory {}: {}", dir.display(), e);
            return;
        }
        let cached = dir.join(filename);
        match copy_file(downloaded, &cached, &self.copy).await {
            Ok(true) => debug!("Stored {} in cache", cached.display()),
            Ok(false) => debug!("Cache already holds {}", cached.display()),
            Err(e) => warn!("Failed to store {} in cache: {}", cached.display(), e),
        }
    }
}
