//! Download followed by mandatory verification

use std::path::Path;
use tracing::{debug, warn};
use url::Url;

use quarry_config::Settings;
use quarry_core::error::QuarryError;
use quarry_core::{DigestSet, HashAlgorithm, HashVerifier};
use quarry_registry::RetryingClient;

use crate::AcquireResult;

/// Streams artifacts to disk and rejects any that fail verification
#[derive(Debug, Clone, Copy)]
pub struct VerifiedDownloader {
    verifier: HashVerifier,
    chunk_size: usize,
}

impl VerifiedDownloader {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            verifier: HashVerifier::new(chunk_size),
            chunk_size,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.chunk_size)
    }

    /// Download `url` to `dest` and check it against `digests`.
    ///
    /// On mismatch the partial file is removed and `IntegrityFailure` is
    /// returned. An empty or unsupported digest set never verifies.
    pub async fn fetch(
        &self,
        http: &RetryingClient,
        url: &Url,
        dest: &Path,
        digests: &DigestSet,
    ) -> AcquireResult<()> {
        http.download_to(url, dest, self.chunk_size).await?;

        if self.verifier.verify_any(dest, digests).await? {
            debug!("Verified {} against {}", dest.display(), digests);
            return Ok(());
        }

        if let Err(e) = tokio::fs::remove_file(dest).await {
            warn!("Cannot remove corrupt download {}: {}", dest.display(), e);
        }
        Err(QuarryError::IntegrityFailure {
            url: url.to_string(),
            expected: expected_digest(digests),
        })
    }
}

/// The digest a verification was checked against, for messages
fn expected_digest(digests: &DigestSet) -> String {
    HashAlgorithm::PREFERRED
        .into_iter()
        .find_map(|algorithm| digests.get(algorithm.name()).map(str::to_string))
        .unwrap_or_else(|| {
            if digests.is_empty() {
                "<none published>".to_string()
            } else {
                digests.to_string()
            }
        })
}
