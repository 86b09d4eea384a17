//! Streaming digest verification for downloaded artifacts.
//!
//! Files are read in fixed-size chunks and fed to an incremental hasher, so
//! verification never holds a whole artifact in memory.

use blake2::digest::consts::U32;
use blake2::Blake2b;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::error::{QuarryError, QuarryResult};
use crate::types::DigestSet;

type Blake2b256 = Blake2b<U32>;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Blake2b256,
}

impl HashAlgorithm {
    /// Algorithms consulted by `verify_any`, strongest preference first
    pub const PREFERRED: [HashAlgorithm; 2] = [HashAlgorithm::Sha256, HashAlgorithm::Blake2b256];

    /// Key used for this algorithm in registry digest maps
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake2b256 => "blake2b_256",
        }
    }

    fn hasher(&self) -> Box<dyn StreamHasher> {
        match self {
            HashAlgorithm::Sha256 => Box::new(Sha256::new()),
            HashAlgorithm::Blake2b256 => Box::new(Blake2b256::new()),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

trait StreamHasher: Send {
    fn feed(&mut self, chunk: &[u8]);
    fn finish_hex(self: Box<Self>) -> String;
}

impl<D: Digest + Send> StreamHasher for D {
    fn feed(&mut self, chunk: &[u8]) {
        Digest::update(self, chunk);
    }

    fn finish_hex(self: Box<Self>) -> String {
        hex::encode((*self).finalize())
    }
}

/// Compares file digests against expected values
#[derive(Debug, Clone, Copy)]
pub struct HashVerifier {
    chunk_size: usize,
}

impl HashVerifier {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Compute the hex digest of a file
    pub async fn digest_file(&self, path: &Path, algorithm: HashAlgorithm) -> QuarryResult<String> {
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| QuarryError::io(format!("Failed to open {}", path.display()), e))?;

        let mut hasher = algorithm.hasher();
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            let read = file
                .read(&mut buf)
                .await
                .map_err(|e| QuarryError::io(format!("Failed to read {}", path.display()), e))?;
            if read == 0 {
                break;
            }
            hasher.feed(&buf[..read]);
        }
        Ok(hasher.finish_hex())
    }

    /// Check a file against an expected hex digest.
    ///
    /// A mismatch is `Ok(false)`; only I/O problems are errors.
    pub async fn verify(
        &self,
        path: &Path,
        expected: &str,
        algorithm: HashAlgorithm,
    ) -> QuarryResult<bool> {
        let actual = self.digest_file(path, algorithm).await?;
        Ok(actual.eq_ignore_ascii_case(expected.trim()))
    }

    /// Verify with the first preferred algorithm present in `digests`.
    ///
    /// Returns `Ok(false)` when none of the preferred algorithms are offered.
    pub async fn verify_any(&self, path: &Path, digests: &DigestSet) -> QuarryResult<bool> {
        for algorithm in HashAlgorithm::PREFERRED {
            if let Some(expected) = digests.get(algorithm.name()) {
                return self.verify(path, expected, algorithm).await;
            }
        }
        tracing::debug!(
            "No supported digest among {} for {}",
            digests,
            path.display()
        );
        Ok(false)
    }
}

impl Default for HashVerifier {
    fn default() -> Self {
        Self::new(4096)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn write_temp(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_sha256_known_value() {
        let file = write_temp(b"hello world");
        let verifier = HashVerifier::new(3);
        let digest = verifier
            .digest_file(file.path(), HashAlgorithm::Sha256)
            .await
            .unwrap();
        assert_eq!(digest, HELLO_SHA256);
        assert!(verifier
            .verify(file.path(), &HELLO_SHA256.to_uppercase(), HashAlgorithm::Sha256)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_blake2b_digest_length() {
        let file = write_temp(b"hello world");
        let digest = HashVerifier::default()
            .digest_file(file.path(), HashAlgorithm::Blake2b256)
            .await
            .unwrap();
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, HELLO_SHA256);
    }

    #[tokio::test]
    async fn test_verify_any_prefers_sha256() {
        let file = write_temp(b"hello world");
        let verifier = HashVerifier::default();

        let mut digests = DigestSet::new();
        digests.insert("sha256", HELLO_SHA256);
        digests.insert("blake2b_256", "00".repeat(32));
        assert!(verifier.verify_any(file.path(), &digests).await.unwrap());

        let blake = verifier
            .digest_file(file.path(), HashAlgorithm::Blake2b256)
            .await
            .unwrap();
        let mut digests = DigestSet::new();
        digests.insert("sha256", "00".repeat(32));
        digests.insert("blake2b_256", blake);
        assert!(!verifier.verify_any(file.path(), &digests).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_any_falls_back_to_blake2b() {
        let file = write_temp(b"hello world");
        let verifier = HashVerifier::default();
        let blake = verifier
            .digest_file(file.path(), HashAlgorithm::Blake2b256)
            .await
            .unwrap();
        let digests = DigestSet::single("blake2b_256", blake);
        assert!(verifier.verify_any(file.path(), &digests).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_any_unknown_algorithms() {
        let file = write_temp(b"hello world");
        let digests = DigestSet::single("md5", "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert!(!HashVerifier::default()
            .verify_any(file.path(), &digests)
            .await
            .unwrap());
        assert!(!HashVerifier::default()
            .verify_any(file.path(), &DigestSet::new())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let result = HashVerifier::default()
            .verify(Path::new("/nonexistent/artifact.tar.gz"), HELLO_SHA256, HashAlgorithm::Sha256)
            .await;
        assert!(matches!(result, Err(QuarryError::Io { .. })));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn altered_byte_fails_verification(
            content in proptest::collection::vec(any::<u8>(), 1..2048),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
            chunk_size in 1usize..512,
        ) {
            let rt = runtime();
            let verifier = HashVerifier::new(chunk_size);

            let original = write_temp(&content);
            let expected = rt
                .block_on(verifier.digest_file(original.path(), HashAlgorithm::Sha256))
                .unwrap();
            prop_assert!(rt
                .block_on(verifier.verify(original.path(), &expected, HashAlgorithm::Sha256))
                .unwrap());

            let mut altered = content.clone();
            let at = index.index(altered.len());
            altered[at] ^= flip;
            let tampered = write_temp(&altered);
            prop_assert!(!rt
                .block_on(verifier.verify(tampered.path(), &expected, HashAlgorithm::Sha256))
                .unwrap());
        }
    }
}
