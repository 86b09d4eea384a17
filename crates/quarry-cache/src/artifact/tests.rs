use super::*;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

fn names(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

struct Fixture {
    cache_dir: TempDir,
    dest_dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            cache_dir: TempDir::new().unwrap(),
            dest_dir: TempDir::new().unwrap(),
        }
    }

    fn cache(&self, policy: CachePolicy) -> ArtifactCache {
        ArtifactCache::new(
            Some(self.cache_dir.path().to_path_buf()),
            policy,
            &Settings::default(),
        )
    }

    fn seed(&self, filename: &str, content: &[u8]) {
        std::fs::write(self.cache_dir.path().join(filename), content).unwrap();
    }
}

#[test]
fn test_policy_from_settings() {
    let settings = Settings {
        collection_cache: Some("/tmp/collections".into()),
        trust_collection_cache: true,
        core_cache: Some("/tmp/core".into()),
        ..Settings::default()
    };
    assert!(ArtifactCache::for_collections(&settings).is_trusting());
    assert_eq!(ArtifactCache::for_core(&settings).policy(), CachePolicy::Verifying);
    assert!(!ArtifactCache::disabled(&settings).is_trusting());
}

#[tokio::test]
async fn test_trusted_reuse_copies_first_present_name() {
    let fx = Fixture::new();
    fx.seed("pkg-1.0.tar.gz", b"hyphen");

    let cache = fx.cache(CachePolicy::Trusting);
    let reused = cache
        .reuse_trusted(&names(&["pkg_x-1.0.tar.gz", "pkg-1.0.tar.gz"]), fx.dest_dir.path())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(reused, fx.dest_dir.path().join("pkg-1.0.tar.gz"));
    assert_eq!(std::fs::read(&reused).unwrap(), b"hyphen");
}

#[tokio::test]
async fn test_trusted_reuse_ignored_in_verifying_mode() {
    let fx = Fixture::new();
    fx.seed("a-b-1.0.0.tar.gz", b"content");

    let cache = fx.cache(CachePolicy::Verifying);
    let reused = cache
        .reuse_trusted(&names(&["a-b-1.0.0.tar.gz"]), fx.dest_dir.path())
        .await
        .unwrap();
    assert!(reused.is_none());
}

#[tokio::test]
async fn test_verified_reuse_on_matching_digest() {
    let fx = Fixture::new();
    fx.seed("a-b-1.0.0.tar.gz", b"good bytes");

    let cache = fx.cache(CachePolicy::Verifying);
    let digests = DigestSet::single("sha256", sha256_hex(b"good bytes"));
    let reused = cache
        .reuse_verified("a-b-1.0.0.tar.gz", &digests, fx.dest_dir.path())
        .await
        .unwrap();
    assert_eq!(reused, Some(fx.dest_dir.path().join("a-b-1.0.0.tar.gz")));
}

#[tokio::test]
async fn test_stale_entry_is_not_reused() {
    let fx = Fixture::new();
    fx.seed("a-b-1.0.0.tar.gz", b"stale bytes");

    let cache = fx.cache(CachePolicy::Verifying);
    let digests = DigestSet::single("sha256", sha256_hex(b"fresh bytes"));
    let reused = cache
        .reuse_verified("a-b-1.0.0.tar.gz", &digests, fx.dest_dir.path())
        .await
        .unwrap();
    assert!(reused.is_none());
    assert!(!fx.dest_dir.path().join("a-b-1.0.0.tar.gz").exists());
}

#[tokio::test]
async fn test_unverifiable_entry_is_not_reused() {
    let fx = Fixture::new();
    fx.seed("a-b-1.0.0.tar.gz", b"bytes");

    let cache = fx.cache(CachePolicy::Verifying);
    let digests = DigestSet::single("md5", "whatever");
    let reused = cache
        .reuse_verified("a-b-1.0.0.tar.gz", &digests, fx.dest_dir.path())
        .await
        .unwrap();
    assert!(reused.is_none());
}

#[tokio::test]
async fn test_store_creates_directory_and_copies() {
    let fx = Fixture::new();
    let nested = fx.cache_dir.path().join("nested");
    let cache = ArtifactCache::new(Some(nested.clone()), CachePolicy::Verifying, &Settings::default());

    let downloaded = fx.dest_dir.path().join("a-b-1.0.0.tar.gz");
    std::fs::write(&downloaded, b"downloaded").unwrap();
    cache.store(&downloaded, "a-b-1.0.0.tar.gz").await;

    assert_eq!(
        std::fs::read(nested.join("a-b-1.0.0.tar.gz")).unwrap(),
        b"downloaded"
    );
}

#[tokio::test]
async fn test_store_failure_is_swallowed() {
    let fx = Fixture::new();
    let cache = fx.cache(CachePolicy::Verifying);
    cache
        .store(&fx.dest_dir.path().join("missing.tar.gz"), "missing.tar.gz")
        .await;
    assert!(!fx.cache_dir.path().join("missing.tar.gz").exists());
}

#[tokio::test]
async fn test_disabled_cache_never_hits() {
    let fx = Fixture::new();
    let cache = ArtifactCache::disabled(&Settings::default());
    let digests = DigestSet::single("sha256", "00");
    assert!(cache
        .reuse_verified("a-b-1.0.0.tar.gz", &digests, fx.dest_dir.path())
        .await
        .unwrap()
        .is_none());
    assert!(cache
        .reuse_trusted(&names(&["a-b-1.0.0.tar.gz"]), fx.dest_dir.path())
        .await
        .unwrap()
        .is_none());
}
