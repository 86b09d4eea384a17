//! Collection artifact acquisition

use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

use quarry_cache::ArtifactCache;
use quarry_config::Settings;
use quarry_core::error::QuarryError;
use quarry_core::{CollectionName, DigestSet, DownloadResult, Version, VersionSpec};
use quarry_registry::{join_url, GalaxyClient, GalaxyContextCache, RetryingClient};

use crate::download::VerifiedDownloader;
use crate::AcquireResult;


/// Downloads collection tarballs from a registry into one directory.
///
/// The registry is only contacted once the cache cannot answer, so a
/// trusted cache hit performs no network traffic at all.
pub struct CollectionAcquirer {
    http: RetryingClient,
    server: Url,
    contexts: Arc<GalaxyContextCache>,
    galaxy: OnceCell<GalaxyClient>,
    cache: ArtifactCache,
    downloader: VerifiedDownloader,
    download_dir: PathBuf,
}

impl CollectionAcquirer {
    pub fn new(
        http: RetryingClient,
        server: Url,
        contexts: Arc<GalaxyContextCache>,
        cache: ArtifactCache,
        download_dir: impl Into<PathBuf>,
        settings: &Settings,
    ) -> Self {
        Self {
            http,
            server,
            contexts,
            galaxy: OnceCell::new(),
            cache,
            downloader: VerifiedDownloader::from_settings(settings),
            download_dir: download_dir.into(),
        }
    }

    /// Acquirer for the configured registry and collection cache
    pub fn from_settings(settings: &Settings, download_dir: impl Into<PathBuf>) -> AcquireResult<Self> {
        Ok(Self::new(
            RetryingClient::from_settings(settings)?,
            settings.galaxy_base()?,
            GalaxyContextCache::global(),
            ArtifactCache::for_collections(settings),
            download_dir,
            settings,
        ))
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Registry client, discovering the server API on first use
    pub async fn galaxy(&self) -> AcquireResult<&GalaxyClient> {
        self.galaxy
            .get_or_try_init(|| GalaxyClient::connect_with(&self.contexts, self.http.clone(), &self.server))
            .await
    }

    /// Download one exact collection release
    pub async fn fetch(&self, name: &CollectionName, version: &Version) -> AcquireResult<DownloadResult> {
        let filename = name.artifact_filename(version);
        tokio::fs::create_dir_all(&self.download_dir).await.map_err(|e| {
            QuarryError::io(format!("Failed to create {}", self.download_dir.display()), e)
        })?;

        let reused = self
            .cache
            .reuse_trusted(std::slice::from_ref(&filename), &self.download_dir)
            .await?;
        if let Some(download_path) = reused {
            return Ok(DownloadResult {
                version: version.clone(),
                download_path,
            });
        }

        let galaxy = self.galaxy().await?;
        let release = galaxy.get_release_info(name, version).await?;
        let digests = DigestSet::single("sha256", release.artifact.sha256.as_str());

        let reused = self
            .cache
            .reuse_verified(&filename, &digests, &self.download_dir)
            .await?;
        if let Some(download_path) = reused {
            return Ok(DownloadResult {
                version: version.clone(),
                download_path,
            });
        }

        let url = join_url(&self.server, &release.download_url)?;
        let download_path = self.download_dir.join(&filename);
        debug!("Downloading {} {} from {}", name, version, url);
        self.downloader
            .fetch(galaxy.http(), &url, &download_path, &digests)
            .await?;
        self.cache.store(&download_path, &filename).await;

        info!("Downloaded {} {} to {}", name, version, download_path.display());
        Ok(DownloadResult {
            version: version.clone(),
            download_path,
        })
    }

    /// Resolve the highest version matching `spec`, then download it
    pub async fn fetch_latest_matching(
        &self,
        name: &CollectionName,
        spec: &VersionSpec,
        allow_prerelease: bool,
    ) -> AcquireResult<DownloadResult> {
        let version = self
            .galaxy()
            .await?
            .get_latest_matching(name, spec, allow_prerelease)
            .await?;
        self.fetch(name, &version).await
    }

    /// Download several releases concurrently; the first failure aborts the
    /// batch and drops the remaining downloads.
    pub async fn fetch_many(
        &self,
        requests: &[(CollectionName, Version)],
    ) -> AcquireResult<Vec<DownloadResult>> {
        try_join_all(requests.iter().map(|(name, version)| self.fetch(name, version))).await
    }
}
