//! Core runtime acquisition
//!
//! A selector (`@devel`, `@latest` or an exact version) is first turned into
//! a `CorePlan`: build a local source tree, build a fresh clone, or download
//! a published sdist from the package index. Executing the plan yields the
//! path of a single sdist tarball.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use quarry_cache::ArtifactCache;
use quarry_config::Settings;
use quarry_core::error::QuarryError;
use quarry_core::PyPiVersion;
use quarry_registry::{join_url, PackageIndexClient, RetryingClient};

use crate::download::VerifiedDownloader;
use crate::process::{CommandRunner, OutputLevel, TokioCommandRunner};
use crate::sdist::{checkout_from_git, create_sdist};
use crate::AcquireResult;


static VERSION_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"__version__\s*=\s*['"]([^'"]+)['"]"#).expect("version assignment pattern is valid")
});

/// Which core runtime to acquire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreSelector {
    /// Current development branch
    Devel,
    /// Highest version published on the package index
    Latest,
    /// One specific published version
    Exact(PyPiVersion),
}

impl FromStr for CoreSelector {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "@devel" => Ok(CoreSelector::Devel),
            "@latest" => Ok(CoreSelector::Latest),
            other => Ok(CoreSelector::Exact(other.parse()?)),
        }
    }
}

impl fmt::Display for CoreSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreSelector::Devel => f.write_str("@devel"),
            CoreSelector::Latest => f.write_str("@latest"),
            CoreSelector::Exact(version) => write!(f, "{}", version),
        }
    }
}

/// How a selector will be satisfied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorePlan {
    /// Build an sdist from the given source tree
    UseLocalSource(PathBuf),
    /// Clone the upstream repository and build it
    BuildFromClone,
    /// Download the published sdist of this version
    DownloadFromIndex(PyPiVersion),
}

/// Read the version of a source tree from its version file.
///
/// The last `__version__ = '...'` assignment wins.
pub async fn source_version(source: &Path, version_file: &Path) -> AcquireResult<PyPiVersion> {
    let path = source.join(version_file);
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| QuarryError::io(format!("Failed to read {}", path.display()), e))?;

    let raw = VERSION_ASSIGNMENT
        .captures_iter(&content)
        .last()
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| QuarryError::InvalidVersion {
            input: path.display().to_string(),
            reason: "no __version__ assignment found".to_string(),
        })?;

    let version = raw.parse()?;
    debug!("Source tree {} has version {}", source.display(), version);
    Ok(version)
}

/// A source tree can stand in for `requested` when it is on the same
/// minor release and at least as new.
pub fn is_compatible(source: &PyPiVersion, requested: &PyPiVersion) -> bool {
    source.major() == requested.major()
        && source.minor() == requested.minor()
        && source.micro() >= requested.micro()
}

/// Acquires core runtime sdists
pub struct CoreAcquirer {
    index: PackageIndexClient,
    cache: ArtifactCache,
    runner: Arc<dyn CommandRunner>,
    downloader: VerifiedDownloader,
    repo_url: String,
    version_file: PathBuf,
}

impl CoreAcquirer {
    pub fn new(
        index: PackageIndexClient,
        cache: ArtifactCache,
        runner: Arc<dyn CommandRunner>,
        settings: &Settings,
    ) -> Self {
        Self {
            index,
            cache,
            runner,
            downloader: VerifiedDownloader::from_settings(settings),
            repo_url: settings.core_repo_url.clone(),
            version_file: PathBuf::from(&settings.core_version_file),
        }
    }

    /// Acquirer wired to real processes and the configured index and cache
    pub fn from_settings(settings: &Settings) -> AcquireResult<Self> {
        let http = RetryingClient::from_settings(settings)?;
        Ok(Self::new(
            PackageIndexClient::from_settings(http, settings)?,
            ArtifactCache::for_core(settings),
            Arc::new(TokioCommandRunner::with_stdout_level(OutputLevel::Debug)),
            settings,
        ))
    }

    pub fn index(&self) -> &PackageIndexClient {
        &self.index
    }

    /// Version of a local source tree; an unreadable tree never matches
    async fn local_version(&self, source: &Path) -> Option<PyPiVersion> {
        match source_version(source, &self.version_file).await {
            Ok(version) => Some(version),
            Err(e) => {
                warn!("Ignoring local source {}: {}", source.display(), e);
                None
            },
        }
    }

    /// Decide how `selector` will be satisfied
    pub async fn plan(
        &self,
        selector: &CoreSelector,
        local_source: Option<&Path>,
    ) -> AcquireResult<CorePlan> {
        let requested = match selector {
            CoreSelector::Devel => {
                if let Some(source) = local_source {
                    let found = self.local_version(source).await;
                    if found.is_some_and(|version| version.is_devel()) {
                        return Ok(CorePlan::UseLocalSource(source.to_path_buf()));
                    }
                }
                return Ok(CorePlan::BuildFromClone);
            },
            CoreSelector::Latest => self.index.get_latest_version().await?,
            CoreSelector::Exact(version) => version.clone(),
        };

        if let Some(source) = local_source {
            let Some(found) = self.local_version(source).await else {
                return Ok(CorePlan::DownloadFromIndex(requested));
            };
            if is_compatible(&found, &requested) {
                info!(
                    "Local source {} ({}) satisfies {}",
                    source.display(),
                    found,
                    requested
                );
                return Ok(CorePlan::UseLocalSource(source.to_path_buf()));
            }
        }
        Ok(CorePlan::DownloadFromIndex(requested))
    }

    /// Produce an sdist for `selector` inside `work_dir`
    pub async fn fetch(
        &self,
        selector: &CoreSelector,
        work_dir: &Path,
        local_source: Option<&Path>,
    ) -> AcquireResult<PathBuf> {
        let plan = self.plan(selector, local_source).await?;
        info!("Acquiring {} {} via {:?}", self.index.package(), selector, plan);

        match plan {
            CorePlan::UseLocalSource(source) => {
                create_sdist(self.runner.as_ref(), &source, work_dir).await
            },
            CorePlan::BuildFromClone => {
                let checkout = checkout_from_git(
                    self.runner.as_ref(),
                    work_dir,
                    &self.repo_url,
                    self.index.package(),
                )
                .await?;
                create_sdist(self.runner.as_ref(), &checkout, work_dir).await
            },
            CorePlan::DownloadFromIndex(version) => {
                self.retrieve(&version.public(), work_dir).await
            },
        }
    }

    /// Obtain the published sdist of `version` through the cache or the index
    pub async fn retrieve(&self, version: &str, dest_dir: &Path) -> AcquireResult<PathBuf> {
        let filenames = self.index.sdist_filenames(version);
        if let Some(reused) = self.cache.reuse_trusted(&filenames, dest_dir).await? {
            return Ok(reused);
        }

        let releases = self.index.get_release_info().await?;
        let file = self.index.find_release_file(&releases, version, &filenames)?;

        if let Some(reused) = self
            .cache
            .reuse_verified(&file.filename, &file.digests, dest_dir)
            .await?
        {
            return Ok(reused);
        }

        let url = join_url(self.index.server(), &file.url)?;
        let dest = dest_dir.join(&file.filename);
        self.downloader
            .fetch(self.index.http(), &url, &dest, &file.digests)
            .await?;
        self.cache.store(&dest, &file.filename).await;

        info!("Downloaded {} {} to {}", self.index.package(), version, dest.display());
        Ok(dest)
    }
}
