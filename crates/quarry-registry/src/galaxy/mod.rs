//! Collection registry client
//!
//! Registry servers speak one of two API generations that differ in how
//! version listings are paginated. The generation is discovered once per
//! server (`GalaxyContext`) and every request is then shaped by its
//! `Dialect`.

pub mod context;
pub mod dialect;

use tracing::{debug, info};
use url::Url;

use quarry_core::error::QuarryError;
use quarry_core::{CollectionName, Version, VersionSpec};

use crate::api::{CollectionInfo, ReleaseInfo};
use crate::client::{GetRequest, RetryingClient};
use crate::{join_url, RegistryResult};

pub use context::{GalaxyContext, GalaxyContextCache};
pub use dialect::{Dialect, VersionsPage};


/// Queries a collection registry
#[derive(Debug, Clone)]
pub struct GalaxyClient {
    client: RetryingClient,
    context: GalaxyContext,
}

impl GalaxyClient {
    /// Client for an already discovered server
    pub fn new(client: RetryingClient, context: GalaxyContext) -> Self {
        Self { client, context }
    }

    /// Discover `server` through the process-wide context cache
    pub async fn connect(client: RetryingClient, server: &Url) -> RegistryResult<Self> {
        Self::connect_with(&GalaxyContextCache::global(), client, server).await
    }

    /// Discover `server` through a caller-owned context cache
    pub async fn connect_with(
        cache: &GalaxyContextCache,
        client: RetryingClient,
        server: &Url,
    ) -> RegistryResult<Self> {
        let context = cache.get_or_create(&client, server).await?;
        Ok(Self::new(client, context))
    }

    pub fn context(&self) -> &GalaxyContext {
        &self.context
    }

    pub fn http(&self) -> &RetryingClient {
        &self.client
    }

    fn request(&self, url: Url) -> GetRequest {
        GetRequest::new(url).params(&self.context.dialect.base_params())
    }

    /// All published versions of a collection, in listing order
    pub async fn get_versions(&self, collection: &CollectionName) -> RegistryResult<Vec<String>> {
        let dialect = self.context.dialect;
        let mut url = join_url(
            &self.context.base_url,
            &format!("collections/{}/versions/", collection.path()),
        )?;
        let mut params = dialect.first_page_params();
        let mut versions = Vec::new();

        loop {
            let body: serde_json::Value = self
                .client
                .get_json(GetRequest::new(url.clone()).params(&params), "collection")
                .await?;
            let page = dialect.parse_page(url.as_str(), body)?;
            versions.extend(page.versions);

            match page.next {
                Some(next) => {
                    url = join_url(&self.context.server, &next)?;
                    params = dialect.next_page_params();
                    debug!("Following version listing to {}", url);
                },
                None => break,
            }
        }

        Ok(versions)
    }

    /// Collection metadata
    pub async fn get_info(&self, collection: &CollectionName) -> RegistryResult<CollectionInfo> {
        let url = join_url(
            &self.context.base_url,
            &format!("collections/{}/", collection.path()),
        )?;
        self.client.get_json(self.request(url), "collection").await
    }

    /// Download location and checksum of one release
    pub async fn get_release_info(
        &self,
        collection: &CollectionName,
        version: &Version,
    ) -> RegistryResult<ReleaseInfo> {
        let url = join_url(
            &self.context.base_url,
            &format!("collections/{}/versions/{}/", collection.path(), version),
        )?;
        self.client.get_json(self.request(url), "collection").await
    }

    /// Highest version matching `spec`.
    ///
    /// Stable releases always win over prereleases. A prerelease is only
    /// returned when `allow_prerelease` is set and no stable release matches.
    pub async fn get_latest_matching(
        &self,
        collection: &CollectionName,
        spec: &VersionSpec,
        allow_prerelease: bool,
    ) -> RegistryResult<Version> {
        let versions = self.get_versions(collection).await?;
        let version = select_latest_matching(&versions, spec, allow_prerelease).ok_or_else(|| {
            QuarryError::NoSuchVersion {
                name: collection.to_string(),
                spec: spec.to_string(),
            }
        })?;
        info!("Resolved {} {} to {}", collection, spec, version);
        Ok(version)
    }
}

/// Pick the best candidate out of raw version strings
pub fn select_latest_matching(
    versions: &[String],
    spec: &VersionSpec,
    allow_prerelease: bool,
) -> Option<Version> {
    let mut parsed: Vec<Version> = versions
        .iter()
        .filter_map(|raw| match raw.parse::<Version>() {
            Ok(version) => Some(version),
            Err(e) => {
                debug!("Ignoring unparsable version {}: {}", raw, e);
                None
            },
        })
        .collect();
    parsed.sort_by(|a, b| b.cmp(a));

    let mut prereleases = Vec::new();
    for version in parsed.into_iter().filter(|v| spec.matches(v)) {
        if version.is_prerelease() {
            prereleases.push(version);
            continue;
        }
        return Some(version);
    }

    if allow_prerelease {
        prereleases.into_iter().next()
    } else {
        None
    }
}
