//! Package index client for the core runtime
//!
//! The index returns one document per package, keyed by version, listing
//! the files of each release together with their digests.

use std::collections::BTreeMap;
use tracing::{debug, info};
use url::Url;

use quarry_config::Settings;
use quarry_core::error::QuarryError;
use quarry_core::PyPiVersion;

use crate::api::{PackageIndexResponse, ReleaseFile};
use crate::client::{GetRequest, RetryingClient};
use crate::{join_url, RegistryResult};


/// Queries release information of one package
#[derive(Debug, Clone)]
pub struct PackageIndexClient {
    client: RetryingClient,
    server: Url,
    package: String,
}

impl PackageIndexClient {
    pub fn new(client: RetryingClient, server: Url, package: impl Into<String>) -> Self {
        Self {
            client,
            server,
            package: package.into(),
        }
    }

    /// Client for the configured index and core package
    pub fn from_settings(client: RetryingClient, settings: &Settings) -> RegistryResult<Self> {
        Ok(Self::new(client, settings.pypi_base()?, settings.core_package.clone()))
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn http(&self) -> &RetryingClient {
        &self.client
    }

    /// Release files keyed by version string
    pub async fn get_release_info(&self) -> RegistryResult<BTreeMap<String, Vec<ReleaseFile>>> {
        let url = join_url(&self.server, &format!("pypi/{}/json", self.package))?;
        let response: PackageIndexResponse =
            self.client.get_json(GetRequest::new(url), "package").await?;
        Ok(response.releases)
    }

    /// Every published version, highest first, prereleases included
    pub async fn get_versions(&self) -> RegistryResult<Vec<PyPiVersion>> {
        let releases = self.get_release_info().await?;
        let versions = sorted_versions(releases.keys());
        info!(
            "Sorted list of {} versions: {}",
            self.package,
            versions
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(versions)
    }

    /// Highest published version, which may be a prerelease
    pub async fn get_latest_version(&self) -> RegistryResult<PyPiVersion> {
        self.get_versions()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QuarryError::NoSuchVersion {
                name: self.package.clone(),
                spec: "@latest".to_string(),
            })
    }

    /// Accepted sdist filenames for a version, normalized spelling first
    pub fn sdist_filenames(&self, version: &str) -> [String; 2] {
        [
            format!("{}-{}.tar.gz", self.package.replace('-', "_"), version),
            format!("{}-{}.tar.gz", self.package, version),
        ]
    }

    /// Find the release file of `version` matching one of `filenames`
    pub fn find_release_file(
        &self,
        releases: &BTreeMap<String, Vec<ReleaseFile>>,
        version: &str,
        filenames: &[String],
    ) -> RegistryResult<ReleaseFile> {
        releases
            .get(version)
            .and_then(|files| files.iter().find(|file| filenames.contains(&file.filename)))
            .cloned()
            .ok_or_else(|| QuarryError::UnknownVersion {
                package: self.package.clone(),
                version: version.to_string(),
                server: self.server.to_string(),
            })
    }
}

fn sorted_versions<'a, I>(raw: I) -> Vec<PyPiVersion>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut versions: Vec<PyPiVersion> = raw
        .into_iter()
        .filter_map(|raw| match raw.parse::<PyPiVersion>() {
            Ok(version) => Some(version),
            Err(e) => {
                debug!("Ignoring unparsable version {}: {}", raw, e);
                None
            },
        })
        .collect();
    versions.sort_by(|a, b| b.cmp(a));
    versions
}
