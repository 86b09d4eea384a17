//! Registry API response types

use quarry_core::DigestSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Collection registry API root
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiRoot {
    /// API dialect name to relative path, e.g. `"v3": "v3/"`
    #[serde(default)]
    pub available_versions: Option<HashMap<String, String>>,
}

/// One entry of a version listing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionRecord {
    pub version: String,
}

/// Version listing page of the v2 API
#[derive(Debug, Clone, Deserialize)]
pub struct V2VersionsPage {
    pub results: Vec<VersionRecord>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Version listing page of the v3 API; some servers use `results`
/// instead of `data`
#[derive(Debug, Clone, Deserialize)]
pub struct V3VersionsPage {
    #[serde(default)]
    pub data: Option<Vec<VersionRecord>>,
    #[serde(default)]
    pub results: Option<Vec<VersionRecord>>,
    pub links: V3Links,
}

#[derive(Debug, Clone, Deserialize)]
pub struct V3Links {
    #[serde(default)]
    pub next: Option<String>,
}

/// Release details for one collection version
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReleaseInfo {
    pub version: String,
    pub download_url: String,
    pub artifact: ArtifactInfo,
}

/// Artifact details of a collection release
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactInfo {
    pub filename: String,
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Collection metadata; fields differ between API dialects so everything
/// beyond the common keys is kept verbatim
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_version: Option<VersionRecord>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Package index document, `GET <index>/pypi/<package>/json`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PackageIndexResponse {
    #[serde(default)]
    pub releases: BTreeMap<String, Vec<ReleaseFile>>,
}

/// A file published for one package index release
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReleaseFile {
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub digests: DigestSet,
}
