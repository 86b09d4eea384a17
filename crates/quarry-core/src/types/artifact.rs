//! Artifact references, digest sets and download results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::QuarryError;
use crate::types::Version;

/// A collection identified as `<namespace>.<name>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionName {
    pub namespace: String,
    pub name: String,
}

impl CollectionName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Registry path segment, `<namespace>/<name>`
    pub fn path(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Deterministic artifact filename, `<namespace>-<name>-<version>.tar.gz`
    pub fn artifact_filename(&self, version: &Version) -> String {
        format!("{}-{}-{}.tar.gz", self.namespace, self.name, version)
    }
}

impl FromStr for CollectionName {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('.') {
            Some((namespace, name))
                if !namespace.is_empty() && !name.is_empty() && !name.contains('.') =>
            {
                Ok(Self::new(namespace, name))
            },
            _ => Err(QuarryError::InvalidCollectionName {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// Algorithm name to hex digest, as reported by a registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DigestSet(BTreeMap<String, String>);

impl DigestSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest set holding a single entry
    pub fn single(algorithm: &str, digest: impl Into<String>) -> Self {
        let mut set = Self::new();
        set.insert(algorithm, digest);
        set
    }

    pub fn insert(&mut self, algorithm: &str, digest: impl Into<String>) {
        self.0.insert(algorithm.to_string(), digest.into());
    }

    pub fn get(&self, algorithm: &str) -> Option<&str> {
        self.0.get(algorithm).map(String::as_str)
    }

    pub fn contains(&self, algorithm: &str) -> bool {
        self.0.contains_key(algorithm)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for DigestSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for DigestSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
        f.write_str(&entries.join(", "))
    }
}

/// Results of downloading a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Exact version that was downloaded
    pub version: Version,
    /// Location of the downloaded artifact
    pub download_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name_parsing() {
        let name: CollectionName = "community.general".parse().unwrap();
        assert_eq!(name.namespace, "community");
        assert_eq!(name.name, "general");
        assert_eq!(name.path(), "community/general");
        assert_eq!(name.to_string(), "community.general");
    }

    #[test]
    fn test_collection_name_rejects_malformed() {
        assert!("community".parse::<CollectionName>().is_err());
        assert!(".general".parse::<CollectionName>().is_err());
        assert!("community.".parse::<CollectionName>().is_err());
        assert!("a.b.c".parse::<CollectionName>().is_err());
    }

    #[test]
    fn test_artifact_filename() {
        let name = CollectionName::new("community", "dns");
        let version: Version = "0.1.0".parse().unwrap();
        assert_eq!(name.artifact_filename(&version), "community-dns-0.1.0.tar.gz");
    }

    #[test]
    fn test_digest_set_is_order_independent() {
        let a: DigestSet = vec![
            ("sha256".to_string(), "aa".to_string()),
            ("blake2b_256".to_string(), "bb".to_string()),
        ]
        .into_iter()
        .collect();
        let b: DigestSet = vec![
            ("blake2b_256".to_string(), "bb".to_string()),
            ("sha256".to_string(), "aa".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(a, b);
        assert_eq!(a.get("sha256"), Some("aa"));
    }
}
