//! Pagination dialects of the collection registry API

use quarry_core::error::QuarryError;

use crate::api::{V2VersionsPage, V3VersionsPage};
use crate::RegistryResult;

/// Registry API generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    V2,
    V3,
}

/// Versions and continuation link extracted from one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionsPage {
    pub versions: Vec<String>,
    pub next: Option<String>,
}

impl Dialect {
    /// Key under `available_versions` advertising this dialect
    pub fn key(&self) -> &'static str {
        match self {
            Dialect::V2 => "v2",
            Dialect::V3 => "v3",
        }
    }

    /// Parameters sent with every request
    pub fn base_params(&self) -> Vec<(String, String)> {
        match self {
            Dialect::V2 => vec![("format".to_string(), "json".to_string())],
            Dialect::V3 => Vec::new(),
        }
    }

    /// Parameters for the first page of a version listing
    pub fn first_page_params(&self) -> Vec<(String, String)> {
        let mut params = self.base_params();
        match self {
            Dialect::V2 => params.push(("page_size".to_string(), "100".to_string())),
            Dialect::V3 => params.push(("limit".to_string(), "50".to_string())),
        }
        params
    }

    /// Parameters for pages reached through a `next` link.
    ///
    /// v3 links already carry their paging state.
    pub fn next_page_params(&self) -> Vec<(String, String)> {
        match self {
            Dialect::V2 => self.first_page_params(),
            Dialect::V3 => Vec::new(),
        }
    }

    /// Decode a version listing page
    pub fn parse_page(&self, url: &str, body: serde_json::Value) -> RegistryResult<VersionsPage> {
        let malformed = |e: serde_json::Error| {
            QuarryError::network(format!("Unexpected version listing from {}: {}", url, e), e)
        };
        match self {
            Dialect::V2 => {
                let page: V2VersionsPage = serde_json::from_value(body).map_err(malformed)?;
                Ok(VersionsPage {
                    versions: page.results.into_iter().map(|r| r.version).collect(),
                    next: page.next.filter(|n| !n.is_empty()),
                })
            },
            Dialect::V3 => {
                let page: V3VersionsPage = serde_json::from_value(body).map_err(malformed)?;
                let records = page.data.or(page.results).unwrap_or_default();
                Ok(VersionsPage {
                    versions: records.into_iter().map(|r| r.version).collect(),
                    next: page.links.next.filter(|n| !n.is_empty()),
                })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_v2_params() {
        assert_eq!(
            Dialect::V2.first_page_params(),
            Dialect::V2.next_page_params()
        );
        assert!(Dialect::V2
            .first_page_params()
            .contains(&("page_size".to_string(), "100".to_string())));
    }

    #[test]
    fn test_v3_params() {
        assert_eq!(
            Dialect::V3.first_page_params(),
            vec![("limit".to_string(), "50".to_string())]
        );
        assert!(Dialect::V3.next_page_params().is_empty());
        assert!(Dialect::V3.base_params().is_empty());
    }

    #[test]
    fn test_v3_page_prefers_data() {
        let page = Dialect::V3
            .parse_page(
                "u",
                json!({
                    "data": [{"version": "1.0.0"}],
                    "results": [{"version": "9.9.9"}],
                    "links": {"next": null}
                }),
            )
            .unwrap();
        assert_eq!(page.versions, vec!["1.0.0"]);
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_v3_page_falls_back_to_results() {
        let page = Dialect::V3
            .parse_page(
                "u",
                json!({
                    "results": [{"version": "2.0.0"}, {"version": "1.0.0"}],
                    "links": {"next": "/api/v3/next/"}
                }),
            )
            .unwrap();
        assert_eq!(page.versions, vec!["2.0.0", "1.0.0"]);
        assert_eq!(page.next.as_deref(), Some("/api/v3/next/"));
    }

    #[test]
    fn test_malformed_page() {
        assert!(Dialect::V2.parse_page("u", json!({"data": []})).is_err());
    }
}
