//! Per-server API discovery and its process-wide cache

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

use quarry_core::error::QuarryError;

use super::dialect::Dialect;
use crate::api::ApiRoot;
use crate::client::{GetRequest, RetryingClient};
use crate::{join_url, RegistryResult};

/// Resolved API dialect and base URL of one registry server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalaxyContext {
    pub server: Url,
    pub dialect: Dialect,
    pub base_url: Url,
}

impl GalaxyContext {
    /// Query the server's API root and pick the newest advertised dialect
    pub async fn create(client: &RetryingClient, server: &Url) -> RegistryResult<Self> {
        let api_url = join_url(server, "api/")?;
        let root: ApiRoot = client
            .guarded_get(GetRequest::new(api_url.clone()).accept_json())
            .await?
            .json()
            .await
            .map_err(|e| {
                QuarryError::network(format!("Failed to parse API root {}: {}", api_url, e), e)
            })?;

        let available = root.available_versions.unwrap_or_default();
        let (dialect, path) = [Dialect::V3, Dialect::V2]
            .into_iter()
            .find_map(|dialect| available.get(dialect.key()).map(|path| (dialect, path)))
            .ok_or_else(|| QuarryError::DialectDiscovery {
                url: api_url.to_string(),
            })?;

        let base_url = if path.starts_with('/') {
            join_url(server, path)?
        } else {
            join_url(server, &format!("api/{}", path))?
        };

        info!("Using {:?} API of {} at {}", dialect, server, base_url);
        Ok(Self {
            server: server.clone(),
            dialect,
            base_url,
        })
    }
}

/// Memoizes `GalaxyContext` per server.
///
/// Concurrent callers for the same server share a single discovery request.
/// Failed discoveries are not remembered.
#[derive(Debug, Default)]
pub struct GalaxyContextCache {
    contexts: DashMap<String, Arc<OnceCell<GalaxyContext>>>,
}

static GLOBAL_CONTEXTS: Lazy<Arc<GalaxyContextCache>> = Lazy::new(|| Arc::new(GalaxyContextCache::new()));

impl GalaxyContextCache {
    pub fn new() -> Self {
        Self {
            contexts: DashMap::new(),
        }
    }

    /// Cache shared by the whole process
    pub fn global() -> Arc<GalaxyContextCache> {
        Arc::clone(&GLOBAL_CONTEXTS)
    }

    pub async fn get_or_create(
        &self,
        client: &RetryingClient,
        server: &Url,
    ) -> RegistryResult<GalaxyContext> {
        let cell = Arc::clone(
            self.contexts
                .entry(server.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );

        if let Some(context) = cell.get() {
            debug!("Reusing API context for {}", server);
            return Ok(context.clone());
        }

        let context = cell
            .get_or_try_init(|| GalaxyContext::create(client, server))
            .await?;
        Ok(context.clone())
    }

    /// Number of servers with a resolved context
    pub fn len(&self) -> usize {
        self.contexts
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
