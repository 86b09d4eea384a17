//! HTTP client with per-attempt timeouts and jittered exponential backoff

use futures::StreamExt;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use quarry_config::Settings;
use quarry_core::error::QuarryError;

use crate::RegistryResult;

/// Backoff configuration for guarded requests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per request, never less than one
    pub max_retries: u32,
    /// Deadline for a single attempt to produce response headers
    pub attempt_timeout: Duration,
    /// Base wait after an error status or connection failure
    pub failure_wait: Duration,
    /// Base wait after a timeout
    pub timeout_wait: Duration,
    /// Lower bound of the random jitter added to every wait
    pub jitter_min: Duration,
    /// Width of the random jitter interval
    pub jitter_span: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            attempt_timeout: Duration::from_secs(20),
            failure_wait: Duration::from_secs(5),
            timeout_wait: Duration::from_millis(500),
            jitter_min: Duration::from_millis(500),
            jitter_span: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_retries: settings.max_retries,
            attempt_timeout: settings.attempt_timeout(),
            ..Self::default()
        }
    }

    /// Wait before the attempt following `attempt` (zero-based)
    pub fn delay(&self, attempt: u32, timed_out: bool) -> Duration {
        let base = if timed_out {
            self.timeout_wait
        } else {
            self.failure_wait
        };
        let factor = 1.5f64.powi(attempt.min(64) as i32);
        let jitter = if self.jitter_span.is_zero() {
            0.0
        } else {
            rand::thread_rng().gen_range(0.0..=self.jitter_span.as_secs_f64())
        };
        Duration::from_secs_f64(base.as_secs_f64() * factor + self.jitter_min.as_secs_f64() + jitter)
    }
}

/// A GET request issued through `RetryingClient::guarded_get`
#[derive(Debug, Clone)]
pub struct GetRequest {
    url: Url,
    params: Vec<(String, String)>,
    headers: HeaderMap,
    acceptable: Vec<StatusCode>,
    max_retries: Option<u32>,
}

impl GetRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            params: Vec::new(),
            headers: HeaderMap::new(),
            acceptable: Vec::new(),
            max_retries: None,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Append a query parameter
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn params<'a, I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        self.params.extend(params.into_iter().cloned());
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Ask for JSON responses
    pub fn accept_json(self) -> Self {
        self.header(ACCEPT, HeaderValue::from_static("application/json"))
    }

    /// Treat an error status as a valid, non-retried outcome
    pub fn accept_status(mut self, status: StatusCode) -> Self {
        self.acceptable.push(status);
        self
    }

    /// Override the client's attempt budget for this request
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    fn describe(&self) -> String {
        if self.params.is_empty() {
            format!("GET {}", self.url)
        } else {
            let query: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            format!("GET {} [{}]", self.url, query.join("&"))
        }
    }
}

/// HTTP client that retries transient failures
#[derive(Debug, Clone)]
pub struct RetryingClient {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    /// Create a client with connection pooling and the given backoff policy
    pub fn new(policy: RetryPolicy) -> RegistryResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(policy.attempt_timeout)
            .gzip(true)
            .user_agent(concat!("quarry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| QuarryError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self { client, policy })
    }

    pub fn from_settings(settings: &Settings) -> RegistryResult<Self> {
        Self::new(RetryPolicy::from_settings(settings))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Issue a GET, retrying until a status below 400 or an accepted status
    /// arrives.
    ///
    /// Dropping the returned response releases its connection.
    pub async fn guarded_get(&self, request: GetRequest) -> RegistryResult<Response> {
        let call = request.describe();
        let attempts = request.max_retries.unwrap_or(self.policy.max_retries).max(1);
        let mut failures = Vec::new();

        for attempt in 0..attempts {
            debug!("Execute {}", call);
            let send = self
                .client
                .get(request.url.clone())
                .query(&request.params)
                .headers(request.headers.clone())
                .send();

            let (failure, timed_out) = match tokio::time::timeout(self.policy.attempt_timeout, send).await {
                Ok(Ok(response)) => {
                    let status = response.status();
                    debug!("Status code {}", status.as_u16());
                    if status.as_u16() < 400 || request.acceptable.contains(&status) {
                        return Ok(response);
                    }
                    (status.as_u16().to_string(), false)
                },
                Ok(Err(e)) if e.is_timeout() => ("timeout".to_string(), true),
                Ok(Err(e)) => (e.to_string(), false),
                Err(_) => ("timeout".to_string(), true),
            };

            let finally_failed = attempt + 1 == attempts;
            warn!(
                "{} failed with status code {}, {}",
                call,
                failure,
                if finally_failed {
                    "finally failed."
                } else {
                    "retrying..."
                }
            );
            failures.push(failure);

            if !finally_failed {
                tokio::time::sleep(self.policy.delay(attempt, timed_out)).await;
            }
        }

        Err(QuarryError::RetriesExhausted { call, failures })
    }

    /// GET a JSON document, mapping 404 to a not-found error for `kind`
    pub async fn get_json<T>(&self, request: GetRequest, kind: &str) -> RegistryResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = request.url().to_string();
        let response = self
            .guarded_get(request.accept_json().accept_status(StatusCode::NOT_FOUND))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(QuarryError::not_found(kind, url));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| QuarryError::network(format!("Failed to parse response from {}: {}", url, e), e))
    }

    /// Stream a download to `dest`, writing in `chunk_size` blocks.
    ///
    /// A 404 is reported as a missing artifact and never retried.
    pub async fn download_to(&self, url: &Url, dest: &Path, chunk_size: usize) -> RegistryResult<()> {
        let response = self
            .guarded_get(GetRequest::new(url.clone()).accept_status(StatusCode::NOT_FOUND))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(QuarryError::not_found("artifact", url.as_str()));
        }

        let file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| QuarryError::io(format!("Failed to create {}", dest.display()), e))?;
        let mut writer = tokio::io::BufWriter::with_capacity(chunk_size.max(1), file);

        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk
                .map_err(|e| QuarryError::network(format!("Failed to read body of {}: {}", url, e), e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| QuarryError::io(format!("Failed to write {}", dest.display()), e))?;
        }
        writer
            .flush()
            .await
            .map_err(|e| QuarryError::io(format!("Failed to write {}", dest.display()), e))?;

        debug!("Downloaded {} to {}", url, dest.display());
        Ok(())
    }
}
