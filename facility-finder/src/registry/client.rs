//! Open-data registry HTTP client.
//!
//! Fetches single pages from a registry dataset endpoint. Paging across a
//! whole dataset lives in [`super::pager`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::envelope::{PageBody, parse_envelope};
use super::error::RegistryError;
use super::pager::{RegistrySnapshot, fetch_all};

/// Default rows per page. The registry caps `pSize` at 1000.
const DEFAULT_PAGE_SIZE: usize = 1000;

/// Default ceiling on pages read per fetch.
const DEFAULT_MAX_PAGES: usize = 5;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A registry dataset endpoint and its optional region filter.
///
/// This is the cache identity for fetched snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Full dataset URL, e.g. `https://openapi.gg.go.kr/Aedstus`
    pub url: String,

    /// Municipality name sent as `SIGUN_NM`
    #[serde(default)]
    pub region: Option<String>,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Configuration for the registry client.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// API key sent as the `KEY` query parameter
    pub api_key: String,
    /// Rows requested per page
    pub page_size: usize,
    /// Hard ceiling on pages per fetch
    pub max_pages: usize,
    /// Per-request timeout
    pub timeout: Duration,
}

impl RegistryConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = n;
        self
    }

    pub fn with_max_pages(mut self, n: usize) -> Self {
        self.max_pages = n;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Anything that can serve single registry pages.
///
/// The pager is written against this so it can be tested without HTTP.
pub trait PageSource {
    /// Fetch page `page_index` (1-based) of `page_size` rows.
    fn fetch_page(
        &self,
        endpoint: &EndpointConfig,
        page_index: usize,
        page_size: usize,
    ) -> impl Future<Output = Result<PageBody, RegistryError>> + Send;
}

/// Anything that can produce a full snapshot of an endpoint.
///
/// Never fails: a fetch that breaks off early yields the partial snapshot.
pub trait RecordSource {
    fn fetch_all(
        &self,
        endpoint: &EndpointConfig,
    ) -> impl Future<Output = Arc<RegistrySnapshot>> + Send;
}

/// Registry API client.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    api_key: String,
    page_size: usize,
    max_pages: usize,
}

impl RegistryClient {
    /// Create a new registry client with the given configuration.
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key,
            page_size: config.page_size.max(1),
            max_pages: config.max_pages,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }
}

impl PageSource for RegistryClient {
    async fn fetch_page(
        &self,
        endpoint: &EndpointConfig,
        page_index: usize,
        page_size: usize,
    ) -> Result<PageBody, RegistryError> {
        let mut query = vec![
            ("KEY", self.api_key.clone()),
            ("Type", "json".to_string()),
            ("pIndex", page_index.to_string()),
            ("pSize", page_size.to_string()),
        ];
        if let Some(region) = &endpoint.region {
            query.push(("SIGUN_NM", region.clone()));
        }

        let response = self.http.get(&endpoint.url).query(&query).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        let value: Value = serde_json::from_str(&body).map_err(|e| RegistryError::Shape {
            message: format!("invalid JSON: {e}"),
        })?;

        parse_envelope(&value)
    }
}

impl RecordSource for RegistryClient {
    async fn fetch_all(&self, endpoint: &EndpointConfig) -> Arc<RegistrySnapshot> {
        Arc::new(fetch_all(self, endpoint, self.page_size, self.max_pages).await)
    }
}
