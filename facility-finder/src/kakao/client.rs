//! Kakao local search and mobility directions client.
//!
//! Both APIs authenticate with a `KakaoAK` authorization header. Calls are
//! bounded by a semaphore so enrichment fan-out stays under the rate limit.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::Coordinate;
use crate::lookup::{GeocodeHit, Geocoder, LookupError, TravelTimeProvider};

use super::error::KakaoError;
use super::types::{DirectionsResponse, LocalSearchResponse};

/// Default base URL for the local search API.
const DEFAULT_LOCAL_BASE_URL: &str = "https://dapi.kakao.com";

/// Default base URL for the mobility directions API.
const DEFAULT_NAVI_BASE_URL: &str = "https://apis-navi.kakaomobility.com";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the Kakao client.
#[derive(Debug, Clone)]
pub struct KakaoConfig {
    /// REST API key
    pub api_key: String,
    /// Base URL for local search
    pub local_base_url: String,
    /// Base URL for directions
    pub navi_base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Per-request timeout
    pub timeout: Duration,
    /// Directions `priority` parameter
    pub route_priority: String,
}

impl KakaoConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            local_base_url: DEFAULT_LOCAL_BASE_URL.to_string(),
            navi_base_url: DEFAULT_NAVI_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout: DEFAULT_TIMEOUT,
            route_priority: "RECOMMEND".to_string(),
        }
    }

    /// Point both APIs at one base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.local_base_url = url.clone();
        self.navi_base_url = url;
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Kakao API client.
#[derive(Debug, Clone)]
pub struct KakaoClient {
    http: reqwest::Client,
    local_base_url: String,
    navi_base_url: String,
    route_priority: String,
    semaphore: Arc<Semaphore>,
}

impl KakaoClient {
    /// Create a new Kakao client with the given configuration.
    pub fn new(config: KakaoConfig) -> Result<Self, KakaoError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("KakaoAK {}", config.api_key))
            .map_err(|_| KakaoError::Config("invalid API key format".to_string()))?;
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            local_base_url: config.local_base_url,
            navi_base_url: config.navi_base_url,
            route_priority: config.route_priority,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// Look up an address or place name; returns the first match.
    pub async fn search_place(&self, query: &str) -> Result<Option<GeocodeHit>, KakaoError> {
        let _permit = self.permit().await?;

        let url = format!("{}/v2/local/search/keyword.json", self.local_base_url);
        let response = self.http.get(&url).query(&[("query", query)]).send().await?;
        let body = check_status(response).await?;

        let parsed: LocalSearchResponse =
            serde_json::from_str(&body).map_err(|e| KakaoError::Shape {
                message: e.to_string(),
            })?;

        let Some(doc) = parsed.documents.into_iter().next() else {
            return Ok(None);
        };

        let position = Coordinate::new(doc.y, doc.x).map_err(|e| KakaoError::Shape {
            message: e.to_string(),
        })?;
        let label = doc
            .place_name
            .filter(|s| !s.trim().is_empty())
            .or(doc.address_name)
            .unwrap_or_else(|| query.to_string());

        Ok(Some(GeocodeHit { position, label }))
    }

    /// Driving time between two points, in minutes.
    pub async fn driving_minutes(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<f64, KakaoError> {
        let _permit = self.permit().await?;

        let url = format!("{}/v1/directions", self.navi_base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("origin", from.lon_lat()),
                ("destination", to.lon_lat()),
                ("priority", self.route_priority.clone()),
            ])
            .send()
            .await?;
        let body = check_status(response).await?;

        let parsed: DirectionsResponse =
            serde_json::from_str(&body).map_err(|e| KakaoError::Shape {
                message: e.to_string(),
            })?;

        let route = parsed.routes.into_iter().next().ok_or_else(|| KakaoError::Shape {
            message: "no routes".to_string(),
        })?;

        match route.summary {
            Some(summary) if summary.duration.is_finite() && summary.duration >= 0.0 => {
                Ok(summary.duration / 60.0)
            }
            _ => Err(KakaoError::Shape {
                message: format!(
                    "route result {}: {}",
                    route.result_code,
                    route.result_msg.unwrap_or_default()
                ),
            }),
        }
    }

    async fn permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>, KakaoError> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| KakaoError::Config("semaphore closed".to_string()))
    }
}

/// Map error statuses, returning the body text on success.
async fn check_status(response: reqwest::Response) -> Result<String, KakaoError> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(KakaoError::Unauthorized);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(KakaoError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    Ok(response.text().await?)
}

impl Geocoder for KakaoClient {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodeHit>, LookupError> {
        self.search_place(address).await.map_err(|e| {
            debug!(address, error = %e, "geocode failed");
            LookupError::from(e)
        })
    }
}

impl TravelTimeProvider for KakaoClient {
    async fn travel_minutes(&self, from: Coordinate, to: Coordinate) -> Result<f64, LookupError> {
        self.driving_minutes(from, to).await.map_err(LookupError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = KakaoConfig::new("test-key")
            .with_base_url("http://localhost:8080")
            .with_max_concurrent(10)
            .with_timeout(Duration::from_secs(1));

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.local_base_url, "http://localhost:8080");
        assert_eq!(config.navi_base_url, "http://localhost:8080");
        assert_eq!(config.max_concurrent, 10);
        assert_eq!(config.timeout, Duration::from_secs(1));
    }

    #[test]
    fn config_defaults() {
        let config = KakaoConfig::new("test-key");

        assert_eq!(config.local_base_url, DEFAULT_LOCAL_BASE_URL);
        assert_eq!(config.navi_base_url, DEFAULT_NAVI_BASE_URL);
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.route_priority, "RECOMMEND");
    }

    #[test]
    fn client_creation() {
        assert!(KakaoClient::new(KakaoConfig::new("test-key")).is_ok());
    }

    #[test]
    fn rejects_key_with_newline() {
        let result = KakaoClient::new(KakaoConfig::new("bad\nkey"));
        assert!(matches!(result, Err(KakaoError::Config(_))));
    }
}
