//! One search, end to end: fetch, normalize, filter, enrich.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::domain::{Coordinate, Facility, Origin};
use crate::enrich::enrich;
use crate::lookup::{Geocoder, TravelTimeProvider};
use crate::normalize::Normalizer;
use crate::proximity;
use crate::registry::{RecordSource, StopReason};

use super::config::{CategoryConfig, PipelineConfig};
use super::generation::Generation;

/// Error from a search.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    /// Neither explicit coordinates nor geocoding produced an origin
    #[error("origin not found: {0}")]
    OriginNotFound(String),

    /// Category key not configured
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// Radius is negative or not a number
    #[error("invalid radius: {0}")]
    InvalidRadius(f64),

    /// A newer query started before this one finished
    #[error("search superseded by a newer query")]
    Superseded,
}

/// Where the search is centred, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum OriginRequest {
    /// From a geolocation collaborator.
    Coordinates {
        latitude: f64,
        longitude: f64,
        label: String,
    },

    /// Free text, geocoded.
    Address(String),
}

/// Identity of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub origin: Origin,
    pub category: String,
    pub radius_km: f64,
}

impl SearchQuery {
    pub fn new(origin: Origin, category: impl Into<String>, radius_km: f64) -> Self {
        Self {
            origin,
            category: category.into(),
            radius_km,
        }
    }
}

/// Facilities near an origin, nearest first.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The query that produced this result
    pub query: SearchQuery,

    /// Admitted facilities, sorted ascending by distance
    pub facilities: Vec<Facility>,

    /// How registry paging ended
    pub registry_stop: StopReason,

    pub computed_at: DateTime<Utc>,
}

impl SearchResult {
    /// Whether a facility lies beyond the nominal radius (admitted only by the
    /// near-miss factor).
    pub fn is_near_miss(&self, facility: &Facility) -> bool {
        facility.distance_km() > self.query.radius_km
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }
}

/// The search pipeline and its providers.
///
/// Shared between sessions; holds no per-query state.
pub struct SearchPipeline<S, G, R> {
    config: PipelineConfig,
    normalizer: Normalizer,
    registry: S,
    geocoder: G,
    router: R,
}

impl<S, G, R> SearchPipeline<S, G, R>
where
    S: RecordSource + Sync,
    G: Geocoder + Sync,
    R: TravelTimeProvider + Sync,
{
    pub fn new(config: PipelineConfig, registry: S, geocoder: G, router: R) -> Self {
        let normalizer = Normalizer::new(config.fields.clone(), config.bounds);
        Self {
            config,
            normalizer,
            registry,
            geocoder,
            router,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &S {
        &self.registry
    }

    /// Look up a category, or fail with [`SearchError::UnknownCategory`].
    pub fn category(&self, key: &str) -> Result<&CategoryConfig, SearchError> {
        self.config
            .category(key)
            .ok_or_else(|| SearchError::UnknownCategory(key.to_string()))
    }

    /// Turn an origin request into an origin.
    pub async fn resolve_origin(&self, request: OriginRequest) -> Result<Origin, SearchError> {
        match request {
            OriginRequest::Coordinates {
                latitude,
                longitude,
                label,
            } => Coordinate::new(latitude, longitude)
                .map(|position| Origin::new(position, label))
                .map_err(|e| SearchError::OriginNotFound(e.to_string())),
            OriginRequest::Address(address) => match self.geocoder.geocode(&address).await {
                Ok(Some(hit)) => Ok(Origin::new(hit.position, hit.label)),
                Ok(None) => Err(SearchError::OriginNotFound(address)),
                Err(e) => {
                    warn!(%address, error = %e, "origin geocoding failed");
                    Err(SearchError::OriginNotFound(address))
                }
            },
        }
    }

    /// Run a query.
    ///
    /// Returns [`SearchError::Superseded`] if `generation` goes stale before
    /// the result is complete.
    pub async fn execute(
        &self,
        query: &SearchQuery,
        generation: &Generation,
    ) -> Result<SearchResult, SearchError> {
        let category = self.category(&query.category)?;
        if !query.radius_km.is_finite() || query.radius_km <= 0.0 {
            return Err(SearchError::InvalidRadius(query.radius_km));
        }

        let snapshot = self.registry.fetch_all(&category.endpoint).await;
        if !generation.is_current() {
            return Err(SearchError::Superseded);
        }

        let facilities = self
            .normalizer
            .normalize_all(
                &snapshot.records,
                category,
                &self.geocoder,
                self.config.geocode_concurrency,
            )
            .await;
        if !generation.is_current() {
            return Err(SearchError::Superseded);
        }

        let mut facilities = proximity::filter(
            facilities,
            &query.origin,
            query.radius_km,
            self.config.admission_factor(),
        );

        let stats = enrich(
            &mut facilities,
            &query.origin,
            &self.router,
            &self.config.enrichment,
            generation,
        )
        .await;
        if stats.superseded() || !generation.is_current() {
            return Err(SearchError::Superseded);
        }

        debug!(
            category = %category.key,
            origin = %query.origin.position,
            radius_km = query.radius_km,
            records = snapshot.records.len(),
            admitted = facilities.len(),
            "search complete"
        );

        Ok(SearchResult {
            query: query.clone(),
            facilities,
            registry_stop: snapshot.stop.clone(),
            computed_at: Utc::now(),
        })
    }

    /// Fetch several categories' registries in parallel, filling the cache.
    ///
    /// Returns the record count per known category; unknown keys are skipped.
    pub async fn warm(&self, keys: &[&str]) -> Vec<(String, usize)> {
        let fetches = keys
            .iter()
            .filter_map(|key| self.config.category(key))
            .map(|category| async move {
                let snapshot = self.registry.fetch_all(&category.endpoint).await;
                info!(
                    category = %category.key,
                    records = snapshot.records.len(),
                    pages = snapshot.pages,
                    stop = ?snapshot.stop,
                    "registry warmed"
                );
                (category.key.clone(), snapshot.records.len())
            });

        join_all(fetches).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawRecord;
    use crate::lookup::{GeocodeHit, LookupError};
    use crate::registry::{EndpointConfig, RegistrySnapshot};
    use crate::session::SessionHandle;
    use std::sync::Arc;
    use std::sync::Mutex;

    /// Registry returning fixed rows for every endpoint.
    struct FixedRegistry {
        rows: Vec<RawRecord>,
        fetched: Mutex<Vec<String>>,
    }

    impl FixedRegistry {
        fn new(rows: Vec<RawRecord>) -> Self {
            Self {
                rows,
                fetched: Mutex::new(vec![]),
            }
        }
    }

    impl RecordSource for FixedRegistry {
        async fn fetch_all(&self, endpoint: &EndpointConfig) -> Arc<RegistrySnapshot> {
            self.fetched.lock().unwrap().push(endpoint.url.clone());
            Arc::new(RegistrySnapshot {
                records: self.rows.clone(),
                pages: 1,
                stop: StopReason::Exhausted,
            })
        }
    }

    struct CityHallGeocoder;

    impl Geocoder for CityHallGeocoder {
        async fn geocode(&self, address: &str) -> Result<Option<GeocodeHit>, LookupError> {
            match address {
                "수원시청" => Ok(Some(GeocodeHit {
                    position: Coordinate::new(37.2636, 127.0286).unwrap(),
                    label: "수원시청".into(),
                })),
                "down" => Err(LookupError::timeout()),
                _ => Ok(None),
            }
        }
    }

    /// Router that bumps the session epoch on its first call.
    struct Router {
        cancel: Option<SessionHandle>,
    }

    impl TravelTimeProvider for Router {
        async fn travel_minutes(&self, _from: Coordinate, _to: Coordinate) -> Result<f64, LookupError> {
            if let Some(handle) = &self.cancel {
                handle.invalidate();
            }
            Ok(4.0)
        }
    }

    fn rows() -> Vec<RawRecord> {
        vec![
            RawRecord::new()
                .with("INSTL_PLACE", "far")
                .with("REFINE_WGS84_LAT", "37.3000")
                .with("REFINE_WGS84_LOGT", "127.1000"),
            RawRecord::new()
                .with("INSTL_PLACE", "near")
                .with("REFINE_WGS84_LAT", "37.2640")
                .with("REFINE_WGS84_LOGT", "127.0290"),
            RawRecord::new().with("INSTL_PLACE", "no coordinates"),
        ]
    }

    fn pipeline(cancel: Option<SessionHandle>) -> SearchPipeline<FixedRegistry, CityHallGeocoder, Router> {
        SearchPipeline::new(
            PipelineConfig::default(),
            FixedRegistry::new(rows()),
            CityHallGeocoder,
            Router { cancel },
        )
    }

    fn city_hall() -> Origin {
        Origin::new(Coordinate::new(37.2636, 127.0286).unwrap(), "수원시청")
    }

    #[tokio::test]
    async fn execute_end_to_end() {
        let p = pipeline(None);
        let query = SearchQuery::new(city_hall(), "aed", 0.5);

        let result = p.execute(&query, &Generation::detached()).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.facilities[0].name(), "near");
        assert_eq!(result.facilities[0].travel_time().and_then(|t| t.minutes()), Some(4.0));
        assert_eq!(result.query, query);
        assert!(!result.is_near_miss(&result.facilities[0]));
    }

    #[tokio::test]
    async fn identical_queries_give_equivalent_results() {
        let p = pipeline(None);
        let query = SearchQuery::new(city_hall(), "aed", 20.0);

        let a = p.execute(&query, &Generation::detached()).await.unwrap();
        let b = p.execute(&query, &Generation::detached()).await.unwrap();

        let names = |r: &SearchResult| r.facilities.iter().map(|f| f.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names(&a), names(&b));
        assert_eq!(names(&a), vec!["near", "far"]);
    }

    #[tokio::test]
    async fn near_miss_tagging() {
        let mut config = PipelineConfig::default();
        config.near_miss_factor = 2.0;
        let p = SearchPipeline::new(config, FixedRegistry::new(rows()), CityHallGeocoder, Router { cancel: None });

        // "far" is ~7.5 km away: outside 4 km, inside 8 km
        let result = p
            .execute(&SearchQuery::new(city_hall(), "aed", 4.0), &Generation::detached())
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert!(!result.is_near_miss(&result.facilities[0]));
        assert!(result.is_near_miss(&result.facilities[1]));
    }

    #[tokio::test]
    async fn unknown_category_and_bad_radius() {
        let p = pipeline(None);

        let err = p
            .execute(&SearchQuery::new(city_hall(), "restroom", 1.0), &Generation::detached())
            .await
            .unwrap_err();
        assert_eq!(err, SearchError::UnknownCategory("restroom".into()));

        let err = p
            .execute(&SearchQuery::new(city_hall(), "aed", f64::NAN), &Generation::detached())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidRadius(_)));

        for radius in [0.0, -0.5] {
            let err = p
                .execute(&SearchQuery::new(city_hall(), "aed", radius), &Generation::detached())
                .await
                .unwrap_err();
            assert_eq!(err, SearchError::InvalidRadius(radius));
        }
        assert!(p.registry().fetched.lock().unwrap().is_empty());
    }

    #[test]
    fn execute_future_is_send() {
        fn assert_send<T: Send>(_: T) {}

        let p = pipeline(None);
        let query = SearchQuery::new(city_hall(), "aed", 0.5);
        let generation = Generation::detached();
        assert_send(p.execute(&query, &generation));
    }

    #[tokio::test]
    async fn cancelled_during_enrichment_is_superseded() {
        let handle = SessionHandle::new();
        let p = pipeline(Some(handle.clone()));

        let err = p
            .execute(&SearchQuery::new(city_hall(), "aed", 0.5), &handle.generation())
            .await
            .unwrap_err();

        assert_eq!(err, SearchError::Superseded);
    }

    #[tokio::test]
    async fn resolve_origin_paths() {
        let p = pipeline(None);

        let origin = p
            .resolve_origin(OriginRequest::Address("수원시청".into()))
            .await
            .unwrap();
        assert_eq!(origin.label, "수원시청");

        let origin = p
            .resolve_origin(OriginRequest::Coordinates {
                latitude: 37.0,
                longitude: 127.0,
                label: "here".into(),
            })
            .await
            .unwrap();
        assert_eq!(origin.position.latitude(), 37.0);

        for request in [
            OriginRequest::Address("atlantis".into()),
            OriginRequest::Address("down".into()),
            OriginRequest::Coordinates {
                latitude: 123.0,
                longitude: 0.0,
                label: "bad".into(),
            },
        ] {
            let err = p.resolve_origin(request).await.unwrap_err();
            assert!(matches!(err, SearchError::OriginNotFound(_)));
        }
    }

    #[tokio::test]
    async fn warm_fetches_known_categories() {
        let p = pipeline(None);

        let warmed = p.warm(&["aed", "child_night_clinic", "restroom"]).await;

        assert_eq!(warmed.len(), 2);
        assert!(warmed.iter().all(|(_, n)| *n == 3));
        assert_eq!(p.registry().fetched.lock().unwrap().len(), 2);
    }
}
