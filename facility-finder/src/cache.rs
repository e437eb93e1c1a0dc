//! Caching layer for registry snapshots and geocoding results.
//!
//! Registry datasets change rarely, so a full snapshot per endpoint is kept
//! for a TTL. Concurrent callers asking for the same endpoint while a fetch is
//! running wait for that fetch instead of starting their own (moka's
//! `try_get_with` coalesces initializers per key).
//!
//! A fetch that failed before reading a single page is not cached, so the
//! next caller tries again.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::lookup::{GeocodeHit, Geocoder, LookupError};
use crate::registry::{EndpointConfig, RecordSource, RegistryClient, RegistrySnapshot};

/// Configuration for the caches.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for registry snapshots.
    pub registry_ttl: Duration,

    /// Maximum number of cached snapshots (one per endpoint).
    pub registry_capacity: u64,

    /// TTL for geocoding results.
    pub geocode_ttl: Duration,

    /// Maximum number of cached geocoding results.
    pub geocode_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            registry_ttl: Duration::from_secs(10 * 60),
            registry_capacity: 64,
            geocode_ttl: Duration::from_secs(24 * 60 * 60),
            geocode_capacity: 10_000,
        }
    }
}

/// Registry source with a per-endpoint snapshot cache.
pub struct CachedRegistry<S = RegistryClient> {
    inner: S,
    snapshots: MokaCache<EndpointConfig, Arc<RegistrySnapshot>>,
}

impl<S: RecordSource + Sync> CachedRegistry<S> {
    /// Create a new cached source.
    pub fn new(inner: S, config: &CacheConfig) -> Self {
        let snapshots = MokaCache::builder()
            .time_to_live(config.registry_ttl)
            .max_capacity(config.registry_capacity)
            .build();

        Self { inner, snapshots }
    }

    /// Access the underlying source for operations that bypass cache.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of cached snapshots. Approximate until pending maintenance runs.
    pub fn cache_entry_count(&self) -> u64 {
        self.snapshots.entry_count()
    }

    /// Drop the cached snapshot for one endpoint.
    pub async fn invalidate(&self, endpoint: &EndpointConfig) {
        self.snapshots.invalidate(endpoint).await;
    }
}

impl<S: RecordSource + Sync> RecordSource for CachedRegistry<S> {
    async fn fetch_all(&self, endpoint: &EndpointConfig) -> Arc<RegistrySnapshot> {
        let result = self
            .snapshots
            .try_get_with(endpoint.clone(), async {
                let snapshot = self.inner.fetch_all(endpoint).await;
                if snapshot.is_total_failure() {
                    Err(snapshot)
                } else {
                    Ok(snapshot)
                }
            })
            .await;

        match result {
            Ok(snapshot) => snapshot,
            Err(failed) => {
                debug!(endpoint = %endpoint.url, "registry fetch failed, not caching");
                Arc::clone(failed.as_ref())
            }
        }
    }
}

/// Geocoder with a result cache keyed by the trimmed address.
///
/// Misses (`Ok(None)`) are cached too; errors are not.
pub struct CachedGeocoder<G> {
    inner: G,
    results: MokaCache<String, Option<GeocodeHit>>,
}

impl<G: Geocoder + Sync> CachedGeocoder<G> {
    pub fn new(inner: G, config: &CacheConfig) -> Self {
        let results = MokaCache::builder()
            .time_to_live(config.geocode_ttl)
            .max_capacity(config.geocode_capacity)
            .build();

        Self { inner, results }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn cache_entry_count(&self) -> u64 {
        self.results.entry_count()
    }
}

impl<G: Geocoder + Sync> Geocoder for CachedGeocoder<G> {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodeHit>, LookupError> {
        let key = address.trim().to_string();
        self.results
            .try_get_with(key.clone(), async { self.inner.geocode(&key).await })
            .await
            .map_err(|e| LookupError::clone(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, RawRecord};
    use crate::registry::StopReason;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts fetches; each takes a little while so callers can overlap.
    struct SlowSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl SlowSource {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RecordSource for SlowSource {
        async fn fetch_all(&self, _endpoint: &EndpointConfig) -> Arc<RegistrySnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail {
                Arc::new(RegistrySnapshot {
                    records: vec![],
                    pages: 0,
                    stop: StopReason::Failed("connection refused".into()),
                })
            } else {
                Arc::new(RegistrySnapshot {
                    records: vec![RawRecord::new().with("name", "a")],
                    pages: 1,
                    stop: StopReason::Exhausted,
                })
            }
        }
    }

    fn endpoint(name: &str) -> EndpointConfig {
        EndpointConfig::new(format!("http://registry.test/{name}"))
    }

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.registry_ttl, Duration::from_secs(600));
        assert_eq!(config.registry_capacity, 64);
    }

    #[tokio::test]
    async fn second_fetch_within_ttl_is_cached() {
        let cache = CachedRegistry::new(SlowSource::new(false), &CacheConfig::default());

        let first = cache.fetch_all(&endpoint("Aedstus")).await;
        let second = cache.fetch_all(&endpoint("Aedstus")).await;

        assert_eq!(cache.inner().calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));

        cache.snapshots.run_pending_tasks().await;
        assert_eq!(cache.cache_entry_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_fetches_share_one_call() {
        let cache = CachedRegistry::new(SlowSource::new(false), &CacheConfig::default());
        let ep = endpoint("Aedstus");

        let (a, b, c) = tokio::join!(
            cache.fetch_all(&ep),
            cache.fetch_all(&ep),
            cache.fetch_all(&ep)
        );

        assert_eq!(cache.inner().calls(), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
    }

    #[tokio::test]
    async fn different_endpoints_fetch_independently() {
        let cache = CachedRegistry::new(SlowSource::new(false), &CacheConfig::default());

        let aed = endpoint("Aedstus");
        let clinic = endpoint("ChildNightTreatHosptl");

        tokio::join!(cache.fetch_all(&aed), cache.fetch_all(&clinic));

        assert_eq!(cache.inner().calls(), 2);
    }

    #[tokio::test]
    async fn expired_entry_is_refetched() {
        let config = CacheConfig {
            registry_ttl: Duration::from_millis(20),
            ..CacheConfig::default()
        };
        let cache = CachedRegistry::new(SlowSource::new(false), &config);

        cache.fetch_all(&endpoint("Aedstus")).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.fetch_all(&endpoint("Aedstus")).await;

        assert_eq!(cache.inner().calls(), 2);
    }

    #[tokio::test]
    async fn total_failure_is_not_cached() {
        let cache = CachedRegistry::new(SlowSource::new(true), &CacheConfig::default());

        let first = cache.fetch_all(&endpoint("Aedstus")).await;
        assert!(first.records.is_empty());
        assert!(first.is_total_failure());

        cache.fetch_all(&endpoint("Aedstus")).await;
        assert_eq!(cache.inner().calls(), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let cache = CachedRegistry::new(SlowSource::new(false), &CacheConfig::default());

        cache.fetch_all(&endpoint("Aedstus")).await;
        cache.invalidate(&endpoint("Aedstus")).await;
        cache.fetch_all(&endpoint("Aedstus")).await;

        assert_eq!(cache.inner().calls(), 2);
    }

    /// Geocoder that answers one known address and fails on "boom".
    struct CountingGeocoder {
        calls: AtomicUsize,
    }

    impl Geocoder for CountingGeocoder {
        async fn geocode(&self, address: &str) -> Result<Option<GeocodeHit>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match address {
                "boom" => Err(LookupError::timeout()),
                "City Hall" => Ok(Some(GeocodeHit {
                    position: Coordinate::new(37.2636, 127.0286).unwrap(),
                    label: "City Hall".into(),
                })),
                _ => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn geocode_hits_and_misses_are_cached() {
        let geocoder = CachedGeocoder::new(
            CountingGeocoder {
                calls: AtomicUsize::new(0),
            },
            &CacheConfig::default(),
        );

        assert!(geocoder.geocode("City Hall").await.unwrap().is_some());
        assert!(geocoder.geocode("  City Hall ").await.unwrap().is_some());
        assert!(geocoder.geocode("nowhere").await.unwrap().is_none());
        assert!(geocoder.geocode("nowhere").await.unwrap().is_none());

        assert_eq!(geocoder.inner().calls.load(Ordering::SeqCst), 2);
        geocoder.results.run_pending_tasks().await;
        assert_eq!(geocoder.cache_entry_count(), 2);
    }

    #[tokio::test]
    async fn geocode_errors_are_not_cached() {
        let geocoder = CachedGeocoder::new(
            CountingGeocoder {
                calls: AtomicUsize::new(0),
            },
            &CacheConfig::default(),
        );

        let err = geocoder.geocode("boom").await.unwrap_err();
        assert!(err.is_timeout());
        assert!(geocoder.geocode("boom").await.is_err());

        assert_eq!(geocoder.inner().calls.load(Ordering::SeqCst), 2);
    }
}
