//! Travel-time enrichment for the nearest facilities.
//!
//! Routing calls cost money and latency, so only the first `limit` facilities
//! of a sorted result get a live lookup. The rest get a constant-speed walking
//! estimate marked as not computed. Each lookup stands alone: a failed call
//! marks its own facility unavailable and nothing else.

use std::pin::pin;

use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::domain::{Facility, Origin, TravelTime};
use crate::lookup::TravelTimeProvider;
use crate::session::Generation;

/// Default number of facilities given a live routing lookup.
const DEFAULT_LIMIT: usize = 10;

/// Default number of routing calls in flight at once.
const DEFAULT_CONCURRENCY: usize = 4;

/// Default walking speed for the local estimate.
const DEFAULT_WALKING_SPEED_KMH: f64 = 4.5;

/// Configuration for enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentConfig {
    /// Facilities at index `>= limit` are not routed.
    pub limit: usize,

    /// Maximum concurrent routing calls.
    pub concurrency: usize,

    /// Speed assumed for the walking estimate.
    pub walking_speed_kmh: f64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            concurrency: DEFAULT_CONCURRENCY,
            walking_speed_kmh: DEFAULT_WALKING_SPEED_KMH,
        }
    }
}

impl EnrichmentConfig {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Walking minutes for a distance, at the configured speed.
    pub fn walking_minutes(&self, distance_km: f64) -> f64 {
        let speed = if self.walking_speed_kmh.is_finite() && self.walking_speed_kmh > 0.0 {
            self.walking_speed_kmh
        } else {
            DEFAULT_WALKING_SPEED_KMH
        };
        distance_km / speed * 60.0
    }
}

/// What enrichment did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichStats {
    /// Live routing results written.
    pub routed: usize,

    /// Routing calls that failed.
    pub unavailable: usize,

    /// Facilities given the walking estimate.
    pub not_computed: usize,

    /// Routing results dropped because a newer query started.
    pub discarded: usize,
}

impl EnrichStats {
    /// Whether any result was dropped as stale.
    pub fn superseded(&self) -> bool {
        self.discarded > 0
    }
}

/// Fill in travel times for a distance-sorted slice.
///
/// Never fails. If `generation` goes stale while calls are in flight, their
/// results are discarded on arrival and the remaining calls are abandoned.
pub async fn enrich<P: TravelTimeProvider + Sync>(
    facilities: &mut [Facility],
    origin: &Origin,
    provider: &P,
    config: &EnrichmentConfig,
    generation: &Generation,
) -> EnrichStats {
    let mut stats = EnrichStats::default();
    let limit = config.limit.min(facilities.len());

    let (head, tail) = facilities.split_at_mut(limit);

    for facility in tail.iter_mut() {
        let walking_minutes = config.walking_minutes(facility.distance_km());
        facility.set_travel_time(TravelTime::NotComputed { walking_minutes });
        stats.not_computed += 1;
    }

    let from = origin.position;
    let destinations: Vec<_> = head
        .iter()
        .enumerate()
        .map(|(i, f)| (i, f.position()))
        .collect();

    let mut arrivals = pin!(
        stream::iter(destinations)
            .map(|(i, to)| async move { (i, provider.travel_minutes(from, to).await) })
            .buffer_unordered(config.concurrency.max(1))
    );

    let mut received = 0;
    while let Some((i, result)) = arrivals.next().await {
        if !generation.is_current() {
            stats.discarded = limit - received;
            debug!(
                generation = generation.issued(),
                discarded = stats.discarded,
                "query superseded, discarding routing results"
            );
            return stats;
        }
        received += 1;

        let travel_time = match result {
            Ok(minutes) if minutes.is_finite() && minutes >= 0.0 => {
                stats.routed += 1;
                TravelTime::Minutes { minutes }
            }
            Ok(minutes) => {
                debug!(facility = head[i].name(), minutes, "routing returned nonsense duration");
                stats.unavailable += 1;
                TravelTime::Unavailable
            }
            Err(e) => {
                debug!(facility = head[i].name(), error = %e, timeout = e.is_timeout(), "routing failed");
                stats.unavailable += 1;
                TravelTime::Unavailable
            }
        };
        head[i].set_travel_time(travel_time);
    }

    debug!(
        routed = stats.routed,
        unavailable = stats.unavailable,
        not_computed = stats.not_computed,
        "enrichment complete"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Coordinate;
    use crate::lookup::LookupError;
    use crate::proximity;
    use crate::session::SessionHandle;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Routing provider that fails for listed destinations.
    struct MockRouter {
        failing: Vec<Coordinate>,
        minutes: f64,
        calls: Mutex<Vec<Coordinate>>,
    }

    impl MockRouter {
        fn new(minutes: f64) -> Self {
            Self {
                failing: vec![],
                minutes,
                calls: Mutex::new(vec![]),
            }
        }

        fn failing_for(mut self, to: Coordinate) -> Self {
            self.failing.push(to);
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl TravelTimeProvider for MockRouter {
        async fn travel_minutes(&self, _from: Coordinate, to: Coordinate) -> Result<f64, LookupError> {
            self.calls.lock().unwrap().push(to);
            if self.failing.contains(&to) {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(LookupError::timeout())
            } else {
                Ok(self.minutes)
            }
        }
    }

    fn origin() -> Origin {
        Origin::new(Coordinate::new(37.2636, 127.0286).unwrap(), "origin")
    }

    fn sorted_facilities() -> Vec<Facility> {
        let facilities = vec![
            Facility::new("a", "aed", Coordinate::new(37.2640, 127.0290).unwrap(), None),
            Facility::new("b", "aed", Coordinate::new(37.2660, 127.0290).unwrap(), None),
            Facility::new("c", "aed", Coordinate::new(37.2700, 127.0290).unwrap(), None),
        ];
        proximity::filter(facilities, &origin(), 5.0, 1.0)
    }

    #[test]
    fn walking_estimate() {
        let config = EnrichmentConfig::default();
        assert!((config.walking_minutes(4.5) - 60.0).abs() < 1e-9);

        let broken = EnrichmentConfig {
            walking_speed_kmh: 0.0,
            ..EnrichmentConfig::default()
        };
        assert!((broken.walking_minutes(0.75) - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn only_head_is_routed() {
        let mut facilities = sorted_facilities();
        let router = MockRouter::new(3.0);
        let config = EnrichmentConfig::default().with_limit(1);

        let stats = enrich(&mut facilities, &origin(), &router, &config, &Generation::detached()).await;

        assert_eq!(router.call_count(), 1);
        assert_eq!(facilities[0].travel_time(), Some(TravelTime::Minutes { minutes: 3.0 }));
        for f in &facilities[1..] {
            let Some(TravelTime::NotComputed { walking_minutes }) = f.travel_time() else {
                panic!("expected walking estimate for {}", f.name());
            };
            assert!((walking_minutes - f.distance_km() / 4.5 * 60.0).abs() < 1e-9);
        }
        assert_eq!(
            stats,
            EnrichStats {
                routed: 1,
                unavailable: 0,
                not_computed: 2,
                discarded: 0
            }
        );
    }

    #[tokio::test]
    async fn failure_is_isolated_to_its_facility() {
        let mut facilities = sorted_facilities();
        let router = MockRouter::new(6.0).failing_for(facilities[0].position());
        let config = EnrichmentConfig::default().with_limit(2);

        let stats = enrich(&mut facilities, &origin(), &router, &config, &Generation::detached()).await;

        assert_eq!(facilities[0].travel_time(), Some(TravelTime::Unavailable));
        assert_eq!(facilities[1].travel_time(), Some(TravelTime::Minutes { minutes: 6.0 }));
        assert!(facilities[2].travel_time().is_some_and(|t| t.is_not_computed()));
        assert_eq!(stats.unavailable, 1);
        assert_eq!(stats.routed, 1);
    }

    #[tokio::test]
    async fn nonsense_duration_is_unavailable() {
        let mut facilities = sorted_facilities();
        let router = MockRouter::new(f64::NAN);

        enrich(&mut facilities, &origin(), &router, &EnrichmentConfig::default(), &Generation::detached()).await;

        assert!(facilities.iter().all(|f| f.travel_time() == Some(TravelTime::Unavailable)));
    }

    #[tokio::test]
    async fn limit_beyond_length_routes_everything() {
        let mut facilities = sorted_facilities();
        let router = MockRouter::new(1.0);

        let stats = enrich(&mut facilities, &origin(), &router, &EnrichmentConfig::default(), &Generation::detached()).await;

        assert_eq!(stats.routed, 3);
        assert_eq!(stats.not_computed, 0);
    }

    #[tokio::test]
    async fn empty_input() {
        let router = MockRouter::new(1.0);
        let stats = enrich(&mut [], &origin(), &router, &EnrichmentConfig::default(), &Generation::detached()).await;
        assert_eq!(stats, EnrichStats::default());
    }

    #[tokio::test]
    async fn stale_results_are_discarded() {
        let mut facilities = sorted_facilities();
        let router = MockRouter::new(2.0);
        let handle = SessionHandle::new();
        let generation = handle.generation();
        handle.invalidate();

        let stats = enrich(&mut facilities, &origin(), &router, &EnrichmentConfig::default(), &generation).await;

        assert!(stats.superseded());
        assert_eq!(stats.routed, 0);
        assert!(facilities.iter().all(|f| f.travel_time().is_none()));
    }
}
