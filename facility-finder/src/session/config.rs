//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::domain::BoundingBox;
use crate::enrich::EnrichmentConfig;
use crate::normalize::FieldTable;
use crate::registry::EndpointConfig;

/// One searchable facility type and the registry dataset that lists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Stable identifier used in queries, e.g. `aed`
    pub key: String,

    /// Human-readable name
    pub label: String,

    /// Registry dataset
    pub endpoint: EndpointConfig,

    /// Default search radius in kilometres
    pub radius_km: f64,
}

impl CategoryConfig {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        endpoint: EndpointConfig,
        radius_km: f64,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            endpoint,
            radius_km,
        }
    }
}

/// Configuration parameters for the search pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Searchable categories. The first is the session default.
    pub categories: Vec<CategoryConfig>,

    /// Admission multiplier on the radius. Values above 1 admit near misses
    /// for muted display; values below 1 are treated as 1.
    pub near_miss_factor: f64,

    /// Travel-time enrichment limits.
    pub enrichment: EnrichmentConfig,

    /// Plausible coordinate range for registry rows.
    pub bounds: BoundingBox,

    /// Candidate field names.
    pub fields: FieldTable,

    /// Maximum concurrent geocoding lookups during normalization.
    pub geocode_concurrency: usize,
}

impl PipelineConfig {
    /// Look up a category by key.
    pub fn category(&self, key: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.key == key)
    }

    /// Apply a region filter to every category that has none.
    pub fn with_default_region(mut self, region: &str) -> Self {
        for category in &mut self.categories {
            if category.endpoint.region.is_none() {
                category.endpoint.region = Some(region.to_string());
            }
        }
        self
    }

    /// Effective admission multiplier (never below 1).
    pub fn admission_factor(&self) -> f64 {
        if self.near_miss_factor.is_finite() {
            self.near_miss_factor.max(1.0)
        } else {
            1.0
        }
    }
}

/// Gyeonggi open-data defaults: defibrillators and pediatric night clinics.
pub fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig::new(
            "aed",
            "Defibrillator (AED)",
            EndpointConfig::new("https://openapi.gg.go.kr/Aedstus"),
            0.5,
        ),
        CategoryConfig::new(
            "child_night_clinic",
            "Pediatric night clinic",
            EndpointConfig::new("https://openapi.gg.go.kr/ChildNightTreatHosptl"),
            5.0,
        ),
    ]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            near_miss_factor: 1.0,
            enrichment: EnrichmentConfig::default(),
            bounds: BoundingBox::SOUTH_KOREA,
            fields: FieldTable::default(),
            geocode_concurrency: 4,
        }
    }
}
