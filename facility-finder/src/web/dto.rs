//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Facility, TravelTime};
use crate::registry::StopReason;
use crate::session::{CategoryConfig, OriginRequest, SearchResult};

/// Label used for coordinate origins that arrive without one.
const CURRENT_LOCATION: &str = "current location";

/// Query string for a facility search.
#[derive(Debug, Default, Deserialize)]
pub struct FacilitiesRequest {
    /// Category key (defaults to the first configured category)
    pub category: Option<String>,

    /// Origin latitude, with `lon`
    pub lat: Option<f64>,

    /// Origin longitude, with `lat`
    pub lon: Option<f64>,

    /// Display name for a coordinate origin
    pub label: Option<String>,

    /// Free-text origin, geocoded when no coordinates are given
    pub address: Option<String>,

    /// Override the category's default radius
    pub radius_km: Option<f64>,
}

impl FacilitiesRequest {
    /// Coordinates win over an address. Returns an error message if neither
    /// is usable.
    pub fn origin_request(&self) -> Result<OriginRequest, String> {
        match (self.lat, self.lon) {
            (Some(latitude), Some(longitude)) => Ok(OriginRequest::Coordinates {
                latitude,
                longitude,
                label: self
                    .label
                    .clone()
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| CURRENT_LOCATION.to_string()),
            }),
            (Some(_), None) | (None, Some(_)) => {
                Err("lat and lon must be given together".to_string())
            }
            (None, None) => match self.address.as_deref().map(str::trim) {
                Some(address) if !address.is_empty() => {
                    Ok(OriginRequest::Address(address.to_string()))
                }
                _ => Err("either lat/lon or address is required".to_string()),
            },
        }
    }
}

/// A configured category.
#[derive(Debug, Serialize)]
pub struct CategoryResult {
    pub key: String,
    pub label: String,
    pub radius_km: f64,
}

impl From<&CategoryConfig> for CategoryResult {
    fn from(c: &CategoryConfig) -> Self {
        Self {
            key: c.key.clone(),
            label: c.label.clone(),
            radius_km: c.radius_km,
        }
    }
}

/// Response listing categories.
#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryResult>,
}

/// The resolved search origin.
#[derive(Debug, Serialize)]
pub struct OriginResult {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
}

/// A facility in search results.
#[derive(Debug, Serialize)]
pub struct FacilityResult {
    /// Display name, safe for URL embedding
    pub name: String,

    pub category: String,

    pub latitude: f64,

    pub longitude: f64,

    /// Address as listed in the registry
    pub address: Option<String>,

    /// Great-circle distance from the origin
    pub distance_km: f64,

    /// Live routing time, failure marker, or walking estimate
    pub travel_time: Option<TravelTime>,

    /// Beyond the nominal radius; render muted
    pub near_miss: bool,
}

impl FacilityResult {
    fn from_facility(f: &Facility, near_miss: bool) -> Self {
        Self {
            name: f.name().to_string(),
            category: f.category().to_string(),
            latitude: f.latitude(),
            longitude: f.longitude(),
            address: f.source_address().map(str::to_string),
            distance_km: f.distance_km(),
            travel_time: f.travel_time(),
            near_miss,
        }
    }
}

/// Response to a facility search.
#[derive(Debug, Serialize)]
pub struct FacilitiesResponse {
    pub origin: OriginResult,

    pub category: String,

    pub radius_km: f64,

    /// False when registry paging stopped early, so the list may be missing
    /// entries
    pub registry_complete: bool,

    /// RFC 3339 timestamp
    pub computed_at: String,

    pub facilities: Vec<FacilityResult>,
}

impl FacilitiesResponse {
    pub fn from_result(result: &SearchResult) -> Self {
        let origin = &result.query.origin;
        Self {
            origin: OriginResult {
                latitude: origin.position.latitude(),
                longitude: origin.position.longitude(),
                label: origin.label.clone(),
            },
            category: result.query.category.clone(),
            radius_km: result.query.radius_km,
            registry_complete: matches!(result.registry_stop, StopReason::Exhausted),
            computed_at: result.computed_at.to_rfc3339(),
            facilities: result
                .facilities
                .iter()
                .map(|f| FacilityResult::from_facility(f, result.is_near_miss(f)))
                .collect(),
        }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
