//! Geographic coordinate types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// A WGS84 point.
///
/// Latitude is always in `[-90, 90]` and longitude in `[-180, 180]`, and both
/// are finite. This type guarantees validity by construction.
///
/// # Examples
///
/// ```
/// use facility_finder::domain::Coordinate;
///
/// let suwon = Coordinate::new(37.2636, 127.0286).unwrap();
/// assert_eq!(suwon.latitude(), 37.2636);
///
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// assert!(Coordinate::new(0.0, f64::NAN).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate", into = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DomainError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(DomainError::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(DomainError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Format as `"lon,lat"`, the order routing APIs expect.
    pub fn lon_lat(&self) -> String {
        format!("{},{}", self.longitude, self.latitude)
    }
}

impl fmt::Debug for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coordinate({}, {})", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

#[derive(Serialize, Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = DomainError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl From<Coordinate> for RawCoordinate {
    fn from(c: Coordinate) -> Self {
        RawCoordinate {
            latitude: c.latitude,
            longitude: c.longitude,
        }
    }
}

/// A latitude/longitude rectangle used to reject implausible coordinates.
///
/// Registry rows occasionally carry swapped or zeroed coordinates; anything
/// outside the box is treated as unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Mainland South Korea plus Jeju and the western islands.
    pub const SOUTH_KOREA: BoundingBox = BoundingBox {
        min_latitude: 33.0,
        max_latitude: 38.7,
        min_longitude: 124.5,
        max_longitude: 131.9,
    };

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&latitude)
            && (self.min_longitude..=self.max_longitude).contains(&longitude)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::SOUTH_KOREA
    }
}

/// The point a search is centred on.
///
/// Supplied either by a geolocation collaborator or by geocoding an address.
/// Immutable for the lifetime of one search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Origin {
    pub position: Coordinate,
    pub label: String,
}

impl Origin {
    pub fn new(position: Coordinate, label: impl Into<String>) -> Self {
        Self {
            position,
            label: label.into(),
        }
    }
}
