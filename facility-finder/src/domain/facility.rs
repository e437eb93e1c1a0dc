//! The canonical facility record.

use std::fmt;

use serde::Serialize;

use super::coord::Coordinate;
use super::record::RawRecord;

/// Name used when a record carries no usable descriptive field.
pub const UNNAMED: &str = "unnamed";

/// ASCII punctuation kept in names. Every other ASCII symbol is either
/// reserved in a URL or unsafe in one, and acts as a word break instead.
const NAME_PUNCTUATION: &[char] = &['-', '.', '_'];

/// Canonical field names written by [`Facility::to_raw`].
pub mod canonical_fields {
    pub const NAME: &str = "name";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const ADDRESS: &str = "address";
}

/// Travel time to a facility from the search origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TravelTime {
    /// Live routing result.
    Minutes { minutes: f64 },

    /// Routing was attempted and failed.
    Unavailable,

    /// Routing was not attempted; the estimate assumes walking at constant speed.
    NotComputed { walking_minutes: f64 },
}

impl TravelTime {
    /// The live routing minutes, if any.
    pub fn minutes(&self) -> Option<f64> {
        match self {
            TravelTime::Minutes { minutes } => Some(*minutes),
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, TravelTime::Unavailable)
    }

    pub fn is_not_computed(&self) -> bool {
        matches!(self, TravelTime::NotComputed { .. })
    }
}

impl fmt::Display for TravelTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TravelTime::Minutes { minutes } => write!(f, "{minutes:.0} min"),
            TravelTime::Unavailable => f.write_str("unavailable"),
            TravelTime::NotComputed { walking_minutes } => {
                write!(f, "~{walking_minutes:.0} min walk (not computed)")
            }
        }
    }
}

/// A facility normalized from a registry row.
///
/// Created by the normalizer. `distance_km` is only set by the proximity
/// filter and `travel_time` only by enrichment, hence the crate-private
/// setters.
#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    name: String,
    category: String,
    position: Coordinate,
    source_address: Option<String>,
    distance_km: f64,
    travel_time: Option<TravelTime>,
}

impl Facility {
    /// Create a facility. The name is sanitized; an empty result becomes
    /// [`UNNAMED`].
    pub fn new(
        name: &str,
        category: impl Into<String>,
        position: Coordinate,
        source_address: Option<String>,
    ) -> Self {
        let name = sanitize_name(name);
        let name = if name.is_empty() {
            UNNAMED.to_string()
        } else {
            name
        };

        Self {
            name,
            category: category.into(),
            position,
            source_address: source_address
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            distance_km: 0.0,
            travel_time: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn position(&self) -> Coordinate {
        self.position
    }

    pub fn latitude(&self) -> f64 {
        self.position.latitude()
    }

    pub fn longitude(&self) -> f64 {
        self.position.longitude()
    }

    pub fn source_address(&self) -> Option<&str> {
        self.source_address.as_deref()
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    /// `None` until enrichment has run.
    pub fn travel_time(&self) -> Option<TravelTime> {
        self.travel_time
    }

    pub(crate) fn set_distance_km(&mut self, km: f64) {
        self.distance_km = km;
    }

    pub(crate) fn set_travel_time(&mut self, t: TravelTime) {
        self.travel_time = Some(t);
    }

    /// Render this facility back into a registry row using the canonical field
    /// names. Normalizing the result yields this facility again (before
    /// distance and travel time are assigned).
    pub fn to_raw(&self) -> RawRecord {
        let mut raw = RawRecord::new()
            .with(canonical_fields::NAME, self.name.clone())
            .with(canonical_fields::LATITUDE, self.position.latitude())
            .with(canonical_fields::LONGITUDE, self.position.longitude());
        if let Some(address) = &self.source_address {
            raw.insert(canonical_fields::ADDRESS, address.clone());
        }
        raw
    }
}

/// Whether `c` may appear inside a word of a sanitized name.
fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || NAME_PUNCTUATION.contains(&c)
}

/// Reduce a name to letters, digits, `-`, `.` and `_`, with words joined by
/// single spaces.
///
/// URL delimiters (`/ ? & = , + # [ ]` and the rest), RFC 1738 unsafe
/// characters, control characters and non-alphanumeric symbols all split
/// words. The only character a link builder still has to escape is the
/// space, which it encodes along with any non-ASCII letters.
///
/// Idempotent: `sanitize_name(sanitize_name(s)) == sanitize_name(s)`.
pub fn sanitize_name(raw: &str) -> String {
    raw.split(|c: char| !is_name_char(c))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
