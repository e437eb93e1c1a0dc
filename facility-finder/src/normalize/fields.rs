//! Candidate field names per canonical attribute.
//!
//! Registry datasets are published by different teams and name the same
//! attribute differently. Each attribute has an ordered list of candidate
//! field names; the first candidate that yields a usable value wins. Support
//! for a new dataset schema is added by appending a row here.

use serde::{Deserialize, Serialize};

use crate::domain::{BoundingBox, Coordinate, RawRecord, canonical_fields};

/// A latitude/longitude field-name pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateFields {
    pub latitude: String,
    pub longitude: String,
}

impl CoordinateFields {
    pub fn new(latitude: &str, longitude: &str) -> Self {
        Self {
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
        }
    }
}

/// Prioritized candidate field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTable {
    pub coordinates: Vec<CoordinateFields>,
    pub names: Vec<String>,
    pub addresses: Vec<String>,
}

impl Default for FieldTable {
    fn default() -> Self {
        Self {
            coordinates: vec![
                CoordinateFields::new("REFINE_WGS84_LAT", "REFINE_WGS84_LOGT"),
                CoordinateFields::new("WGS84_LAT", "WGS84_LOGT"),
                CoordinateFields::new("LAT", "LOGT"),
                CoordinateFields::new("LATITUDE", "LONGITUDE"),
                CoordinateFields::new("LAT", "LON"),
                CoordinateFields::new(canonical_fields::LATITUDE, canonical_fields::LONGITUDE),
            ],
            names: strings(&[
                "INSTL_PLACE",
                "FACLT_NM",
                "INST_NM",
                "BIZPLC_NM",
                "PBCTLT_PLC_NM",
                "MEDINST_NM",
                canonical_fields::NAME,
            ]),
            addresses: strings(&[
                "REFINE_ROADNM_ADDR",
                "REFINE_LOTNO_ADDR",
                "ROADNM_ADDR",
                "LOTNO_ADDR",
                "INSTL_ADDR",
                canonical_fields::ADDRESS,
            ]),
        }
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

impl FieldTable {
    /// Append a coordinate pair at lowest priority.
    pub fn with_coordinate_pair(mut self, latitude: &str, longitude: &str) -> Self {
        self.coordinates.push(CoordinateFields::new(latitude, longitude));
        self
    }

    /// Append a name field at lowest priority.
    pub fn with_name_field(mut self, field: &str) -> Self {
        self.names.push(field.to_string());
        self
    }

    /// Append an address field at lowest priority.
    pub fn with_address_field(mut self, field: &str) -> Self {
        self.addresses.push(field.to_string());
        self
    }

    /// First candidate pair whose values are both finite numbers inside
    /// `bounds`.
    pub fn coordinate(&self, raw: &RawRecord, bounds: &BoundingBox) -> Option<Coordinate> {
        self.coordinates.iter().find_map(|pair| {
            let lat = raw.number(&pair.latitude)?;
            let lon = raw.number(&pair.longitude)?;
            if !bounds.contains(lat, lon) {
                return None;
            }
            Coordinate::new(lat, lon).ok()
        })
    }

    /// First non-blank name candidate.
    pub fn name<'a>(&self, raw: &'a RawRecord) -> Option<&'a str> {
        first_text(raw, &self.names)
    }

    /// First non-blank address candidate.
    pub fn address<'a>(&self, raw: &'a RawRecord) -> Option<&'a str> {
        first_text(raw, &self.addresses)
    }
}

fn first_text<'a>(raw: &'a RawRecord, fields: &[String]) -> Option<&'a str> {
    fields.iter().find_map(|f| raw.text(f))
}
