//! Registry row normalization.
//!
//! Maps a [`RawRecord`] of any dataset schema into a canonical [`Facility`].
//! Coordinates come from the first usable field pair in the [`FieldTable`];
//! when none resolves, the record's address is geocoded. Rows that resolve
//! neither way are dropped; that is an expected gap in the registry data, not
//! an error.

mod fields;

pub use fields::{CoordinateFields, FieldTable};

use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::domain::{BoundingBox, Facility, RawRecord};
use crate::lookup::Geocoder;
use crate::session::CategoryConfig;

/// Outcome of resolving a row without any external lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Coordinates were found in the row.
    Resolved(Facility),

    /// No coordinate pair resolved, but the row has an address to geocode.
    NeedsGeocode { name: String, address: String },

    /// Nothing to go on.
    Unresolvable,
}

/// Turns registry rows into facilities.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    fields: FieldTable,
    bounds: BoundingBox,
}

impl Normalizer {
    pub fn new(fields: FieldTable, bounds: BoundingBox) -> Self {
        Self { fields, bounds }
    }

    pub fn fields(&self) -> &FieldTable {
        &self.fields
    }

    /// Resolve a row using only its own fields.
    pub fn resolve(&self, raw: &RawRecord, category: &CategoryConfig) -> Resolution {
        let address = self.fields.address(raw);

        // Street address stands in for a missing name
        let name = self
            .fields
            .name(raw)
            .or(address)
            .unwrap_or(crate::domain::UNNAMED);

        if let Some(position) = self.fields.coordinate(raw, &self.bounds) {
            return Resolution::Resolved(Facility::new(
                name,
                category.key.clone(),
                position,
                address.map(str::to_string),
            ));
        }

        match address {
            Some(address) => Resolution::NeedsGeocode {
                name: name.to_string(),
                address: address.to_string(),
            },
            None => Resolution::Unresolvable,
        }
    }

    /// Normalize one row, geocoding its address if it has no coordinates.
    ///
    /// Returns `None` when the row cannot be placed.
    pub async fn normalize<G: Geocoder>(
        &self,
        raw: &RawRecord,
        category: &CategoryConfig,
        geocoder: &G,
    ) -> Option<Facility> {
        match self.resolve(raw, category) {
            Resolution::Resolved(facility) => Some(facility),
            Resolution::NeedsGeocode { name, address } => {
                debug!(category = %category.key, %address, "no coordinates, geocoding address");
                match geocoder.geocode(&address).await {
                    Ok(Some(hit))
                        if self
                            .bounds
                            .contains(hit.position.latitude(), hit.position.longitude()) =>
                    {
                        Some(Facility::new(
                            &name,
                            category.key.clone(),
                            hit.position,
                            Some(address),
                        ))
                    }
                    Ok(Some(hit)) => {
                        debug!(%address, position = %hit.position, "geocode result out of bounds, dropping record");
                        None
                    }
                    Ok(None) => {
                        debug!(%address, "address not found, dropping record");
                        None
                    }
                    Err(e) => {
                        debug!(%address, error = %e, "geocode failed, dropping record");
                        None
                    }
                }
            }
            Resolution::Unresolvable => {
                debug!(category = %category.key, fields = raw.len(), "no coordinates or address, dropping record");
                None
            }
        }
    }

    /// Normalize a batch, keeping fetch order.
    ///
    /// Up to `concurrency` geocoding lookups run at once. Rows with
    /// coordinates complete immediately.
    pub async fn normalize_all<G: Geocoder + Sync>(
        &self,
        records: &[RawRecord],
        category: &CategoryConfig,
        geocoder: &G,
        concurrency: usize,
    ) -> Vec<Facility> {
        let pending: Vec<_> = records
            .iter()
            .map(|raw| self.normalize(raw, category, geocoder))
            .collect();

        let facilities: Vec<Facility> = stream::iter(pending)
            .buffered(concurrency.max(1))
            .filter_map(|f| async move { f })
            .collect()
            .await;

        debug!(
            category = %category.key,
            records = records.len(),
            facilities = facilities.len(),
            "normalized registry rows"
        );
        facilities
    }
}
