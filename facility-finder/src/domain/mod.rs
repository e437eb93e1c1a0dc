//! Domain types for the facility finder.
//!
//! Validated coordinates, the canonical facility record, and the untyped
//! registry row it is normalized from. Types enforce their invariants at
//! construction, so code receiving them can trust their validity.

mod coord;
mod error;
mod facility;
mod record;

pub use coord::{BoundingBox, Coordinate, Origin};
pub use error::DomainError;
pub use facility::{Facility, TravelTime, UNNAMED, canonical_fields, sanitize_name};
pub use record::RawRecord;
