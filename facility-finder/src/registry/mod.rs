//! Open-data facility registry client.
//!
//! The registry publishes one dataset per facility type, each paged and
//! wrapped in an envelope keyed by the dataset name. Field names inside rows
//! differ between datasets; this module returns rows untouched and leaves
//! interpretation to the normalizer.

mod client;
mod envelope;
mod error;
mod pager;

pub use client::{EndpointConfig, PageSource, RecordSource, RegistryClient, RegistryConfig};
pub use envelope::{PageBody, parse_envelope};
pub use error::RegistryError;
pub use pager::{PageCursor, RegistrySnapshot, StopReason, fetch_all};
