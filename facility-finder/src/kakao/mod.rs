//! Kakao geocoding and routing client.
//!
//! Local search resolves addresses (registry rows without coordinates, and
//! typed-in origins). Mobility directions supplies driving times for the
//! nearest facilities.

mod client;
mod error;
mod types;

pub use client::{KakaoClient, KakaoConfig};
pub use error::KakaoError;
pub use types::{DirectionsResponse, LocalDocument, LocalSearchResponse, Route, RouteSummary};
