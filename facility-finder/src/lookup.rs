//! External lookups the pipeline depends on.
//!
//! Geocoding (address to coordinate) and routing (travel time between two
//! points) are delegated to external APIs. The pipeline is written against
//! these traits so tests can substitute scripted providers.

use std::future::Future;

use crate::domain::Coordinate;

/// A geocoding match.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub position: Coordinate,
    /// Display name of the match (place name, or the normalized address)
    pub label: String,
}

/// Failure of a single external lookup.
///
/// Callers never retry; each component decides how a failure degrades.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    /// Network error or timeout
    #[error("transport error{}: {message}", timeout_suffix(.timeout))]
    Transport { message: String, timeout: bool },

    /// Non-success HTTP status
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    /// Response did not have the expected shape
    #[error("unexpected response shape: {message}")]
    Shape { message: String },
}

impl LookupError {
    pub fn timeout() -> Self {
        LookupError::Transport {
            message: "request timed out".to_string(),
            timeout: true,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LookupError::Transport { timeout: true, .. })
    }
}

fn timeout_suffix(timeout: &bool) -> &'static str {
    if *timeout { " (timeout)" } else { "" }
}

/// Resolves free-text addresses to coordinates.
pub trait Geocoder {
    /// `Ok(None)` when the service answered but found nothing.
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<GeocodeHit>, LookupError>> + Send;
}

/// Computes travel time between two points.
pub trait TravelTimeProvider {
    /// Travel time in minutes.
    fn travel_minutes(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> impl Future<Output = Result<f64, LookupError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            LookupError::timeout().to_string(),
            "transport error (timeout): request timed out"
        );

        let err = LookupError::Transport {
            message: "connection refused".into(),
            timeout: false,
        };
        assert_eq!(err.to_string(), "transport error: connection refused");
        assert!(!err.is_timeout());

        let err = LookupError::Status {
            status: 401,
            message: "bad key".into(),
        };
        assert_eq!(err.to_string(), "API error 401: bad key");
    }
}
