//! Domain error types.
//!
//! These errors represent validation failures in the domain layer. They are
//! distinct from API/IO errors.

/// Domain-level errors for validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Latitude is not finite or outside [-90, 90]
    #[error("latitude out of range: {0}")]
    LatitudeOutOfRange(f64),

    /// Longitude is not finite or outside [-180, 180]
    #[error("longitude out of range: {0}")]
    LongitudeOutOfRange(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::LatitudeOutOfRange(91.0);
        assert_eq!(err.to_string(), "latitude out of range: 91");

        let err = DomainError::LongitudeOutOfRange(-181.5);
        assert_eq!(err.to_string(), "longitude out of range: -181.5");
    }
}
