//! Registry client error types.

/// Errors from fetching a single registry page.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected envelope
    #[error("unexpected response shape: {message}")]
    Shape { message: String },
}

impl RegistryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RegistryError::Http(e) if e.is_timeout())
    }

    /// Whether the error is a data-shape deviation rather than a failed call.
    pub fn is_shape(&self) -> bool {
        matches!(self, RegistryError::Shape { .. })
    }
}
