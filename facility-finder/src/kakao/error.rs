//! Kakao client error types.

use crate::lookup::LookupError;

/// Errors from the Kakao HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum KakaoError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Invalid API key or unauthorized
    #[error("unauthorized (invalid API key)")]
    Unauthorized,

    /// Response body did not have the expected shape
    #[error("unexpected response shape: {message}")]
    Shape { message: String },

    /// Client could not be built from the configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl KakaoError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, KakaoError::Http(e) if e.is_timeout())
    }
}

impl From<KakaoError> for LookupError {
    fn from(err: KakaoError) -> Self {
        match err {
            KakaoError::Http(e) => LookupError::Transport {
                timeout: e.is_timeout(),
                message: e.to_string(),
            },
            KakaoError::Api { status, message } => LookupError::Status { status, message },
            KakaoError::Unauthorized => LookupError::Status {
                status: 401,
                message: "unauthorized".to_string(),
            },
            KakaoError::Shape { message } => LookupError::Shape { message },
            KakaoError::Config(message) => LookupError::Transport {
                message,
                timeout: false,
            },
        }
    }
}
