//! Error types for coinsult-agent

use thiserror::Error;

/// Result type alias using coinsult-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that fail a whole turn
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the language-model layer
    #[error(transparent)]
    Ai(#[from] coinsult_ai::Error),

    /// The end-to-end deadline expired
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: f64 },
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Check if the same turn may succeed when asked again
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Ai(e) => e.is_retryable(),
            Error::Timeout { .. } => true,
        }
    }

    /// Check if this error is caused by configuration rather than a transient failure
    pub fn is_config_error(&self) -> bool {
        match self {
            Error::Ai(e) => e.is_config_error(),
            Error::Timeout { .. } => false,
        }
    }
}

/// Failure of an external data source.
///
/// These never fail a turn: nodes turn them into inline error placeholders.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{service} returned HTTP {status}: {detail}")]
    Status {
        service: &'static str,
        status: u16,
        detail: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Unavailable(String),
}
