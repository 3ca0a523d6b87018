//! # Client Error Types

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for session client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Failures surfaced by the HTTP layer and the storage clearer.
///
/// The session manager absorbs all of these; they only reach callers that use
/// the collaborators directly.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport or body decoding failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The request was rejected for lack of a valid session
    #[error("not authenticated")]
    Unauthorized,

    /// Any other non-success status
    #[error("request failed with {status}: {message}")]
    Status {
        status: http::StatusCode,
        message: String,
    },

    /// Endpoint URL could not be built from the configured base
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Persisted cookie storage could not be read, written, or removed
    #[error("session storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Test login was requested but is not enabled for this build
    #[error("test login is disabled")]
    TestLoginDisabled,
}

impl ClientError {
    /// Create a storage error for `path`
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure means "no valid session" rather than a fault.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Unauthorized => true,
            Self::Status { status, .. } => *status == http::StatusCode::UNAUTHORIZED,
            _ => false,
        }
    }
}
