//! Error types for BCB data operations.
//!
//! This module defines [`BcbError`], the one error family raised by the
//! workspace. Callers can match on a single type to catch every library
//! failure, or on individual variants when they care about the kind.

use thiserror::Error;

/// Errors that can occur while discovering, querying or decoding BCB data.
#[derive(Error, Debug)]
pub enum BcbError {
    /// The metadata document is malformed or internally inconsistent.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A named endpoint or property does not exist in the resolved schema.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A function parameter name is not declared by the bound function.
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// A required function parameter has no value at execution time.
    #[error("Parameter not set: {0}")]
    MissingParameter(String),

    /// The service answered with a non-success status code.
    #[error("HTTP {status} from {url}")]
    Http {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Network-related errors (connection failures, timeouts, client setup).
    #[error("Network error: {0}")]
    Network(String),

    /// Error decoding a response body or building a table from it.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An invalid value was provided by the caller.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl BcbError {
    /// Returns true for failures raised while talking to the service.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Network(_))
    }

    /// Returns the HTTP status code for [`BcbError::Http`].
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias using [`BcbError`].
pub type Result<T> = std::result::Result<T, BcbError>;
