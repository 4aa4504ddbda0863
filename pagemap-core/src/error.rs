//! Error types and result types for page-store operations.
//!
//! This module provides the error taxonomy for the whole crate. Use
//! [`PageStoreResult<T>`] as the return type for fallible operations.
//!
//! The taxonomy separates local failures (caught before any network call)
//! from remote ones, and remote failures by whether a retry can help:
//!
//! - [`PageStoreError::Validation`] / [`PageStoreError::Schema`] - local
//!   misuse, raised at the call site, never deferred to a round-trip
//! - [`PageStoreError::Decode`] - a malformed or unrecognized response shape
//! - [`PageStoreError::Auth`] - a credential problem
//! - [`PageStoreError::Transient`] - retryable (rate limit, timeout, 5xx)
//! - [`PageStoreError::Permanent`] - non-retryable rejection

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when mapping local records
/// onto the remote page store.
#[derive(Error, Debug)]
pub enum PageStoreError {
    /// A local value violates the schema. Never sent over the network.
    /// Carries the field name and the expected vs. actual shape.
    #[error("invalid value for field '{field}': expected {expected}, got {actual}")]
    Validation {
        /// Local name of the offending field.
        field: String,
        /// The kind the schema declares for the field.
        expected: String,
        /// The kind that was actually supplied.
        actual: String,
    },
    /// Query or field misuse caught before any network call, such as
    /// filtering on an undeclared field or an empty compound group.
    #[error("schema error: {0}")]
    Schema(String),
    /// The response contained a fragment this layer does not recognize.
    /// The payload names the offending type tag, never a silent default.
    #[error("unrecognized wire fragment: {tag}")]
    Decode {
        /// The type tag (or a description) of the offending fragment.
        tag: String,
    },
    /// A credential problem, either structural (empty token) or an HTTP 401.
    #[error("authentication error: {0}")]
    Auth(String),
    /// A retryable condition: rate limit, timeout, or server-side failure.
    /// Retried internally with bounded backoff before surfacing.
    #[error("transient API failure: {message}")]
    Transient {
        /// HTTP-equivalent status, when one was received.
        status: Option<u16>,
        /// Diagnostic detail from the server or the transport.
        message: String,
    },
    /// A non-retryable rejection: bad request, not found, permission denied.
    /// Surfaces immediately, no retry.
    #[error("request rejected: {message}")]
    Permanent {
        /// HTTP-equivalent status, when one was received.
        status: Option<u16>,
        /// Diagnostic detail from the server or the transport.
        message: String,
    },
}

/// A specialized `Result` type for page-store operations.
pub type PageStoreResult<T> = Result<T, PageStoreError>;

impl PageStoreError {
    /// Creates a [`PageStoreError::Decode`] naming the offending fragment.
    pub fn decode(tag: impl Into<String>) -> Self {
        PageStoreError::Decode { tag: tag.into() }
    }

    /// Creates a [`PageStoreError::Validation`] for the given field.
    pub fn validation(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        PageStoreError::Validation {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Classifies an HTTP status into the error taxonomy.
    ///
    /// 401 maps to [`PageStoreError::Auth`]; 408, 429 and all 5xx map to
    /// [`PageStoreError::Transient`]; every other non-success status is
    /// [`PageStoreError::Permanent`].
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();

        match status {
            401 => PageStoreError::Auth(message),
            408 | 429 | 500..=599 => PageStoreError::Transient { status: Some(status), message },
            _ => PageStoreError::Permanent { status: Some(status), message },
        }
    }

    /// Returns `true` if retrying the operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PageStoreError::Transient { .. })
    }

    /// Returns the HTTP-equivalent status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            PageStoreError::Transient { status, .. } | PageStoreError::Permanent { status, .. } => {
                *status
            }
            _ => None,
        }
    }
}

impl From<SerdeJsonError> for PageStoreError {
    fn from(err: SerdeJsonError) -> Self {
        PageStoreError::Decode { tag: format!("malformed json: {err}") }
    }
}
