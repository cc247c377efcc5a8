//! Error types for tessera.
//!
//! Three layers of errors are kept apart on purpose:
//!
//! - [`StoreError`] is what a [`DocumentStore`](crate::DocumentStore) backend reports.
//! - [`ReadError`] is what [`ResilientReader::read`](crate::ResilientReader::read) surfaces.
//! - [`MutationError`] is what [`MutationGateway::apply`](crate::MutationGateway::apply) surfaces.
//!
//! `StoreError::IndexUnavailable` never reaches the caller of a read when the
//! fallback query succeeds.

use std::fmt;
use thiserror::Error;

/// Failures reported by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot serve an equality-filter-plus-sort query without a
    /// composite index that does not exist yet.
    #[error("composite index unavailable: {message}")]
    IndexUnavailable { message: String },

    /// The caller lacks rights for the operation.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// The addressed document does not exist.
    #[error("document not found: {path}")]
    NotFound { path: String },

    /// A conditional write found the document changed since it was read.
    #[error("document changed concurrently: {path}")]
    PreconditionFailed { path: String },

    /// The request did not complete in time.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// An atomic batch exceeds the store's write limit.
    #[error("batch of {requested} writes exceeds the store limit of {limit}")]
    BatchTooLarge { requested: usize, limit: usize },

    /// Network or filesystem failure.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Error response reported by a remote store.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A stored document could not be decoded.
    #[error("invalid stored data: {message}")]
    InvalidData { message: String },

    /// Input rejected before reaching the store.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl StoreError {
    /// Returns true if this failure should trigger the fallback read path.
    pub fn is_index_unavailable(&self) -> bool {
        matches!(self, StoreError::IndexUnavailable { .. })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Transport {
            message: format!("IO error: {}", err),
        }
    }
}

/// Error response from a remote store that has no dedicated variant.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Canonical status name (e.g. `RESOURCE_EXHAUSTED`), if reported.
    pub code: Option<String>,
    /// Error message from the server.
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref code) = self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, code: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            code,
            message,
        }
    }
}

/// Failures surfaced by [`ResilientReader::read`](crate::ResilientReader::read).
#[derive(Debug, Error)]
pub enum ReadError {
    /// The cursor is malformed or belongs to a different query.
    #[error("invalid cursor: {reason}")]
    InvalidCursor { reason: String },

    /// The query descriptor violates an input constraint.
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// The store did not answer in time.
    #[error("read timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The store refused the read.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// Any other store failure, including a failed fallback query.
    #[error("read failed: {0}")]
    ReadFailed(#[source] StoreError),
}

impl From<StoreError> for ReadError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout { duration_ms } => ReadError::Timeout { duration_ms },
            StoreError::PermissionDenied { message } => ReadError::PermissionDenied { message },
            other => ReadError::ReadFailed(other),
        }
    }
}

/// Failures surfaced by [`MutationGateway::apply`](crate::MutationGateway::apply).
#[derive(Debug, Error)]
pub enum MutationError {
    /// The target document does not exist.
    #[error("document not found: {path}")]
    NotFound { path: String },

    /// The store refused the write.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// The request is structurally invalid (empty field set, illegal status
    /// transition, duplicate ids).
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },

    /// The batch must be split by the caller.
    #[error("batch of {requested} ids exceeds the atomic limit of {limit}")]
    BatchTooLarge { requested: usize, limit: usize },

    /// The store did not answer in time.
    #[error("mutation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Any other store failure.
    #[error("mutation failed: {0}")]
    MutationFailed(#[source] StoreError),
}

impl From<StoreError> for MutationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { path } => MutationError::NotFound { path },
            StoreError::PermissionDenied { message } => MutationError::PermissionDenied { message },
            StoreError::BatchTooLarge { requested, limit } => {
                MutationError::BatchTooLarge { requested, limit }
            }
            StoreError::Timeout { duration_ms } => MutationError::Timeout { duration_ms },
            StoreError::PreconditionFailed { path } => MutationError::MalformedRequest {
                reason: format!("{} changed while the request was applied", path),
            },
            other => MutationError::MutationFailed(other),
        }
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid collection name.
    #[error("invalid collection name '{value}': {reason}")]
    Collection { value: String, reason: String },

    /// Invalid record identifier.
    #[error("invalid record id '{value}': {reason}")]
    RecordId { value: String, reason: String },

    /// Invalid field name.
    #[error("invalid field '{value}': {reason}")]
    Field { value: String, reason: String },

    /// Invalid store URL.
    #[error("invalid store URL '{value}': {reason}")]
    StoreUrl { value: String, reason: String },

    /// Undecodable cursor token.
    #[error("invalid cursor: {reason}")]
    Cursor { reason: String },

    /// Unknown review status.
    #[error("invalid status '{value}'")]
    Status { value: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_stays_distinct_from_read_failure() {
        let err: ReadError = StoreError::Timeout { duration_ms: 30_000 }.into();
        assert!(matches!(err, ReadError::Timeout { duration_ms: 30_000 }));
    }

    #[test]
    fn store_not_found_maps_to_mutation_not_found() {
        let err: MutationError = StoreError::NotFound {
            path: "notifications/n1".to_string(),
        }
        .into();
        assert!(matches!(err, MutationError::NotFound { ref path } if path == "notifications/n1"));
    }

    #[test]
    fn lost_precondition_is_a_malformed_mutation() {
        let err: MutationError = StoreError::PreconditionFailed {
            path: "email_insights/i1".to_string(),
        }
        .into();
        assert!(
            matches!(err, MutationError::MalformedRequest { ref reason } if reason.contains("email_insights/i1"))
        );
    }

    #[test]
    fn unclassified_store_errors_keep_their_type() {
        let err: ReadError = StoreError::Transport {
            message: "connection reset".to_string(),
        }
        .into();
        match err {
            ReadError::ReadFailed(StoreError::Transport { message }) => {
                assert_eq!(message, "connection reset")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn protocol_error_display() {
        let err = ProtocolError::new(
            429,
            Some("RESOURCE_EXHAUSTED".to_string()),
            Some("Quota exceeded".to_string()),
        );
        assert_eq!(err.to_string(), "HTTP 429 [RESOURCE_EXHAUSTED]: Quota exceeded");
    }
}
