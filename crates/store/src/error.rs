//! Error types for store operations.
//!
//! Nothing here retries. Every failure surfaces to the caller, which decides
//! whether to log it or propagate it further.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The error type for all store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The client could not be built from the configuration.
    #[error("connection setup failed: {message}")]
    Connection { message: String },

    /// The request never produced an HTTP response.
    #[error("{operation} failed: {message}")]
    Transport { operation: String, message: String },

    /// The cluster answered with a non-success status.
    #[error("{operation} failed (status {status}): {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("index not found: {index}")]
    IndexNotFound { index: String },

    #[error("index already exists: {index}")]
    IndexAlreadyExists { index: String },

    #[error("document not found: {index}/{id}")]
    DocumentNotFound { index: String, id: String },

    #[error("document already exists: {index}/{id}")]
    DocumentAlreadyExists { index: String, id: String },

    /// The response body did not have the expected shape.
    #[error("failed to decode {operation} response: {message}")]
    Decode { operation: String, message: String },

    /// A request was rejected before being sent.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn transport(operation: &str, err: impl std::fmt::Display) -> Self {
        StoreError::Transport {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(operation: &str, err: impl std::fmt::Display) -> Self {
        StoreError::Decode {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// Returns true for the not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::IndexNotFound { .. } | StoreError::DocumentNotFound { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type StoreResult<T> = Result<T, StoreError>;
