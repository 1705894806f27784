//! Error type shared by all [`Store`](crate::store::Store) implementations.

use thiserror::Error;

/// Failure modes of the remote document store contract.
///
/// `Api` carries the server's own message so callers can surface it
/// verbatim; `Transport` covers failures before any response arrived.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(i64),

    #[error("version conflict on document {document_id}: {message}")]
    Conflict { document_id: i64, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl StoreError {
    /// The server-reported message for this error, if one exists.
    ///
    /// Used by callers that show server text verbatim and fall back to an
    /// operation-specific message otherwise.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            StoreError::Api { message, .. } if !message.is_empty() => Some(message),
            StoreError::Conflict { message, .. } if !message.is_empty() => Some(message),
            StoreError::Validation(message) if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}
