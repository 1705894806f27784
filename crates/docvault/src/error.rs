use docvault_core::error::StoreError;
use thiserror::Error;

/// Errors surfaced by [`DocumentSession`](crate::session::DocumentSession).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input rejected locally, before any request was made.
    #[error("{0}")]
    Validation(String),

    /// A request failed. The message is the server's own explanation when
    /// it sent one, otherwise an operation-specific fallback.
    #[error("{0}")]
    Request(String),

    /// The document changed since the edit was started; nothing was saved.
    #[error("{message}")]
    Conflict { document_id: i64, message: String },

    /// A bulk operation finished with failures. The cache has already been
    /// reloaded from the server when this is returned.
    #[error("{}/{attempted} operations failed", failures.len())]
    PartialBatch {
        attempted: usize,
        /// Failed document ids with their individual messages.
        failures: Vec<(i64, String)>,
    },

    /// The view changed while a reload was in flight, so its result was
    /// discarded.
    #[error("view changed during reload")]
    StaleView,

    /// The document already has a mutation in flight.
    #[error("document {0} has an operation in progress")]
    Busy(i64),
}

impl EngineError {
    /// Wrap a store failure, preferring the server's explanation over the
    /// per-operation fallback.
    pub(crate) fn request(err: StoreError, fallback: &str) -> Self {
        match err {
            StoreError::Conflict {
                document_id,
                message,
            } => EngineError::Conflict {
                document_id,
                message,
            },
            not_found @ StoreError::NotFound(_) => EngineError::Request(not_found.to_string()),
            other => match other.server_message() {
                Some(message) => EngineError::Request(message.to_string()),
                None => EngineError::Request(fallback.to_string()),
            },
        }
    }
}

/// What a confirmation-gated operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The confirmation gate answered no; nothing was sent.
    Declined,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_wins_over_fallback() {
        let err = EngineError::request(
            StoreError::Api {
                status: 400,
                message: "Only PDF and DOCX files are supported".to_string(),
            },
            "Upload failed",
        );
        assert_eq!(err.to_string(), "Only PDF and DOCX files are supported");
    }

    #[test]
    fn test_transport_failure_uses_fallback() {
        let err = EngineError::request(
            StoreError::Transport("connection refused".to_string()),
            "Upload failed",
        );
        assert_eq!(err.to_string(), "Upload failed");
    }

    #[test]
    fn test_conflict_keeps_its_shape() {
        let err = EngineError::request(
            StoreError::Conflict {
                document_id: 7,
                message: "document 7 is at version 3, edit was based on version 2".to_string(),
            },
            "Failed to update document",
        );
        assert!(matches!(err, EngineError::Conflict { document_id: 7, .. }));
    }
}
