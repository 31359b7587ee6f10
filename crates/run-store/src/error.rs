//! Error types for the run store

use thiserror::Error;

/// Errors produced by [`crate::RunStore`] implementations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No run with this id exists
    #[error("run not found: {run_id}")]
    RunNotFound { run_id: String },

    /// The run exists but is not in the state the operation needs
    #[error("run {run_id} is {status}, expected {expected}")]
    InvalidRunState {
        run_id: String,
        status: String,
        expected: String,
    },

    /// A digest string that is not 64 hex characters
    #[error("invalid content digest: {digest}")]
    InvalidDigest { digest: String },

    /// Payload could not be (de)serialized
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Backend connection or query failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_run_state_display() {
        let err = StorageError::InvalidRunState {
            run_id: "run-1".to_string(),
            status: "completed".to_string(),
            expected: "running".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("run-1"));
        assert!(msg.contains("completed"));
        assert!(msg.contains("expected running"));
    }

    #[test]
    fn test_serde_error_converts() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: StorageError = bad.into();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
