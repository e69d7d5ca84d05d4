use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The request never reached the server (DNS failure, offline, refused).
    #[error("network unreachable: {0}")]
    NetworkUnavailable(String),

    /// The request exceeded the client-side deadline. A late result, if the
    /// server ever produces one, is abandoned.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-2xx status.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Rejected before any network call (empty title, malformed payload).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Local persistence failure. Logged, never surfaced to the user.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Whether a mutating action that hit this error should degrade to a
    /// queued pending operation rather than blocking the optimistic change.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::NetworkUnavailable(_) | SyncError::Timeout | SyncError::Server { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SyncError::NetworkUnavailable("dns".into()).is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::Server {
            status: 500,
            message: "boom".into()
        }
        .is_retryable());

        assert!(!SyncError::Validation("empty title".into()).is_retryable());
        assert!(!SyncError::Storage("disk".into()).is_retryable());
    }

    #[test]
    fn test_server_error_display() {
        let err = SyncError::Server {
            status: 404,
            message: "task not found".into(),
        };
        assert_eq!(err.to_string(), "server error 404: task not found");
    }
}
