//! Error taxonomy for the consensus pipeline.

/// Errors produced by a model endpoint call.
///
/// Display strings are what the backoff executor inspects, so `Status`
/// always begins with the numeric HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("{status} {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("model returned no text")]
    EmptyResponse,

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("invalid endpoint config: {0}")]
    InvalidConfig(String),
}

/// The request URL is stripped before formatting: a host or port such as
/// `localhost:4001` must not reach the retry classifier.
impl From<reqwest::Error> for EndpointError {
    fn from(e: reqwest::Error) -> Self {
        let class = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connect"
        } else if e.is_decode() {
            "decode"
        } else if e.is_body() {
            "body"
        } else {
            "request"
        };
        let status = e.status();
        let message = format!("{class}: {}", e.without_url());
        match status {
            Some(status) => EndpointError::Status {
                status: status.as_u16(),
                body: message,
            },
            None => EndpointError::Transport(message),
        }
    }
}

/// Result type for endpoint calls.
pub type EndpointResult<T> = std::result::Result<T, EndpointError>;

/// Errors produced by the consensus orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error("consensus needs at least 2 workers, got {requested}")]
    TooFewWorkers { requested: usize },

    #[error(
        "Consensus requires at least 2 successful workers, got {succeeded}/{requested}: {}",
        failures.join("; ")
    )]
    Quorum {
        succeeded: usize,
        requested: usize,
        failures: Vec<String>,
    },

    #[error("judge call failed: {0}")]
    Judge(String),
}

/// Result type for consensus operations.
pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Errors produced while loading or validating [`crate::config::QuorumConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quorum_error_display() {
        let err = ConsensusError::Quorum {
            succeeded: 1,
            requested: 3,
            failures: vec!["worker_2: 503 down".into(), "worker_3: timeout".into()],
        };
        assert_eq!(
            err.to_string(),
            "Consensus requires at least 2 successful workers, got 1/3: worker_2: 503 down; worker_3: timeout"
        );
    }

    #[test]
    fn test_status_error_starts_with_code() {
        let err = EndpointError::Status {
            status: 401,
            body: "Unauthorized".into(),
        };
        assert!(err.to_string().starts_with("401"));
        assert!(crate::backoff::is_non_retryable(&err.to_string()));

        let err = EndpointError::Status {
            status: 503,
            body: "overloaded".into(),
        };
        assert!(!crate::backoff::is_non_retryable(&err.to_string()));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid("batch.concurrency must be >= 1".into());
        assert!(err.to_string().contains("invalid config"));
    }
}
