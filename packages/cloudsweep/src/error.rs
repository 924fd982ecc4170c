//! Typed errors for the orchestration core.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Each subsystem gets its own
//! enum so callers can match on what actually went wrong.

use thiserror::Error;
use uuid::Uuid;

use crate::retry::{Failure, FailureKind};

/// Errors that can terminate a whole extraction run.
///
/// Individual extractor or delivery failures are recorded on the job and
/// never surface here; this enum covers orchestration-level faults only.
#[derive(Debug, Error)]
pub enum SweepError {
    /// Extraction operation failed
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// Artifact delivery failed
    #[error("delivery failed: {0}")]
    Transport(#[from] TransportError),

    /// Durable job store failed
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Explicitly requested services resolved to zero extractors
    #[error("no extractors registered for requested services: {services:?}")]
    NoExtractors { services: Vec<String> },

    /// Job id is unknown to the orchestrator
    #[error("job not found: {id}")]
    JobNotFound { id: Uuid },

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Errors surfaced by extractor implementations.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Provider API returned an error
    #[error("provider API error: {message}")]
    Provider { message: String },

    /// Provider throttled the caller (rate limiting)
    #[error("throttled by provider: {service}")]
    Throttled { service: String },

    /// Provider call timed out
    #[error("timeout extracting: {service}")]
    Timeout { service: String },

    /// Credentials rejected or expired
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Raw record could not be mapped to an artifact
    #[error("invalid raw record: {0}")]
    InvalidRecord(#[from] serde_json::Error),

    /// Provider session unusable
    #[error("session error: {0}")]
    Session(String),

    /// Extractor construction failed during registration
    #[error("failed to build extractor {service}: {reason}")]
    Build { service: String, reason: String },
}

/// Errors that can occur delivering an artifact to the sink.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request-level HTTP failure (connect, TLS, body)
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Sink answered with a non-success status
    #[error("sink rejected artifact: HTTP {status}")]
    Rejected { status: u16 },

    /// Sink throttled the request
    #[error("sink throttled the request")]
    Throttled,

    /// Artifact could not be serialized
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Local I/O failure (file sinks)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport was already closed
    #[error("transport closed")]
    Closed,
}

/// Errors from the durable job mirror.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Stored record could not be decoded
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Failure for ExtractError {
    fn kind(&self) -> FailureKind {
        match self {
            ExtractError::Throttled { .. } => FailureKind::Throttled,
            ExtractError::Timeout { .. } => FailureKind::Timeout,
            ExtractError::Provider { .. } | ExtractError::Session(_) => FailureKind::Server,
            ExtractError::Auth(_) => FailureKind::Auth,
            ExtractError::InvalidRecord(_) | ExtractError::Build { .. } => FailureKind::Invalid,
        }
    }
}

impl Failure for TransportError {
    fn kind(&self) -> FailureKind {
        match self {
            TransportError::Throttled => FailureKind::Throttled,
            TransportError::Http(_) => FailureKind::Network,
            TransportError::Rejected { status } if *status >= 500 => FailureKind::Server,
            TransportError::Rejected { .. } => FailureKind::Invalid,
            TransportError::Serialize(_) => FailureKind::Invalid,
            TransportError::Io(_) | TransportError::Closed => FailureKind::Other,
        }
    }
}

/// Result type alias for orchestration operations.
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for extractor operations.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Result type alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Result type alias for job store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_kinds() {
        let throttled = ExtractError::Throttled {
            service: "ec2".to_string(),
        };
        assert_eq!(throttled.kind(), FailureKind::Throttled);
        assert!(throttled.kind().is_transient());

        let auth = ExtractError::Auth("expired token".to_string());
        assert_eq!(auth.kind(), FailureKind::Auth);
        assert!(!auth.kind().is_transient());
    }

    #[test]
    fn test_transport_error_kinds() {
        assert_eq!(
            TransportError::Rejected { status: 503 }.kind(),
            FailureKind::Server
        );
        assert_eq!(
            TransportError::Rejected { status: 400 }.kind(),
            FailureKind::Invalid
        );
        assert_eq!(TransportError::Throttled.kind(), FailureKind::Throttled);
    }

    #[test]
    fn test_sweep_error_from_extract() {
        let err: SweepError = ExtractError::Session("no credentials".to_string()).into();
        assert!(matches!(err, SweepError::Extract(_)));
        assert!(err.to_string().contains("no credentials"));
    }
}
