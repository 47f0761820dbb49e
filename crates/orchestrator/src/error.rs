use thiserror::Error;

use crate::platform::PlatformError;
use crate::storage::StorageError;

/// Errors surfaced by the broker provisioning pipeline.
///
/// Variants carry owned strings so a stored outcome can be handed to the
/// waiter without consuming it.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    #[error("Plugin metadata serialization failed: {0}")]
    Serialization(String),

    #[error("Platform {operation} failed: {source}")]
    Platform {
        operation: &'static str,
        source: PlatformError,
    },

    #[error("Broker reported failure: {0}")]
    BrokerReported(String),

    #[error("Broker pod '{pod_name}' cannot recover: {reason}: {message}")]
    UnrecoverablePod {
        pod_name: String,
        reason: String,
        message: String,
    },

    #[error("Timed out after {seconds}s waiting for the broker result")]
    WaitTimeout { seconds: u64 },

    #[error("Storage preparation timed out after {millis}ms")]
    StorageTimeout { millis: u64 },

    #[error("Storage preparation failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Interrupted while waiting for the broker result")]
    Interrupted,

    #[error("Resolved plugin validation failed: {0}")]
    Validation(String),
}

impl BrokerError {
    /// Wrap a platform failure, naming the operation that failed.
    pub fn platform(operation: &'static str, source: PlatformError) -> Self {
        Self::Platform { operation, source }
    }

    pub fn serialization(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Whether the caller may retry the whole invocation.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::WaitTimeout { .. } | Self::StorageTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecoverable_error_mentions_event_details() {
        let error = BrokerError::UnrecoverablePod {
            pod_name: "broker-abc".to_string(),
            reason: "FailedScheduling".to_string(),
            message: "0/3 nodes are available".to_string(),
        };
        let text = error.to_string();
        assert!(text.contains("broker-abc"));
        assert!(text.contains("FailedScheduling"));
        assert!(text.contains("0/3 nodes are available"));
    }

    #[test]
    fn test_timeout_classification() {
        assert!(BrokerError::WaitTimeout { seconds: 60 }.is_timeout());
        assert!(BrokerError::StorageTimeout { millis: 500 }.is_timeout());
        assert!(!BrokerError::Interrupted.is_timeout());
        assert!(!BrokerError::BrokerReported("x".to_string()).is_timeout());
    }
}
