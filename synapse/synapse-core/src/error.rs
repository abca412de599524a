//! Error types for the Synapse system.

use crate::types::MemoryType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type alias for Synapse operations.
pub type Result<T> = std::result::Result<T, SynapseError>;

/// Main error type for the Synapse system.
#[derive(Debug, thiserror::Error)]
pub enum SynapseError {
    /// Rejected before any layer was dispatched
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every selected layer failed for a request
    #[error("No memory layers available for {operation} (user {user_id}): {} layer(s) failed", .failures.len())]
    NoLayersAvailable {
        user_id: String,
        operation: LayerOperation,
        failures: Vec<LayerFailure>,
    },

    /// Base memory store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped anyhow errors for compatibility
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SynapseError {
    /// Create a new invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }

    pub fn is_no_layers_available(&self) -> bool {
        matches!(self, Self::NoLayersAvailable { .. })
    }

    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

// ============================================================================
// Per-layer failures
// ============================================================================

/// The layer operation a failure happened in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LayerOperation {
    Write,
    Search,
}

impl fmt::Display for LayerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write => f.write_str("write"),
            Self::Search => f.write_str("search"),
        }
    }
}

/// Why a single layer did not contribute to a request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerFailureKind {
    /// The base store returned an error
    Store { message: String },
    /// The layer did not answer within the per-layer timeout
    Timeout { after_ms: u64 },
    /// The worker pool was closed before the layer could run
    Unavailable,
}

/// Partial-failure marker for one layer of one request.
///
/// Isolated failures are returned alongside successful results; only when
/// every selected layer fails do they surface as
/// [`SynapseError::NoLayersAvailable`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayerFailure {
    pub user_id: String,
    pub layer: MemoryType,
    pub operation: LayerOperation,
    #[serde(flatten)]
    pub kind: LayerFailureKind,
}

impl LayerFailure {
    pub fn new(user_id: impl Into<String>, layer: MemoryType, operation: LayerOperation, kind: LayerFailureKind) -> Self {
        Self {
            user_id: user_id.into(),
            layer,
            operation,
            kind,
        }
    }
}

impl fmt::Display for LayerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LayerFailureKind::Store { message } => write!(
                f,
                "{} on {} layer failed for user {}: {}",
                self.operation, self.layer, self.user_id, message
            ),
            LayerFailureKind::Timeout { after_ms } => write!(
                f,
                "{} on {} layer timed out after {}ms for user {}",
                self.operation, self.layer, after_ms, self.user_id
            ),
            LayerFailureKind::Unavailable => write!(
                f,
                "{} on {} layer unavailable for user {}",
                self.operation, self.layer, self.user_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_layers_available_message() {
        let err = SynapseError::NoLayersAvailable {
            user_id: "u1".to_string(),
            operation: LayerOperation::Search,
            failures: vec![LayerFailure::new(
                "u1",
                MemoryType::Working,
                LayerOperation::Search,
                LayerFailureKind::Timeout { after_ms: 50 },
            )],
        };
        assert!(err.is_no_layers_available());
        assert_eq!(
            err.to_string(),
            "No memory layers available for search (user u1): 1 layer(s) failed"
        );
    }

    #[test]
    fn test_layer_failure_carries_context() {
        let failure = LayerFailure::new(
            "doctor_1",
            MemoryType::Episodic,
            LayerOperation::Write,
            LayerFailureKind::Store { message: "disk full".to_string() },
        );
        assert_eq!(
            failure.to_string(),
            "write on episodic layer failed for user doctor_1: disk full"
        );

        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "store");
        assert_eq!(json["layer"], "episodic");
    }
}
