//! Error types for engine and unit operations.

use thiserror::Error;

use crate::engine::NodeHandle;
use crate::scheduler::SchedulerError;

/// Errors reported by an [`AudioEngine`](crate::AudioEngine) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The handle does not refer to a live engine node.
    #[error("unknown engine node {0}")]
    UnknownNode(NodeHandle),

    /// The two nodes are already linked.
    #[error("nodes {from} and {to} are already linked")]
    AlreadyLinked {
        /// Source node.
        from: NodeHandle,
        /// Destination node.
        to: NodeHandle,
    },

    /// The two nodes are not linked.
    #[error("nodes {from} and {to} are not linked")]
    NotLinked {
        /// Source node.
        from: NodeHandle,
        /// Destination node.
        to: NodeHandle,
    },

    /// Backend-specific failure.
    #[error("audio engine failure: {0}")]
    Backend(String),
}

/// Errors raised while constructing or configuring a unit.
#[derive(Debug, Error)]
pub enum UnitError {
    /// A settings field is missing or has the wrong shape.
    #[error("invalid setting '{field}': {reason}")]
    InvalidSetting {
        /// Settings key.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A port with this name already exists in the same direction.
    #[error("port '{0}' already exists")]
    DuplicatePort(String),

    /// The engine refused a request made during construction.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A scheduler owned by the unit refused to start.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// A nested patch owned by the unit could not be built. The source is
    /// the nested graph's own error, available through downcasting.
    #[error("nested patch failed: {0}")]
    Nested(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl UnitError {
    /// Create an invalid setting error.
    pub fn invalid_setting(field: impl Into<String>, reason: impl Into<String>) -> Self {
        UnitError::InvalidSetting {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_setting_display() {
        let err = UnitError::invalid_setting("tempo", "expected a number");
        assert_eq!(err.to_string(), "invalid setting 'tempo': expected a number");
    }

    #[test]
    fn test_engine_error_is_transparent() {
        let err: UnitError = EngineError::Backend("device lost".into()).into();
        assert_eq!(err.to_string(), "audio engine failure: device lost");
    }
}
