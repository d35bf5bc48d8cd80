//! Error types for the RL core library

use thiserror::Error;

/// Core error type for RL operations
#[derive(Error, Debug)]
pub enum RLError {
    /// Environment-related errors
    #[error("Environment error: {0}")]
    Environment(String),

    /// Goal string could not be parsed
    #[error("Malformed goal '{goal}': {reason}")]
    MalformedGoal {
        /// The offending goal string
        goal: String,
        /// What was wrong with it
        reason: String,
    },

    /// A level type cannot rest on the level type below it
    #[error("Unknown structure: '{above}' cannot be placed on '{below}'")]
    UnknownStructure {
        /// Token of the supporting level
        below: String,
        /// Token of the level being placed
        above: String,
    },

    /// A bounded sampling loop ran out of attempts
    #[error("Sampling exhausted for {what} after {attempts} attempts")]
    SamplingExhausted {
        /// What was being sampled
        what: String,
        /// Attempts spent
        attempts: usize,
    },

    /// Episode setup kept failing with recoverable errors
    #[error("Reset failed after {attempts} attempts: {last_error}")]
    ResetExhausted {
        /// Attempts spent
        attempts: usize,
        /// Message of the final failure
        last_error: String,
    },

    /// Invalid action
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RLError {
    /// Whether retrying the whole episode setup can clear this error.
    ///
    /// Only sampling failures depend on the random draw; malformed goals and
    /// unsupported structures fail the same way every time.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SamplingExhausted { .. })
    }

    /// Shorthand for a sampling failure
    pub fn sampling_exhausted(what: impl Into<String>, attempts: usize) -> Self {
        Self::SamplingExhausted {
            what: what.into(),
            attempts,
        }
    }
}

/// Result type alias for RL operations
pub type Result<T> = std::result::Result<T, RLError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_sampling_is_recoverable() {
        assert!(RLError::sampling_exhausted("cube", 100).is_recoverable());
        assert!(!RLError::MalformedGoal {
            goal: "1".into(),
            reason: "odd length".into(),
        }
        .is_recoverable());
        assert!(!RLError::UnknownStructure {
            below: "1r".into(),
            above: "1b".into(),
        }
        .is_recoverable());
    }

    #[test]
    fn test_messages() {
        let err = RLError::UnknownStructure {
            below: "1b".into(),
            above: "1l".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown structure: '1l' cannot be placed on '1b'"
        );
    }
}
