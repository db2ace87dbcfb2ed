//! Error types for a3s-chatroom

use thiserror::Error;

/// Errors that can occur in the chat core
#[derive(Debug, Error)]
pub enum ChatError {
    /// No live session with this name
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Client id was never started (or has quit)
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// A session with this name already exists
    #[error("Session already exists: {0}")]
    Conflict(String),

    /// Malformed request (empty names, etc.)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A single recipient could not be reached
    ///
    /// Produced by client handles. The fan-out layer collects these into a
    /// `DeliveryReport` instead of propagating them.
    #[error("Failed to deliver to '{recipient}': {reason}")]
    Delivery {
        recipient: String,
        reason: String,
    },

    /// The transport carrying the call itself failed
    #[error("Communication error: {0}")]
    Communication(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A core lock was poisoned by a panicking holder
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChatError {
    /// True for the by-name lookup failures (`SessionNotFound`, `ClientNotFound`)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound(_) | Self::ClientNotFound(_))
    }
}

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChatError::SessionNotFound("lobby".to_string());
        assert_eq!(err.to_string(), "Session not found: lobby");

        let err = ChatError::Delivery {
            recipient: "alice".to_string(),
            reason: "channel closed".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to deliver to 'alice': channel closed");
    }

    #[test]
    fn test_is_not_found() {
        assert!(ChatError::SessionNotFound("x".into()).is_not_found());
        assert!(ChatError::ClientNotFound("x".into()).is_not_found());
        assert!(!ChatError::Conflict("x".into()).is_not_found());
    }
}
