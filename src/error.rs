//! Error types for the matchmaking service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application. Callers that need to branch on a specific failure
//! downcast to [`MatchmakingError`].

use crate::types::PlayerId;

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Player not found: {player_id}")]
    UnknownPlayer { player_id: PlayerId },

    #[error("Player {player_id} is not in the queue")]
    NotInQueue { player_id: PlayerId },

    #[error("Player {player_id} is already in the queue")]
    AlreadyQueued { player_id: PlayerId },

    #[error("Outcome oracle unavailable: {reason}")]
    OracleUnavailable { reason: String },

    #[error("Invalid match criteria: {reason}")]
    InvalidCriteria { reason: String },

    #[error("Invalid player query: {reason}")]
    InvalidQuery { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Matchmaker not initialized: {message}")]
    NotInitialized { message: String },
}

impl MatchmakingError {
    /// Find the matchmaking error inside an anyhow error chain, if there is one
    pub fn find(error: &anyhow::Error) -> Option<&MatchmakingError> {
        error.chain().find_map(|cause| cause.downcast_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_find_through_context() {
        let error: anyhow::Error = MatchmakingError::NotInQueue { player_id: 7 }.into();
        let wrapped = Err::<(), _>(error)
            .context("while removing a player")
            .unwrap_err();

        assert_eq!(
            MatchmakingError::find(&wrapped),
            Some(&MatchmakingError::NotInQueue { player_id: 7 })
        );
    }

    #[test]
    fn test_find_foreign_error() {
        let error = anyhow::anyhow!("something else");
        assert!(MatchmakingError::find(&error).is_none());
    }
}
