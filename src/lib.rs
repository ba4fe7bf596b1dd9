//! Duel Parlor - 1v1 matchmaking by predicted win probability
//!
//! This crate keeps a queue of waiting players drawn from a fixed player
//! directory, scores candidate opponents with a pluggable outcome oracle, and
//! pairs each requester with the opponent whose predicted win probability is
//! closest to a target, falling back to the closest rating.

pub mod config;
pub mod directory;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod oracle;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use directory::{InMemoryPlayerDirectory, PlayerDirectory};
pub use matchmaking::{Matchmaker, MatchingConfig};
pub use oracle::{EloOracle, LogisticOracle, OutcomeOracle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
