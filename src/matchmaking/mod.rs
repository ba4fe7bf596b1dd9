//! Matchmaking queue, opponent search and the engine tying them together

pub mod engine;
pub mod finder;
pub mod queue;

pub use engine::{Matchmaker, MatchmakerStats};
pub use finder::{MatchFinder, MatchingConfig};
pub use queue::MatchmakingQueue;
