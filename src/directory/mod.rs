//! Player directory for the matchmaking service
//!
//! The directory is the read-only table of player records the rest of the
//! service draws on: queue validation, cluster lookups for candidate filtering,
//! and the rating-proximity fallback all go through the [`PlayerDirectory`]
//! trait. Data is loaded once at startup and never mutated afterwards.

pub mod paging;
pub mod store;

use crate::error::Result;
use crate::types::{PlayerId, PlayerRecord, SkillCluster};

// Re-export commonly used types
pub use paging::{PagedQuery, PagedResult, PlayerOrder};
pub use store::InMemoryPlayerDirectory;

/// Trait for read-only player lookups
pub trait PlayerDirectory: Send + Sync {
    /// Look up a single player
    fn get_player(&self, player_id: PlayerId) -> Option<&PlayerRecord>;

    /// Check whether a player is known
    fn contains(&self, player_id: PlayerId) -> bool {
        self.get_player(player_id).is_some()
    }

    /// Identifiers of every player in a skill cluster, ascending
    fn players_in_cluster(&self, cluster: SkillCluster) -> Vec<PlayerId>;

    /// Identifiers of every known player, ascending
    fn all_player_ids(&self) -> Vec<PlayerId>;

    /// Number of known players
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Page through the players, optionally filtered by name and ordered by a field
    fn list_players(&self, query: &PagedQuery) -> Result<PagedResult<PlayerRecord>>;
}
