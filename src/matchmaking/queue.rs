//! Ordered queue of players waiting for an opponent

use crate::directory::PlayerDirectory;
use crate::error::{MatchmakingError, Result};
use crate::types::{PlayerId, QueueEntry};
use crate::utils::current_timestamp;
use std::sync::Arc;
use tracing::{debug, info};

/// Waiting players in arrival order
///
/// Every entry is validated against the directory at insertion and an id can
/// only appear once. Not synchronised; the matchmaker serialises access.
pub struct MatchmakingQueue {
    directory: Arc<dyn PlayerDirectory>,
    entries: Vec<QueueEntry>,
}

impl MatchmakingQueue {
    pub fn new(directory: Arc<dyn PlayerDirectory>) -> Self {
        Self {
            directory,
            entries: Vec::new(),
        }
    }

    /// Queue every player in the directory, in ascending id order
    pub fn with_all_players(directory: Arc<dyn PlayerDirectory>) -> Self {
        let now = current_timestamp();
        let entries = directory
            .all_player_ids()
            .into_iter()
            .map(|player_id| QueueEntry {
                player_id,
                enqueued_at: now,
            })
            .collect();

        Self { directory, entries }
    }

    /// Append a player to the end of the queue
    pub fn enqueue(&mut self, player_id: PlayerId) -> Result<()> {
        if !self.directory.contains(player_id) {
            debug!("Rejected enqueue of unknown player {}", player_id);
            return Err(MatchmakingError::UnknownPlayer { player_id }.into());
        }

        if self.contains(player_id) {
            return Err(MatchmakingError::AlreadyQueued { player_id }.into());
        }

        self.entries.push(QueueEntry {
            player_id,
            enqueued_at: current_timestamp(),
        });

        info!(
            "Player {} added to queue (queue size: {})",
            player_id,
            self.entries.len()
        );
        Ok(())
    }

    /// Remove a player, keeping everyone else in order
    pub fn dequeue(&mut self, player_id: PlayerId) -> Result<QueueEntry> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.player_id == player_id)
            .ok_or(MatchmakingError::NotInQueue { player_id })?;

        let entry = self.entries.remove(position);
        info!(
            "Player {} removed from queue (queue size: {})",
            player_id,
            self.entries.len()
        );
        Ok(entry)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.entries.iter().any(|entry| entry.player_id == player_id)
    }

    /// Waiting ids in arrival order
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.entries.iter().map(|entry| entry.player_id).collect()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn directory(&self) -> &Arc<dyn PlayerDirectory> {
        &self.directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryPlayerDirectory;
    use crate::types::PlayerRecord;
    use proptest::prelude::*;

    fn record(id: i64) -> PlayerRecord {
        PlayerRecord {
            profile_id: id,
            name: format!("player{}", id),
            rating: 1500.0 + id as f64,
            win_rate: 0.5,
            games_count: 20,
            wins_count: 10,
            cluster: id % 2,
            rank_level: String::new(),
            rank_level_encoded: 1.0,
            avg_mmr_diff_10: 0.0,
            avg_mmr_diff_50: 0.0,
            avg_mmr: 1500.0,
            avg_opp_mmr: 1500.0,
            avg_game_length: 1200.0,
            rank: None,
            country: None,
            last_game_at: None,
            common_civ: None,
        }
    }

    fn directory(ids: impl IntoIterator<Item = i64>) -> Arc<dyn PlayerDirectory> {
        let records = ids.into_iter().map(record).collect();
        Arc::new(InMemoryPlayerDirectory::from_records(records).unwrap())
    }

    fn error_of(result: Result<impl std::fmt::Debug>) -> MatchmakingError {
        let error = result.unwrap_err();
        MatchmakingError::find(&error).cloned().unwrap()
    }

    #[test]
    fn test_enqueue_known_player() {
        let mut queue = MatchmakingQueue::new(directory(1..=3));
        queue.enqueue(2).unwrap();
        queue.enqueue(1).unwrap();

        assert_eq!(queue.size(), 2);
        assert_eq!(queue.player_ids(), vec![2, 1]);
        assert!(queue.contains(1));
        assert!(!queue.contains(3));
    }

    #[test]
    fn test_enqueue_unknown_player() {
        let mut queue = MatchmakingQueue::new(directory(1..=3));
        queue.enqueue(1).unwrap();

        assert_eq!(
            error_of(queue.enqueue(42)),
            MatchmakingError::UnknownPlayer { player_id: 42 }
        );
        assert_eq!(queue.player_ids(), vec![1]);
    }

    #[test]
    fn test_duplicate_enqueue_rejected() {
        let mut queue = MatchmakingQueue::new(directory(1..=3));
        queue.enqueue(1).unwrap();

        assert_eq!(
            error_of(queue.enqueue(1)),
            MatchmakingError::AlreadyQueued { player_id: 1 }
        );
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_dequeue_twice() {
        let mut queue = MatchmakingQueue::new(directory(1..=3));
        queue.enqueue(1).unwrap();

        let entry = queue.dequeue(1).unwrap();
        assert_eq!(entry.player_id, 1);
        assert_eq!(
            error_of(queue.dequeue(1)),
            MatchmakingError::NotInQueue { player_id: 1 }
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_with_all_players() {
        let queue = MatchmakingQueue::with_all_players(directory([5, 3, 9]));
        assert_eq!(queue.player_ids(), vec![3, 5, 9]);
    }

    proptest! {
        #[test]
        fn prop_unknown_ids_never_change_queue(
            queued in proptest::collection::hash_set(1i64..=20, 0..10),
            unknown in 21i64..1000,
        ) {
            let mut queue = MatchmakingQueue::new(directory(1..=20));
            for id in &queued {
                queue.enqueue(*id).unwrap();
            }
            let before = queue.player_ids();

            let error = queue.enqueue(unknown).unwrap_err();
            prop_assert_eq!(
                MatchmakingError::find(&error),
                Some(&MatchmakingError::UnknownPlayer { player_id: unknown })
            );
            prop_assert_eq!(queue.player_ids(), before);
        }

        #[test]
        fn prop_dequeue_preserves_relative_order(
            ids in proptest::sample::subsequence((1i64..=20).collect::<Vec<_>>(), 1..20),
            pick in any::<proptest::sample::Index>(),
        ) {
            let mut queue = MatchmakingQueue::new(directory(1..=20));
            for id in &ids {
                queue.enqueue(*id).unwrap();
            }

            let removed = ids[pick.index(ids.len())];
            queue.dequeue(removed).unwrap();

            let expected: Vec<i64> = ids.iter().copied().filter(|id| *id != removed).collect();
            prop_assert_eq!(queue.player_ids(), expected);
        }
    }
}
