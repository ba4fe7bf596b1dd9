//! Matchmaker engine owning the directory snapshot, queue and oracle
//!
//! Every operation that reads or mutates the queue takes the same async mutex,
//! and `find_match` holds it for the full read-score-remove transaction, so
//! concurrent callers can never pair the same waiting player twice.

use crate::directory::PlayerDirectory;
use crate::error::{MatchmakingError, Result};
use crate::matchmaking::finder::{MatchFinder, MatchingConfig};
use crate::matchmaking::queue::MatchmakingQueue;
use crate::metrics::MetricsCollector;
use crate::oracle::OutcomeOracle;
use crate::types::{MatchCriteria, MatchOutcome, MatchStrategy, PlayerId, QueueEntry};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Statistics about matchmaker operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchmakerStats {
    /// Total successful enqueues
    pub players_enqueued: u64,
    /// Total explicit removals
    pub players_dequeued: u64,
    /// Matches made inside the probability band
    pub probability_matches: u64,
    /// Matches made by the rating fallback
    pub fallback_matches: u64,
    /// Requests that ended with no opponent
    pub unmatched_requests: u64,
    /// Current number of players waiting
    pub players_waiting: usize,
}

impl MatchmakerStats {
    pub fn total_matches(&self) -> u64 {
        self.probability_matches + self.fallback_matches
    }
}

/// Mutable state guarded by the matchmaker's lock
struct MatchmakerState {
    queue: MatchmakingQueue,
    rng: StdRng,
    stats: MatchmakerStats,
}

/// The main matchmaking engine
pub struct Matchmaker {
    directory: Arc<dyn PlayerDirectory>,
    finder: MatchFinder,
    state: Mutex<MatchmakerState>,
    metrics: Arc<MetricsCollector>,
}

impl Matchmaker {
    /// Create a matchmaker with its own metrics collector
    pub fn new(
        directory: Arc<dyn PlayerDirectory>,
        oracle: Arc<dyn OutcomeOracle>,
        config: MatchingConfig,
    ) -> Result<Self> {
        let metrics = Arc::new(MetricsCollector::new()?);
        Self::with_metrics(directory, oracle, config, metrics)
    }

    /// Create a matchmaker reporting into an existing metrics collector
    ///
    /// Fails with `NotInitialized` if the directory is empty, which means the
    /// player data was never loaded.
    pub fn with_metrics(
        directory: Arc<dyn PlayerDirectory>,
        oracle: Arc<dyn OutcomeOracle>,
        config: MatchingConfig,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self> {
        if directory.is_empty() {
            return Err(MatchmakingError::NotInitialized {
                message: "player directory is empty; load player data before matchmaking"
                    .to_string(),
            }
            .into());
        }
        config.validate()?;

        let queue = if config.seed_queue_with_directory {
            warn!(
                "Seeding matchmaking queue with all {} directory players",
                directory.len()
            );
            MatchmakingQueue::with_all_players(directory.clone())
        } else {
            MatchmakingQueue::new(directory.clone())
        };

        let stats = MatchmakerStats {
            players_waiting: queue.size(),
            ..MatchmakerStats::default()
        };

        metrics.set_directory_players(directory.len());
        metrics.set_queue_size(queue.size());

        info!(
            "Matchmaker ready - players: {}, oracle: {}, target: {}, tolerance: {}",
            directory.len(),
            oracle.model_version(),
            config.criteria.target,
            config.criteria.tolerance
        );

        Ok(Self {
            directory,
            finder: MatchFinder::new(oracle, config, metrics.clone()),
            state: Mutex::new(MatchmakerState {
                queue,
                rng: StdRng::from_entropy(),
                stats,
            }),
            metrics,
        })
    }

    /// Replace the entropy-seeded candidate shuffler with a deterministic one
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.state.get_mut().rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Add a player to the end of the queue
    pub async fn enqueue(&self, player_id: PlayerId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.queue.enqueue(player_id)?;

        state.stats.players_enqueued += 1;
        state.stats.players_waiting = state.queue.size();
        self.metrics.record_enqueue();
        self.metrics.set_queue_size(state.queue.size());
        Ok(())
    }

    /// Remove a waiting player
    pub async fn dequeue(&self, player_id: PlayerId) -> Result<QueueEntry> {
        let mut state = self.state.lock().await;
        let entry = state.queue.dequeue(player_id)?;

        state.stats.players_dequeued += 1;
        state.stats.players_waiting = state.queue.size();
        self.metrics.record_dequeue("manual");
        self.metrics.set_queue_size(state.queue.size());
        Ok(entry)
    }

    /// Number of players waiting
    pub async fn queue_size(&self) -> usize {
        self.state.lock().await.queue.size()
    }

    /// Waiting players in arrival order
    pub async fn queue_entries(&self) -> Vec<QueueEntry> {
        self.state.lock().await.queue.entries().to_vec()
    }

    /// Probability that `player_a` beats `player_b`
    pub async fn predict(&self, player_a: PlayerId, player_b: PlayerId) -> Result<f64> {
        self.finder
            .predict(self.directory.as_ref(), player_a, player_b)
            .await
    }

    /// Find an opponent using the configured target and tolerance
    pub async fn find_match(&self, player_id: PlayerId) -> Result<MatchOutcome> {
        let criteria = self.finder.config().criteria;
        self.find_match_with(player_id, criteria).await
    }

    /// Find an opponent with caller-supplied criteria
    pub async fn find_match_with(
        &self,
        player_id: PlayerId,
        criteria: MatchCriteria,
    ) -> Result<MatchOutcome> {
        let started = Instant::now();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let outcome = self
            .finder
            .find_match(player_id, criteria, &mut state.queue, &mut state.rng)
            .await?;

        state.stats.players_waiting = state.queue.size();
        let strategy = match &outcome {
            MatchOutcome::Matched(result) => {
                match result.strategy {
                    MatchStrategy::WinProbability => state.stats.probability_matches += 1,
                    MatchStrategy::RatingFallback => state.stats.fallback_matches += 1,
                }
                Some(result.strategy)
            }
            MatchOutcome::NoMatchAvailable { reason } => {
                info!("No match available for player {}: {}", player_id, reason);
                state.stats.unmatched_requests += 1;
                None
            }
        };

        let duration = started.elapsed();
        self.metrics.record_find_match(strategy, duration);
        info!(
            "Find-match completed - player: {}, result: {}, duration: {:.2}ms",
            player_id,
            strategy.map_or("none", |s| s.as_str()),
            duration.as_secs_f64() * 1000.0
        );

        Ok(outcome)
    }

    pub async fn stats(&self) -> MatchmakerStats {
        self.state.lock().await.stats.clone()
    }

    pub fn directory(&self) -> &Arc<dyn PlayerDirectory> {
        &self.directory
    }

    pub fn config(&self) -> &MatchingConfig {
        self.finder.config()
    }

    pub fn oracle(&self) -> &Arc<dyn OutcomeOracle> {
        self.finder.oracle()
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryPlayerDirectory;
    use crate::oracle::EloOracle;
    use crate::types::PlayerRecord;

    fn record(id: i64, rating: f64) -> PlayerRecord {
        PlayerRecord {
            profile_id: id,
            name: format!("player{}", id),
            rating,
            win_rate: 0.5,
            games_count: 40,
            wins_count: 20,
            cluster: 1,
            rank_level: String::new(),
            rank_level_encoded: 3.0,
            avg_mmr_diff_10: 0.0,
            avg_mmr_diff_50: 0.0,
            avg_mmr: rating,
            avg_opp_mmr: rating,
            avg_game_length: 1400.0,
            rank: None,
            country: None,
            last_game_at: None,
            common_civ: None,
        }
    }

    fn matchmaker(records: Vec<PlayerRecord>, config: MatchingConfig) -> Result<Matchmaker> {
        let directory = Arc::new(InMemoryPlayerDirectory::from_records(records)?);
        Matchmaker::new(directory, Arc::new(EloOracle::new()), config)
    }

    #[test]
    fn test_empty_directory_fails_loudly() {
        let error = matchmaker(vec![], MatchingConfig::default()).err().unwrap();
        assert!(matches!(
            MatchmakingError::find(&error),
            Some(MatchmakingError::NotInitialized { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MatchingConfig {
            criteria: MatchCriteria::new(2.0, 0.1),
            ..MatchingConfig::default()
        };
        assert!(matchmaker(vec![record(1, 1500.0)], config).is_err());
    }

    #[tokio::test]
    async fn test_seeded_queue() {
        let config = MatchingConfig {
            seed_queue_with_directory: true,
            ..MatchingConfig::default()
        };
        let mm = matchmaker(vec![record(2, 1500.0), record(1, 1500.0)], config).unwrap();

        assert_eq!(mm.queue_size().await, 2);
        assert_eq!(mm.stats().await.players_waiting, 2);
    }

    #[tokio::test]
    async fn test_stats_track_operations() {
        let mm = matchmaker(
            vec![record(1, 1500.0), record(2, 1505.0), record(3, 1490.0)],
            MatchingConfig::default(),
        )
        .unwrap()
        .with_rng_seed(11);

        mm.enqueue(1).await.unwrap();
        mm.enqueue(2).await.unwrap();
        mm.enqueue(3).await.unwrap();
        mm.dequeue(3).await.unwrap();

        let outcome = mm.find_match(1).await.unwrap();
        let result = outcome.as_match().unwrap();
        assert_eq!(result.opponent.profile_id, 2);
        assert_eq!(result.strategy, MatchStrategy::WinProbability);

        let stats = mm.stats().await;
        assert_eq!(stats.players_enqueued, 3);
        assert_eq!(stats.players_dequeued, 1);
        assert_eq!(stats.probability_matches, 1);
        assert_eq!(stats.total_matches(), 1);
        assert_eq!(stats.players_waiting, 0);

        let metrics = mm.metrics();
        assert_eq!(metrics.queue().queue_size.get(), 0);
        assert_eq!(
            metrics
                .queue()
                .players_dequeued_total
                .with_label_values(&["matched"])
                .get(),
            2
        );
    }

    #[tokio::test]
    async fn test_no_match_counted() {
        let mm = matchmaker(
            vec![record(1, 1500.0), record(2, 1500.0)],
            MatchingConfig::default(),
        )
        .unwrap();
        mm.enqueue(1).await.unwrap();

        let outcome = mm.find_match(1).await.unwrap();
        assert!(!outcome.is_matched());
        assert_eq!(mm.stats().await.unmatched_requests, 1);
        assert_eq!(mm.queue_size().await, 1);
    }

    #[tokio::test]
    async fn test_predict_unknown_player() {
        let mm = matchmaker(vec![record(1, 1500.0)], MatchingConfig::default()).unwrap();
        let error = mm.predict(1, 99).await.unwrap_err();
        assert_eq!(
            MatchmakingError::find(&error),
            Some(&MatchmakingError::UnknownPlayer { player_id: 99 })
        );
    }
}
