//! Opponent search for a single requester
//!
//! The search runs in two phases:
//! - score every waiting candidate with the outcome oracle and keep the one
//!   whose predicted win probability is closest to the target, provided it is
//!   inside the tolerance band
//! - if nobody qualifies, pair with the directory player whose rating is
//!   closest to the requester's
//!
//! Candidates are drawn from the requester's skill cluster when possible and
//! shuffled before scoring, so equal deviations are resolved by draw order.

use crate::directory::PlayerDirectory;
use crate::error::{MatchmakingError, Result};
use crate::matchmaking::queue::MatchmakingQueue;
use crate::metrics::collector::{MetricsCollector, OracleCallStatus};
use crate::oracle::{MatchFeatures, OutcomeOracle};
use crate::types::{
    MatchCriteria, MatchOutcome, MatchResult, MatchStrategy, PlayerId, PlayerRecord,
};
use crate::utils::{current_timestamp, probability_deviation, rating_difference, within_tolerance};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for opponent search behavior
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Criteria used when the caller does not supply its own
    pub criteria: MatchCriteria,
    /// Upper bound on a single oracle call
    pub oracle_timeout: Duration,
    /// Extra attempts per candidate after a failed oracle call
    pub oracle_retry_attempts: u32,
    /// Start with every directory player already waiting
    pub seed_queue_with_directory: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            criteria: MatchCriteria::default(),
            oracle_timeout: Duration::from_secs(2),
            oracle_retry_attempts: 1,
            seed_queue_with_directory: false,
        }
    }
}

impl MatchingConfig {
    pub fn validate(&self) -> Result<()> {
        self.criteria.validate()?;

        if self.oracle_timeout.is_zero() {
            return Err(MatchmakingError::ConfigurationError {
                message: "Oracle timeout must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Best qualifying candidate seen so far
#[derive(Debug, Clone, Copy)]
struct ScoredCandidate {
    player_id: PlayerId,
    probability: f64,
    deviation: f64,
}

/// Two-phase opponent search over a queue
pub struct MatchFinder {
    oracle: Arc<dyn OutcomeOracle>,
    config: MatchingConfig,
    metrics: Arc<MetricsCollector>,
}

impl MatchFinder {
    pub fn new(
        oracle: Arc<dyn OutcomeOracle>,
        config: MatchingConfig,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            oracle,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn oracle(&self) -> &Arc<dyn OutcomeOracle> {
        &self.oracle
    }

    /// Find an opponent for `requester_id` and remove both players from the queue
    ///
    /// Fails with `UnknownPlayer` before touching the queue. Returns
    /// `NoMatchAvailable` when nobody else is waiting or the directory holds no
    /// other player.
    pub async fn find_match(
        &self,
        requester_id: PlayerId,
        criteria: MatchCriteria,
        queue: &mut MatchmakingQueue,
        rng: &mut StdRng,
    ) -> Result<MatchOutcome> {
        criteria.validate()?;

        let directory = queue.directory().clone();
        let requester = directory
            .get_player(requester_id)
            .cloned()
            .ok_or(MatchmakingError::UnknownPlayer {
                player_id: requester_id,
            })?;

        info!(
            "Trying to match player '{}' (ID: {}) from cluster {}",
            requester.name, requester.profile_id, requester.cluster
        );

        let waiting: Vec<PlayerId> = queue
            .player_ids()
            .into_iter()
            .filter(|player_id| *player_id != requester_id)
            .collect();

        if waiting.is_empty() {
            info!("No other players waiting for player {}", requester_id);
            return Ok(MatchOutcome::NoMatchAvailable {
                reason: "no other players are waiting".to_string(),
            });
        }

        let mut candidates = narrow_to_cluster(directory.as_ref(), &requester, waiting);
        candidates.shuffle(rng);

        let (opponent, probability, strategy) = match self
            .best_probability_match(directory.as_ref(), &requester, &candidates, criteria)
            .await
        {
            Some(best) => {
                let opponent = directory
                    .get_player(best.player_id)
                    .cloned()
                    .ok_or(MatchmakingError::UnknownPlayer {
                        player_id: best.player_id,
                    })?;
                info!(
                    "Matched '{}' (ID: {}) with '{}' (ID: {}) by win probability {:.3} (deviation {:.3})",
                    requester.name,
                    requester.profile_id,
                    opponent.name,
                    opponent.profile_id,
                    best.probability,
                    best.deviation
                );
                (opponent, Some(best.probability), MatchStrategy::WinProbability)
            }
            None => {
                info!(
                    "No candidate within tolerance for '{}' (ID: {}), falling back to closest rating",
                    requester.name, requester.profile_id
                );
                match closest_rating_opponent(directory.as_ref(), &requester) {
                    Some(opponent) => {
                        info!(
                            "Matched '{}' (ID: {}) with '{}' (ID: {}) by rating ({:.0} vs {:.0})",
                            requester.name,
                            requester.profile_id,
                            opponent.name,
                            opponent.profile_id,
                            requester.rating,
                            opponent.rating
                        );
                        (opponent, None, MatchStrategy::RatingFallback)
                    }
                    // Queued ids are checked on enqueue, so only a directory whose
                    // listing disagrees with its lookups lands here.
                    None => {
                        warn!(
                            "Directory lists no opponent for player {} although others are waiting",
                            requester_id
                        );
                        return Ok(MatchOutcome::NoMatchAvailable {
                            reason: "no other players are known".to_string(),
                        })
                    }
                }
            }
        };

        for player_id in [requester.profile_id, opponent.profile_id] {
            match queue.dequeue(player_id) {
                Ok(_) => self.metrics.record_dequeue("matched"),
                // The fallback may pick a player who is not waiting, and the
                // requester does not have to be queued to ask for a match.
                Err(e) => warn!("Matched player {} was not removed from queue: {}", player_id, e),
            }
        }
        self.metrics.set_queue_size(queue.size());

        Ok(MatchOutcome::Matched(MatchResult {
            requester,
            opponent,
            win_probability: probability,
            strategy,
            matched_at: current_timestamp(),
        }))
    }

    /// Predict the probability that `player_a` beats `player_b`
    pub async fn predict(
        &self,
        directory: &dyn PlayerDirectory,
        player_a: PlayerId,
        player_b: PlayerId,
    ) -> Result<f64> {
        let a = directory
            .get_player(player_a)
            .ok_or(MatchmakingError::UnknownPlayer {
                player_id: player_a,
            })?;
        let b = directory
            .get_player(player_b)
            .ok_or(MatchmakingError::UnknownPlayer {
                player_id: player_b,
            })?;

        let probability = self.score(&MatchFeatures::extract(a, b)).await?;
        info!(
            "Predicted probability that {} (ID: {}) wins against {} (ID: {}): {:.4}",
            a.name, a.profile_id, b.name, b.profile_id, probability
        );
        Ok(probability)
    }

    /// Score every candidate and keep the smallest deviation inside the band
    async fn best_probability_match(
        &self,
        directory: &dyn PlayerDirectory,
        requester: &PlayerRecord,
        candidates: &[PlayerId],
        criteria: MatchCriteria,
    ) -> Option<ScoredCandidate> {
        let mut best: Option<ScoredCandidate> = None;

        for &candidate_id in candidates {
            let Some(candidate) = directory.get_player(candidate_id) else {
                warn!("Queued player {} missing from directory, skipping", candidate_id);
                continue;
            };

            let features = MatchFeatures::extract(requester, candidate);
            let probability = match self.score(&features).await {
                Ok(probability) => probability,
                Err(e) => {
                    warn!(
                        "Skipping candidate {} for player {}: {}",
                        candidate_id, requester.profile_id, e
                    );
                    continue;
                }
            };

            let deviation = probability_deviation(probability, criteria.target);
            debug!(
                "Candidate {} vs {}: p={:.4}, deviation={:.4}",
                requester.profile_id, candidate_id, probability, deviation
            );

            let improves = best.map_or(true, |current| deviation < current.deviation);
            if improves && within_tolerance(deviation, criteria.tolerance) {
                best = Some(ScoredCandidate {
                    player_id: candidate_id,
                    probability,
                    deviation,
                });
            }
        }

        if let Some(best) = &best {
            self.metrics.record_match_deviation(best.deviation);
        }
        best
    }

    /// Ask the oracle, retrying failed or timed-out calls
    async fn score(&self, features: &MatchFeatures) -> Result<f64> {
        let attempts = self.config.oracle_retry_attempts + 1;
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            let started = Instant::now();
            let outcome =
                tokio::time::timeout(self.config.oracle_timeout, self.oracle.win_probability(features))
                    .await;

            let (status, failure) = match outcome {
                Ok(Ok(p)) if p.is_finite() && (0.0..=1.0).contains(&p) => {
                    self.metrics
                        .record_oracle_call(OracleCallStatus::Success, started.elapsed());
                    return Ok(p);
                }
                Ok(Ok(p)) => (
                    OracleCallStatus::Invalid,
                    format!("oracle returned out-of-range probability {}", p),
                ),
                Ok(Err(e)) => (OracleCallStatus::Error, format!("oracle call failed: {}", e)),
                Err(_) => (
                    OracleCallStatus::Timeout,
                    format!(
                        "oracle call timed out after {}ms",
                        self.config.oracle_timeout.as_millis()
                    ),
                ),
            };

            self.metrics.record_oracle_call(status, started.elapsed());
            debug!("Oracle attempt {}/{} failed: {}", attempt, attempts, failure);
            last_failure = failure;
        }

        Err(MatchmakingError::OracleUnavailable {
            reason: last_failure,
        }
        .into())
    }
}

/// Keep candidates sharing the requester's cluster, or all of them if none do
fn narrow_to_cluster(
    directory: &dyn PlayerDirectory,
    requester: &PlayerRecord,
    waiting: Vec<PlayerId>,
) -> Vec<PlayerId> {
    let cluster: HashSet<PlayerId> = directory
        .players_in_cluster(requester.cluster)
        .into_iter()
        .collect();

    let same_cluster: Vec<PlayerId> = waiting
        .iter()
        .copied()
        .filter(|player_id| cluster.contains(player_id))
        .collect();

    if same_cluster.is_empty() {
        debug!(
            "No waiting players in cluster {}, widening to all {} candidates",
            requester.cluster,
            waiting.len()
        );
        waiting
    } else {
        same_cluster
    }
}

/// Directory player with the nearest rating, lowest id on ties
fn closest_rating_opponent(
    directory: &dyn PlayerDirectory,
    requester: &PlayerRecord,
) -> Option<PlayerRecord> {
    let mut best: Option<(&PlayerRecord, f64)> = None;

    // all_player_ids is ascending, so a strict comparison keeps the lowest id
    for player_id in directory.all_player_ids() {
        if player_id == requester.profile_id {
            continue;
        }
        let Some(candidate) = directory.get_player(player_id) else {
            continue;
        };

        let distance = rating_difference(candidate.rating, requester.rating);
        if best.map_or(true, |(_, best_distance)| distance < best_distance) {
            best = Some((candidate, distance));
        }
    }

    best.map(|(record, _)| record.clone())
}
