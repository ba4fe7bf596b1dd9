//! Test fixtures shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use duel_parlor::config::AppConfig;
use duel_parlor::directory::InMemoryPlayerDirectory;
use duel_parlor::error::Result;
use duel_parlor::matchmaking::{Matchmaker, MatchingConfig};
use duel_parlor::oracle::{MatchFeatures, OutcomeOracle};
use duel_parlor::service::AppState;
use duel_parlor::types::{PlayerId, PlayerRecord, SkillCluster};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Player record with neutral statistics
pub fn player(id: PlayerId, cluster: SkillCluster, rating: f64) -> PlayerRecord {
    PlayerRecord {
        profile_id: id,
        name: format!("Player{}", id),
        rating,
        win_rate: 0.5,
        games_count: 100,
        wins_count: 50,
        cluster,
        rank_level: "gold".to_string(),
        rank_level_encoded: 4.0,
        avg_mmr_diff_10: 0.0,
        avg_mmr_diff_50: 0.0,
        avg_mmr: rating,
        avg_opp_mmr: rating,
        avg_game_length: 1500.0,
        rank: None,
        country: None,
        last_game_at: None,
        common_civ: None,
    }
}

pub fn directory(records: Vec<PlayerRecord>) -> Arc<InMemoryPlayerDirectory> {
    Arc::new(InMemoryPlayerDirectory::from_records(records).expect("valid fixture records"))
}

/// Oracle answering from a table keyed by the opponent's rating
///
/// Unlisted ratings fail, which the engine treats as an unavailable oracle.
pub struct ScriptedOracle {
    by_opponent_rating: HashMap<u64, f64>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new(table: &[(f64, f64)]) -> Self {
        Self {
            by_opponent_rating: table
                .iter()
                .map(|(rating, p)| (rating.to_bits(), *p))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutcomeOracle for ScriptedOracle {
    async fn win_probability(&self, features: &MatchFeatures) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rating = features.rating_b();
        self.by_opponent_rating
            .get(&rating.to_bits())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no scripted probability for rating {}", rating))
    }

    fn model_version(&self) -> String {
        "scripted".to_string()
    }
}

/// Oracle that always fails
pub struct BrokenOracle;

#[async_trait]
impl OutcomeOracle for BrokenOracle {
    async fn win_probability(&self, _features: &MatchFeatures) -> Result<f64> {
        Err(anyhow::anyhow!("model backend offline"))
    }

    fn model_version(&self) -> String {
        "broken".to_string()
    }
}

pub fn matchmaker(
    records: Vec<PlayerRecord>,
    oracle: Arc<dyn OutcomeOracle>,
    seed: u64,
) -> Matchmaker {
    Matchmaker::new(directory(records), oracle, MatchingConfig::default())
        .expect("matchmaker from fixtures")
        .with_rng_seed(seed)
}

/// Running application state over the given players
pub async fn app_state(records: Vec<PlayerRecord>, oracle: Arc<dyn OutcomeOracle>) -> Arc<AppState> {
    let state = AppState::from_parts(AppConfig::default(), Arc::new(matchmaker(records, oracle, 7)));
    state.start().await;
    Arc::new(state)
}

/// Ten players in two clusters with ratings spread 100 apart
pub fn ladder() -> Vec<PlayerRecord> {
    (1..=10)
        .map(|id| player(id, if id <= 5 { 1 } else { 2 }, 1000.0 + 100.0 * id as f64))
        .collect()
}
