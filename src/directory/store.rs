//! In-memory player directory
//!
//! Records are kept in a `BTreeMap` so every id listing comes back in ascending
//! identifier order, which the rating fallback relies on for its tie-break.

use crate::directory::paging::{paginate, PagedQuery, PagedResult};
use crate::directory::PlayerDirectory;
use crate::error::{MatchmakingError, Result};
use crate::types::{PlayerId, PlayerRecord, SkillCluster};
use anyhow::Context;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

/// Directory snapshot held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlayerDirectory {
    players: BTreeMap<PlayerId, PlayerRecord>,
    clusters: HashMap<SkillCluster, Vec<PlayerId>>,
}

impl InMemoryPlayerDirectory {
    /// Build a directory from records, rejecting duplicate ids and unusable ratings
    pub fn from_records(records: Vec<PlayerRecord>) -> Result<Self> {
        let mut players = BTreeMap::new();

        for record in records {
            if !record.rating.is_finite() {
                return Err(MatchmakingError::ConfigurationError {
                    message: format!(
                        "Player {} has a non-finite rating",
                        record.profile_id
                    ),
                }
                .into());
            }

            let player_id = record.profile_id;
            if players.insert(player_id, record).is_some() {
                return Err(MatchmakingError::ConfigurationError {
                    message: format!("Duplicate player id {} in player data", player_id),
                }
                .into());
            }
        }

        let mut clusters: HashMap<SkillCluster, Vec<PlayerId>> = HashMap::new();
        for (player_id, record) in &players {
            clusters.entry(record.cluster).or_default().push(*player_id);
        }

        Ok(Self { players, clusters })
    }

    /// Parse a JSON array of player records
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<PlayerRecord> =
            serde_json::from_str(json).context("Failed to parse player data")?;
        Self::from_records(records)
    }

    /// Load a JSON array of player records from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read player data from {}", path.display()))?;

        let directory = Self::from_json_str(&contents)
            .with_context(|| format!("Invalid player data in {}", path.display()))?;

        info!(
            "Loaded {} players in {} clusters from {}",
            directory.len(),
            directory.cluster_count(),
            path.display()
        );
        Ok(directory)
    }

    /// Number of distinct skill clusters
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Iterate records in ascending id order
    pub fn records(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }
}

impl PlayerDirectory for InMemoryPlayerDirectory {
    fn get_player(&self, player_id: PlayerId) -> Option<&PlayerRecord> {
        self.players.get(&player_id)
    }

    fn players_in_cluster(&self, cluster: SkillCluster) -> Vec<PlayerId> {
        self.clusters.get(&cluster).cloned().unwrap_or_default()
    }

    fn all_player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    fn len(&self) -> usize {
        self.players.len()
    }

    fn list_players(&self, query: &PagedQuery) -> Result<PagedResult<PlayerRecord>> {
        paginate(self.players.values(), query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_json(id: i64, cluster: i64, rating: f64) -> String {
        format!(
            r#"{{"profile_id": {id}, "name": "player{id}", "rating": {rating}, "win_rate": 0.5,
                "games_count": 10, "wins_count": 5, "cluster": {cluster}, "rank_level": "silver",
                "rank_level_encoded": 2.0, "avg_mmr_diff_10": 0.0, "avg_mmr_diff_50": 0.0,
                "avg_mmr": {rating}, "avg_opp_mmr": {rating}, "avg_game_length": 1200.0}}"#
        )
    }

    fn directory_json(players: &[(i64, i64, f64)]) -> String {
        let entries: Vec<String> = players
            .iter()
            .map(|(id, cluster, rating)| player_json(*id, *cluster, *rating))
            .collect();
        format!("[{}]", entries.join(","))
    }

    #[test]
    fn test_load_and_lookup() {
        let json = directory_json(&[(30, 1, 1500.0), (10, 2, 1400.0), (20, 1, 1600.0)]);
        let directory = InMemoryPlayerDirectory::from_json_str(&json).unwrap();

        assert_eq!(directory.len(), 3);
        assert_eq!(directory.cluster_count(), 2);
        assert_eq!(directory.get_player(10).unwrap().rating, 1400.0);
        assert!(directory.get_player(99).is_none());
        assert!(directory.contains(20));
        assert!(!directory.contains(21));
    }

    #[test]
    fn test_ids_are_sorted() {
        let json = directory_json(&[(30, 1, 1500.0), (10, 2, 1400.0), (20, 1, 1600.0)]);
        let directory = InMemoryPlayerDirectory::from_json_str(&json).unwrap();

        assert_eq!(directory.all_player_ids(), vec![10, 20, 30]);
        assert_eq!(directory.players_in_cluster(1), vec![20, 30]);
        assert_eq!(directory.players_in_cluster(2), vec![10]);
        assert!(directory.players_in_cluster(7).is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = directory_json(&[(1, 1, 1500.0), (1, 2, 1400.0)]);
        let error = InMemoryPlayerDirectory::from_json_str(&json).unwrap_err();
        assert!(matches!(
            MatchmakingError::find(&error),
            Some(MatchmakingError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(InMemoryPlayerDirectory::from_json_str("{not json").is_err());
        assert!(InMemoryPlayerDirectory::from_json_str(r#"[{"profile_id": 1}]"#).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = InMemoryPlayerDirectory::from_json_file("/definitely/not/here.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_directory() {
        let directory = InMemoryPlayerDirectory::from_json_str("[]").unwrap();
        assert!(directory.is_empty());
        assert!(directory.all_player_ids().is_empty());
    }

    #[test]
    fn test_list_players_through_trait() {
        let json = directory_json(&[(3, 1, 1500.0), (1, 2, 1400.0), (2, 1, 1600.0)]);
        let directory = InMemoryPlayerDirectory::from_json_str(&json).unwrap();
        let as_trait: &dyn PlayerDirectory = &directory;

        let page = as_trait
            .list_players(&PagedQuery {
                page_size: 2,
                ..PagedQuery::default()
            })
            .unwrap();
        let ids: Vec<_> = page.data.iter().map(|r| r.profile_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(page.items_count, 3);
    }
}
