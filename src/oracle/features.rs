//! Match feature extraction
//!
//! The feature order is a contract with whatever model sits behind the oracle.
//! Reordering or renaming a field is a breaking change and must bump
//! [`FEATURE_SCHEMA_VERSION`].

use crate::types::PlayerRecord;
use serde::Serialize;

/// Version of the feature layout below
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Number of features contributed by each player
pub const FEATURES_PER_PLAYER: usize = 10;

/// Total length of a match feature vector
pub const MATCH_FEATURE_COUNT: usize = FEATURES_PER_PLAYER * 2;

/// Per-player feature names, in vector order
pub const FEATURE_NAMES: [&str; FEATURES_PER_PLAYER] = [
    "rating",
    "win_rate",
    "games_count",
    "wins_count",
    "rank_level_encoded",
    "avg_mmr_diff_10",
    "avg_mmr_diff_50",
    "avg_mmr",
    "avg_opp_mmr",
    "avg_game_length",
];

/// Index of the rating feature inside one player's block
pub const RATING_FEATURE: usize = 0;

/// Feature vector for "player A against player B", A's block first
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchFeatures {
    values: [f64; MATCH_FEATURE_COUNT],
}

impl MatchFeatures {
    /// Extract the vector for `a` playing `b`
    pub fn extract(a: &PlayerRecord, b: &PlayerRecord) -> Self {
        let mut values = [0.0; MATCH_FEATURE_COUNT];
        values[..FEATURES_PER_PLAYER].copy_from_slice(&player_features(a));
        values[FEATURES_PER_PLAYER..].copy_from_slice(&player_features(b));
        Self { values }
    }

    pub fn from_values(values: [f64; MATCH_FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Player A's block
    pub fn player_a(&self) -> &[f64] {
        &self.values[..FEATURES_PER_PLAYER]
    }

    /// Player B's block
    pub fn player_b(&self) -> &[f64] {
        &self.values[FEATURES_PER_PLAYER..]
    }

    pub fn rating_a(&self) -> f64 {
        self.player_a()[RATING_FEATURE]
    }

    pub fn rating_b(&self) -> f64 {
        self.player_b()[RATING_FEATURE]
    }
}

fn player_features(player: &PlayerRecord) -> [f64; FEATURES_PER_PLAYER] {
    [
        player.rating,
        player.win_rate,
        f64::from(player.games_count),
        f64::from(player.wins_count),
        player.rank_level_encoded,
        player.avg_mmr_diff_10,
        player.avg_mmr_diff_50,
        player.avg_mmr,
        player.avg_opp_mmr,
        player.avg_game_length,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: i64, base: f64) -> PlayerRecord {
        PlayerRecord {
            profile_id: id,
            name: format!("p{}", id),
            rating: base,
            win_rate: base + 1.0,
            games_count: (base + 2.0) as u32,
            wins_count: (base + 3.0) as u32,
            cluster: 0,
            rank_level: String::new(),
            rank_level_encoded: base + 4.0,
            avg_mmr_diff_10: base + 5.0,
            avg_mmr_diff_50: base + 6.0,
            avg_mmr: base + 7.0,
            avg_opp_mmr: base + 8.0,
            avg_game_length: base + 9.0,
            rank: None,
            country: None,
            last_game_at: None,
            common_civ: None,
        }
    }

    #[test]
    fn test_feature_order() {
        let features = MatchFeatures::extract(&player(1, 100.0), &player(2, 200.0));

        let expected_a: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let expected_b: Vec<f64> = (0..10).map(|i| 200.0 + i as f64).collect();
        assert_eq!(features.player_a(), expected_a.as_slice());
        assert_eq!(features.player_b(), expected_b.as_slice());
        assert_eq!(features.as_slice().len(), MATCH_FEATURE_COUNT);
    }

    #[test]
    fn test_ratings() {
        let features = MatchFeatures::extract(&player(1, 1500.0), &player(2, 1320.0));
        assert_eq!(features.rating_a(), 1500.0);
        assert_eq!(features.rating_b(), 1320.0);

        let swapped = MatchFeatures::extract(&player(2, 1320.0), &player(1, 1500.0));
        assert_eq!(swapped.rating_a(), 1320.0);
        assert_eq!(swapped.player_b(), features.player_a());
    }

    #[test]
    fn test_feature_names_match_layout() {
        assert_eq!(FEATURE_NAMES.len(), FEATURES_PER_PLAYER);
        assert_eq!(FEATURE_NAMES[RATING_FEATURE], "rating");
    }
}
