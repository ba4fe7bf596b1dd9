//! Common types used throughout the matchmaking service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for players
pub type PlayerId = i64;

/// Skill cluster label assigned to each player
pub type SkillCluster = i64;

/// Snapshot of one player's statistics, loaded once per session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub profile_id: PlayerId,
    pub name: String,
    pub rating: f64,
    pub win_rate: f64,
    pub games_count: u32,
    pub wins_count: u32,
    pub cluster: SkillCluster,
    #[serde(default)]
    pub rank_level: String,
    pub rank_level_encoded: f64,
    pub avg_mmr_diff_10: f64,
    pub avg_mmr_diff_50: f64,
    pub avg_mmr: f64,
    pub avg_opp_mmr: f64,
    pub avg_game_length: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_game_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_civ: Option<String>,
}

/// A player waiting in the matchmaking queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub player_id: PlayerId,
    pub enqueued_at: DateTime<Utc>,
}

/// How an opponent was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Predicted win probability fell inside the tolerance window
    WinProbability,
    /// No candidate qualified, paired by nearest rating
    RatingFallback,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::WinProbability => "win_probability",
            MatchStrategy::RatingFallback => "rating_fallback",
        }
    }
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A successful pairing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub requester: PlayerRecord,
    pub opponent: PlayerRecord,
    /// Probability the requester beats the opponent; absent on the rating fallback
    pub win_probability: Option<f64>,
    pub strategy: MatchStrategy,
    pub matched_at: DateTime<Utc>,
}

/// Result of a find-match request
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// An opponent was found and both players left the queue
    Matched(MatchResult),
    /// Nobody could be paired with the requester
    NoMatchAvailable { reason: String },
}

impl MatchOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }

    /// Borrow the match result, if any
    pub fn as_match(&self) -> Option<&MatchResult> {
        match self {
            MatchOutcome::Matched(result) => Some(result),
            MatchOutcome::NoMatchAvailable { .. } => None,
        }
    }
}

/// Desired fairness point and acceptable band for a single search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchCriteria {
    /// Desired win probability for the requester
    pub target: f64,
    /// Maximum absolute deviation from `target`
    pub tolerance: f64,
}

impl Default for MatchCriteria {
    fn default() -> Self {
        Self {
            target: 0.5,
            tolerance: 0.1,
        }
    }
}

impl MatchCriteria {
    pub fn new(target: f64, tolerance: f64) -> Self {
        Self { target, tolerance }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.target.is_finite() || !(0.0..=1.0).contains(&self.target) {
            return Err(crate::error::MatchmakingError::InvalidCriteria {
                reason: format!("target must be within [0, 1], got {}", self.target),
            }
            .into());
        }

        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(crate::error::MatchmakingError::InvalidCriteria {
                reason: format!("tolerance must be non-negative, got {}", self.tolerance),
            }
            .into());
        }

        Ok(())
    }
}
