//! Rating-only oracle backed by the Elo expected score
//!
//! Used when no trained model is configured. It looks at nothing but the two
//! rating features, so it is a coarse but fully deterministic predictor.

use crate::error::Result;
use crate::oracle::features::MatchFeatures;
use crate::oracle::OutcomeOracle;
use async_trait::async_trait;
use skillratings::elo::{expected_score, EloRating};

#[derive(Debug, Clone, Default)]
pub struct EloOracle;

impl EloOracle {
    pub fn new() -> Self {
        Self
    }

    /// Expected score of `rating_a` against `rating_b`
    pub fn expected(&self, rating_a: f64, rating_b: f64) -> f64 {
        let (player_a, _player_b) = expected_score(
            &EloRating { rating: rating_a },
            &EloRating { rating: rating_b },
        );
        player_a
    }
}

#[async_trait]
impl OutcomeOracle for EloOracle {
    async fn win_probability(&self, features: &MatchFeatures) -> Result<f64> {
        Ok(self.expected(features.rating_a(), features.rating_b()))
    }

    fn model_version(&self) -> String {
        "elo-expected-score".to_string()
    }
}
