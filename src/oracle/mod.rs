//! Outcome oracle integration
//!
//! The oracle answers one question: given two players' features, how likely is
//! the first to win? The matchmaker treats it as opaque. Two implementations
//! ship with the service: an Elo expectation over the rating features and a
//! logistic model loaded from exported coefficients.

pub mod elo;
pub mod features;
pub mod logistic;

use crate::error::Result;
use async_trait::async_trait;

// Re-export commonly used types
pub use elo::EloOracle;
pub use features::{MatchFeatures, FEATURE_NAMES, FEATURE_SCHEMA_VERSION, MATCH_FEATURE_COUNT};
pub use logistic::{LogisticModel, LogisticOracle};

/// Trait for win-probability predictors
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutcomeOracle: Send + Sync {
    /// Probability in `[0, 1]` that player A beats player B
    async fn win_probability(&self, features: &MatchFeatures) -> Result<f64>;

    /// Human-readable model identifier for logs and health output
    fn model_version(&self) -> String;
}
