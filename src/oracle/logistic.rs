//! Logistic-regression oracle loaded from exported coefficients
//!
//! The model file is JSON:
//!
//! ```json
//! {
//!   "version": "2024-06-ladder",
//!   "feature_schema_version": 1,
//!   "intercept": 0.02,
//!   "coefficients": [20 numbers],
//!   "feature_means": [20 numbers],
//!   "feature_scales": [20 numbers]
//! }
//! ```
//!
//! `feature_means` and `feature_scales` are optional; when present every
//! feature is standardised as `(x - mean) / scale` before weighting.

use crate::error::{MatchmakingError, Result};
use crate::oracle::features::{MatchFeatures, FEATURE_SCHEMA_VERSION, MATCH_FEATURE_COUNT};
use crate::oracle::OutcomeOracle;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Exported logistic model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub version: String,
    #[serde(default = "default_schema_version")]
    pub feature_schema_version: u32,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub feature_means: Option<Vec<f64>>,
    #[serde(default)]
    pub feature_scales: Option<Vec<f64>>,
}

fn default_schema_version() -> u32 {
    FEATURE_SCHEMA_VERSION
}

impl LogisticModel {
    /// Check the model fits the current feature layout
    pub fn validate(&self) -> Result<()> {
        if self.feature_schema_version != FEATURE_SCHEMA_VERSION {
            return Err(config_error(format!(
                "model '{}' was trained on feature schema v{}, service uses v{}",
                self.version, self.feature_schema_version, FEATURE_SCHEMA_VERSION
            )));
        }

        check_len("coefficients", self.coefficients.len())?;
        if !self.intercept.is_finite() || self.coefficients.iter().any(|w| !w.is_finite()) {
            return Err(config_error("model weights must be finite".to_string()));
        }

        if let Some(means) = &self.feature_means {
            check_len("feature_means", means.len())?;
        }

        if let Some(scales) = &self.feature_scales {
            check_len("feature_scales", scales.len())?;
            if scales.iter().any(|s| !s.is_finite() || *s == 0.0) {
                return Err(config_error(
                    "feature_scales must be finite and non-zero".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Linear score before the sigmoid
    fn logit(&self, features: &MatchFeatures) -> f64 {
        let mut z = self.intercept;
        for (i, (&x, &w)) in features
            .as_slice()
            .iter()
            .zip(self.coefficients.iter())
            .enumerate()
        {
            let mean = self.feature_means.as_ref().map_or(0.0, |m| m[i]);
            let scale = self.feature_scales.as_ref().map_or(1.0, |s| s[i]);
            z += w * (x - mean) / scale;
        }
        z
    }

    pub fn predict(&self, features: &MatchFeatures) -> f64 {
        sigmoid(self.logit(features))
    }
}

fn check_len(field: &str, len: usize) -> Result<()> {
    if len != MATCH_FEATURE_COUNT {
        return Err(config_error(format!(
            "{} has {} entries, expected {}",
            field, len, MATCH_FEATURE_COUNT
        )));
    }
    Ok(())
}

fn config_error(message: String) -> anyhow::Error {
    MatchmakingError::ConfigurationError { message }.into()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Oracle evaluating a [`LogisticModel`]
#[derive(Debug, Clone)]
pub struct LogisticOracle {
    model: LogisticModel,
}

impl LogisticOracle {
    pub fn new(model: LogisticModel) -> Result<Self> {
        model.validate()?;
        Ok(Self { model })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: LogisticModel =
            serde_json::from_str(json).context("Failed to parse logistic model")?;
        Self::new(model)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file {}", path.display()))?;
        let oracle = Self::from_json_str(&contents)
            .with_context(|| format!("Invalid model file {}", path.display()))?;

        info!(
            "Loaded logistic model '{}' from {}",
            oracle.model.version,
            path.display()
        );
        Ok(oracle)
    }

    pub fn model(&self) -> &LogisticModel {
        &self.model
    }
}

#[async_trait]
impl OutcomeOracle for LogisticOracle {
    async fn win_probability(&self, features: &MatchFeatures) -> Result<f64> {
        Ok(self.model.predict(features))
    }

    fn model_version(&self) -> String {
        format!("logistic:{}", self.model.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating_only_model() -> LogisticModel {
        let mut coefficients = vec![0.0; MATCH_FEATURE_COUNT];
        coefficients[0] = 0.01;
        coefficients[10] = -0.01;
        LogisticModel {
            version: "test".to_string(),
            feature_schema_version: FEATURE_SCHEMA_VERSION,
            intercept: 0.0,
            coefficients,
            feature_means: None,
            feature_scales: None,
        }
    }

    fn features(rating_a: f64, rating_b: f64) -> MatchFeatures {
        let mut values = [1.0; MATCH_FEATURE_COUNT];
        values[0] = rating_a;
        values[10] = rating_b;
        MatchFeatures::from_values(values)
    }

    #[tokio::test]
    async fn test_symmetric_weights_give_even_odds() {
        let oracle = LogisticOracle::new(rating_only_model()).unwrap();
        let p = oracle
            .win_probability(&features(1600.0, 1600.0))
            .await
            .unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_higher_rating_favoured() {
        let oracle = LogisticOracle::new(rating_only_model()).unwrap();
        let p = oracle
            .win_probability(&features(1700.0, 1600.0))
            .await
            .unwrap();
        // logit = 0.01 * 100 = 1
        assert!((p - 1.0 / (1.0 + (-1.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_standardisation() {
        let mut model = rating_only_model();
        model.feature_means = Some(vec![1600.0; MATCH_FEATURE_COUNT]);
        model.feature_scales = Some(vec![100.0; MATCH_FEATURE_COUNT]);
        model.coefficients[0] = 1.0;
        model.coefficients[10] = 0.0;
        model.validate().unwrap();

        // (1700 - 1600) / 100 = 1
        let p = model.predict(&features(1700.0, 0.0));
        assert!((p - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_coefficient_count_rejected() {
        let mut model = rating_only_model();
        model.coefficients.pop();
        assert!(LogisticOracle::new(model).is_err());
    }

    #[test]
    fn test_zero_scale_rejected() {
        let mut model = rating_only_model();
        let mut scales = vec![1.0; MATCH_FEATURE_COUNT];
        scales[3] = 0.0;
        model.feature_scales = Some(scales);
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let mut model = rating_only_model();
        model.feature_schema_version = FEATURE_SCHEMA_VERSION + 1;
        let error = model.validate().unwrap_err();
        assert!(matches!(
            MatchmakingError::find(&error),
            Some(MatchmakingError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_parse_from_json() {
        let json = serde_json::to_string(&rating_only_model()).unwrap();
        let oracle = LogisticOracle::from_json_str(&json).unwrap();
        assert_eq!(oracle.model_version(), "logistic:test");
    }

    #[test]
    fn test_sigmoid_extremes() {
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
        assert!(sigmoid(-1000.0).is_finite());
    }
}
