//! Main application state and service coordination
//!
//! This module wires configuration, the player directory, the outcome oracle
//! and the matchmaker together for the production service.

use crate::config::{AppConfig, OracleKind, OracleSettings};
use crate::directory::{InMemoryPlayerDirectory, PlayerDirectory};
use crate::matchmaking::Matchmaker;
use crate::metrics::MetricsCollector;
use crate::oracle::{EloOracle, LogisticOracle, OutcomeOracle};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Data loading error: {message}")]
    DataLoading { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,
    matchmaker: Arc<Matchmaker>,
    metrics: Arc<MetricsCollector>,
    started_at: Instant,
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Load player data and the oracle, then build the matchmaker
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing duel-parlor matchmaking service");
        info!(
            "Configuration: service={}, players={}, oracle={}",
            config.service.name,
            config.data.players_path.display(),
            config.oracle.kind
        );

        let directory = Self::load_directory(&config)?;
        let oracle = Self::build_oracle(&config.oracle)?;

        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let matchmaker = Matchmaker::with_metrics(
            directory,
            oracle,
            config.matching_config(),
            metrics.clone(),
        )
        .map_err(|e| ServiceError::Initialization {
            message: format!("Failed to initialize matchmaker: {}", e),
        })?;

        Ok(Self::from_parts(config, Arc::new(matchmaker)))
    }

    /// Assemble state around an existing matchmaker
    pub fn from_parts(config: AppConfig, matchmaker: Arc<Matchmaker>) -> Self {
        let metrics = matchmaker.metrics().clone();
        Self {
            config,
            matchmaker,
            metrics,
            started_at: Instant::now(),
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    /// Mark the service as accepting requests
    pub async fn start(&self) {
        *self.is_running.write().await = true;
        self.metrics.update_health_status(2);
        info!("✅ Duel-parlor matchmaking service started");
    }

    /// Stop accepting requests and log final statistics
    pub async fn shutdown(&self) {
        info!("Starting graceful shutdown of duel-parlor service");
        *self.is_running.write().await = false;
        self.metrics.update_health_status(0);

        let final_stats = self.matchmaker.stats().await;
        info!("Final service statistics: {:?}", final_stats);
        info!("✅ Duel-parlor service shutdown completed");
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn matchmaker(&self) -> Arc<Matchmaker> {
        self.matchmaker.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Time since the state was created
    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    fn load_directory(config: &AppConfig) -> Result<Arc<dyn PlayerDirectory>, ServiceError> {
        let path = &config.data.players_path;
        info!("Loading player directory from {}", path.display());

        let directory =
            InMemoryPlayerDirectory::from_json_file(path).map_err(|e| ServiceError::DataLoading {
                message: format!("{:#}", e),
            })?;

        if directory.is_empty() {
            warn!("Player file {} contains no players", path.display());
        }

        Ok(Arc::new(directory))
    }

    /// Build the configured outcome oracle
    pub fn build_oracle(
        settings: &OracleSettings,
    ) -> Result<Arc<dyn OutcomeOracle>, ServiceError> {
        let oracle: Arc<dyn OutcomeOracle> = match settings.kind {
            OracleKind::Elo => Arc::new(EloOracle::new()),
            OracleKind::Logistic => {
                let path =
                    settings
                        .model_path
                        .as_ref()
                        .ok_or_else(|| ServiceError::Configuration {
                            message: "Logistic oracle requires a model path".to_string(),
                        })?;

                Arc::new(LogisticOracle::from_json_file(path).map_err(|e| {
                    ServiceError::DataLoading {
                        message: format!("{:#}", e),
                    }
                })?)
            }
        };

        info!("Outcome oracle ready: {}", oracle.model_version());
        Ok(oracle)
    }
}
