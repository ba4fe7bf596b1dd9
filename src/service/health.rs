//! Health check endpoints and monitoring
//!
//! This module provides health check functionality for the duel-parlor
//! matchmaking service, including readiness and liveness probes.

use crate::directory::PlayerDirectory;
use crate::service::app::AppState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Gauge value exported to Prometheus
    pub fn as_gauge(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }

    /// Worst of two statuses
    fn combine(self, other: HealthStatus) -> HealthStatus {
        if self.as_gauge() <= other.as_gauge() {
            self
        } else {
            other
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Optional error message if not healthy
    pub message: Option<String>,
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    pub players_known: usize,
    pub players_waiting: usize,
    pub probability_matches: u64,
    pub fallback_matches: u64,
    pub unmatched_requests: u64,
    pub oracle_model: String,
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Perform a full health check of the service
    pub async fn check(app_state: Arc<AppState>) -> Self {
        let mut checks = Vec::new();

        checks.push(Self::check_service_running(&app_state).await);
        checks.push(Self::check_directory(&app_state));
        checks.push(Self::check_oracle(&app_state).await);

        let status = checks
            .iter()
            .fold(HealthStatus::Healthy, |acc, check| acc.combine(check.status));

        let stats = Self::gather_service_stats(&app_state).await;
        app_state.metrics().update_health_status(status.as_gauge());

        HealthCheck {
            status,
            service: app_state.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        }
    }

    /// Liveness: the service is running
    pub async fn liveness_check(app_state: Arc<AppState>) -> HealthStatus {
        if app_state.is_running().await {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    /// Readiness: running and holding player data
    pub async fn readiness_check(app_state: Arc<AppState>) -> HealthStatus {
        if !app_state.is_running().await {
            return HealthStatus::Unhealthy;
        }
        Self::check_directory(&app_state).status
    }

    async fn check_service_running(app_state: &AppState) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = if app_state.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn check_directory(app_state: &AppState) -> ComponentCheck {
        let start = Instant::now();
        let players = app_state.matchmaker().directory().len();

        let (status, message) = match players {
            0 => (
                HealthStatus::Unhealthy,
                Some("Player directory is empty".to_string()),
            ),
            1 => (
                HealthStatus::Degraded,
                Some("Only one player known; no opponents possible".to_string()),
            ),
            _ => (HealthStatus::Healthy, None),
        };

        ComponentCheck {
            name: "player_directory".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Probe the oracle with the first two known players
    async fn check_oracle(app_state: &AppState) -> ComponentCheck {
        let start = Instant::now();
        let matchmaker = app_state.matchmaker();
        let ids = matchmaker.directory().all_player_ids();

        let (status, message) = match (ids.first(), ids.get(1)) {
            (Some(&a), Some(&b)) => match matchmaker.predict(a, b).await {
                Ok(_) => (HealthStatus::Healthy, None),
                Err(e) => {
                    warn!("Oracle health probe failed: {}", e);
                    (HealthStatus::Degraded, Some(format!("Probe failed: {}", e)))
                }
            },
            _ => (
                HealthStatus::Degraded,
                Some("Not enough players to probe the oracle".to_string()),
            ),
        };

        ComponentCheck {
            name: "outcome_oracle".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn gather_service_stats(app_state: &AppState) -> ServiceStats {
        let matchmaker = app_state.matchmaker();
        let stats = matchmaker.stats().await;

        let uptime = app_state.uptime();
        app_state.metrics().set_uptime(uptime);
        app_state.metrics().update_from_stats(&stats);

        ServiceStats {
            players_known: matchmaker.directory().len(),
            players_waiting: stats.players_waiting,
            probability_matches: stats.probability_matches,
            fallback_matches: stats.fallback_matches,
            unmatched_requests: stats.unmatched_requests,
            oracle_model: matchmaker.oracle().model_version(),
            uptime_seconds: uptime.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_keeps_worst() {
        assert_eq!(
            HealthStatus::Healthy.combine(HealthStatus::Degraded),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::Unhealthy.combine(HealthStatus::Degraded),
            HealthStatus::Unhealthy
        );
        assert_eq!(
            HealthStatus::Healthy.combine(HealthStatus::Healthy),
            HealthStatus::Healthy
        );
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&HealthStatus::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
        assert_eq!(HealthStatus::Unhealthy.to_string(), "unhealthy");
    }
}
