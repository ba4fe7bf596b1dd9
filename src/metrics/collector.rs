//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the duel-parlor matchmaking
//! service using Prometheus metrics.

use crate::matchmaking::engine::MatchmakerStats;
use crate::types::MatchStrategy;
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a single oracle call, used as a metric label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleCallStatus {
    Success,
    Error,
    Timeout,
    Invalid,
}

impl OracleCallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OracleCallStatus::Success => "success",
            OracleCallStatus::Error => "error",
            OracleCallStatus::Timeout => "timeout",
            OracleCallStatus::Invalid => "invalid",
        }
    }
}

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Queue-related metrics
    queue_metrics: QueueMetrics,

    /// Match search metrics
    match_metrics: MatchMetrics,

    /// Oracle metrics
    oracle_metrics: OracleMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Players known to the directory
    pub directory_players: IntGauge,
}

/// Queue-related metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Players currently waiting
    pub queue_size: IntGauge,

    /// Total successful enqueues
    pub players_enqueued_total: IntCounter,

    /// Total removals by reason (manual, matched)
    pub players_dequeued_total: IntCounterVec,
}

/// Match search metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Find-match requests by result (win_probability, rating_fallback, none)
    pub matches_total: IntCounterVec,

    /// Time spent in a full find-match transaction
    pub find_match_duration: Histogram,

    /// Deviation from target of accepted probability matches
    pub probability_deviation: Histogram,
}

/// Oracle metrics
#[derive(Clone)]
pub struct OracleMetrics {
    /// Oracle calls by status
    pub calls_total: IntCounterVec,

    /// Oracle call latency
    pub call_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let queue_metrics = QueueMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;
        let oracle_metrics = OracleMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            queue_metrics,
            match_metrics,
            oracle_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    pub fn oracle(&self) -> &OracleMetrics {
        &self.oracle_metrics
    }

    /// Update gauges from matchmaker stats
    pub fn update_from_stats(&self, stats: &MatchmakerStats) {
        self.queue_metrics.queue_size.set(stats.players_waiting as i64);
    }

    /// Record a player joining the queue
    pub fn record_enqueue(&self) {
        self.queue_metrics.players_enqueued_total.inc();
    }

    /// Record a player leaving the queue
    pub fn record_dequeue(&self, reason: &str) {
        self.queue_metrics
            .players_dequeued_total
            .with_label_values(&[reason])
            .inc();
    }

    pub fn set_queue_size(&self, size: usize) {
        self.queue_metrics.queue_size.set(size as i64);
    }

    /// Record a completed find-match request
    pub fn record_find_match(&self, strategy: Option<MatchStrategy>, duration: Duration) {
        let label = strategy.map_or("none", |s| s.as_str());

        self.match_metrics
            .matches_total
            .with_label_values(&[label])
            .inc();

        self.match_metrics
            .find_match_duration
            .observe(duration.as_secs_f64());
    }

    /// Record how far an accepted match was from the target probability
    pub fn record_match_deviation(&self, deviation: f64) {
        self.match_metrics.probability_deviation.observe(deviation);
    }

    /// Record one oracle call
    pub fn record_oracle_call(&self, status: OracleCallStatus, duration: Duration) {
        self.oracle_metrics
            .calls_total
            .with_label_values(&[status.as_str()])
            .inc();

        self.oracle_metrics
            .call_duration
            .observe(duration.as_secs_f64());
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    pub fn set_uptime(&self, uptime: Duration) {
        self.service_metrics.uptime_seconds.set(uptime.as_secs() as i64);
    }

    pub fn set_directory_players(&self, count: usize) {
        self.service_metrics.directory_players.set(count as i64);
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("duel_parlor_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "duel_parlor_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let directory_players = IntGauge::new(
            "duel_parlor_directory_players",
            "Players known to the directory",
        )?;
        registry.register(Box::new(directory_players.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            directory_players,
        })
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let queue_size = IntGauge::new("duel_parlor_queue_size", "Players currently waiting")?;
        registry.register(Box::new(queue_size.clone()))?;

        let players_enqueued_total = IntCounter::new(
            "duel_parlor_players_enqueued_total",
            "Total players added to the queue",
        )?;
        registry.register(Box::new(players_enqueued_total.clone()))?;

        let players_dequeued_total = IntCounterVec::new(
            Opts::new(
                "duel_parlor_players_dequeued_total",
                "Total players removed from the queue",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(players_dequeued_total.clone()))?;

        Ok(Self {
            queue_size,
            players_enqueued_total,
            players_dequeued_total,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let matches_total = IntCounterVec::new(
            Opts::new(
                "duel_parlor_matches_total",
                "Find-match requests by selection strategy",
            ),
            &["strategy"],
        )?;
        registry.register(Box::new(matches_total.clone()))?;

        let find_match_duration = Histogram::with_opts(
            HistogramOpts::new(
                "duel_parlor_find_match_duration_seconds",
                "Time spent finding a match",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(find_match_duration.clone()))?;

        let probability_deviation = Histogram::with_opts(
            HistogramOpts::new(
                "duel_parlor_match_probability_deviation",
                "Deviation from the target win probability of accepted matches",
            )
            .buckets(vec![0.01, 0.02, 0.05, 0.1, 0.2, 0.5]),
        )?;
        registry.register(Box::new(probability_deviation.clone()))?;

        Ok(Self {
            matches_total,
            find_match_duration,
            probability_deviation,
        })
    }
}

impl OracleMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let calls_total = IntCounterVec::new(
            Opts::new("duel_parlor_oracle_calls_total", "Outcome oracle calls"),
            &["status"],
        )?;
        registry.register(Box::new(calls_total.clone()))?;

        let call_duration = Histogram::with_opts(
            HistogramOpts::new(
                "duel_parlor_oracle_call_duration_seconds",
                "Outcome oracle call latency",
            )
            .buckets(vec![0.0001, 0.001, 0.01, 0.1, 1.0, 5.0]),
        )?;
        registry.register(Box::new(call_duration.clone()))?;

        Ok(Self {
            calls_total,
            call_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().unwrap();
        assert_eq!(collector.queue().queue_size.get(), 0);
    }

    #[test]
    fn test_independent_registries() {
        // Each collector owns its registry, so names never collide
        let first = MetricsCollector::new().unwrap();
        let second = MetricsCollector::new().unwrap();
        first.record_enqueue();
        assert_eq!(first.queue().players_enqueued_total.get(), 1);
        assert_eq!(second.queue().players_enqueued_total.get(), 0);
    }

    #[test]
    fn test_record_find_match() {
        let collector = MetricsCollector::new().unwrap();
        collector.record_find_match(Some(MatchStrategy::WinProbability), Duration::from_millis(3));
        collector.record_find_match(Some(MatchStrategy::WinProbability), Duration::from_millis(4));
        collector.record_find_match(None, Duration::from_millis(1));

        let matches = &collector.matches().matches_total;
        assert_eq!(matches.with_label_values(&["win_probability"]).get(), 2);
        assert_eq!(matches.with_label_values(&["rating_fallback"]).get(), 0);
        assert_eq!(matches.with_label_values(&["none"]).get(), 1);
        assert_eq!(collector.matches().find_match_duration.get_sample_count(), 3);
    }

    #[test]
    fn test_record_oracle_call() {
        let collector = MetricsCollector::new().unwrap();
        collector.record_oracle_call(OracleCallStatus::Timeout, Duration::from_millis(20));
        collector.record_oracle_call(OracleCallStatus::Success, Duration::from_micros(5));

        let calls = &collector.oracle().calls_total;
        assert_eq!(calls.with_label_values(&["timeout"]).get(), 1);
        assert_eq!(calls.with_label_values(&["success"]).get(), 1);
    }

    #[test]
    fn test_gather_text() {
        let collector = MetricsCollector::new().unwrap();
        collector.set_queue_size(4);
        collector.record_dequeue("manual");

        let text = collector.gather_text().unwrap();
        assert!(text.contains("duel_parlor_queue_size 4"));
        assert!(text.contains("duel_parlor_players_dequeued_total{reason=\"manual\"} 1"));
    }
}
