//! Metrics and monitoring for the duel-parlor matchmaking service
//!
//! This module provides Prometheus metrics collection for queue activity,
//! match searches and outcome oracle calls.

pub mod collector;

pub use collector::{
    MatchMetrics, MetricsCollector, OracleCallStatus, OracleMetrics, QueueMetrics, ServiceMetrics,
};
