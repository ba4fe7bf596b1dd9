//! Service layer for the duel-parlor matchmaking service
//!
//! This module contains the application state, health checks and the HTTP
//! surface of the production service.

pub mod api;
pub mod app;
pub mod health;
pub mod http;

pub use api::{ApiError, ApiResponse};
pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
pub use http::{create_router, serve};
