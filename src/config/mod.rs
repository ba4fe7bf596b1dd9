//! Configuration management for the duel-parlor service
//!
//! This module handles configuration loading from TOML files and environment
//! variables, validation, and default values for the matchmaking service.

pub mod app;

pub use app::{
    validate_config, AppConfig, DataSettings, MatchmakingSettings, OracleKind, OracleSettings,
    ServiceSettings,
};
