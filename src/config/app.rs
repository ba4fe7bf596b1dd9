//! Main application configuration
//!
//! Configuration is read from a TOML file or from environment variables, with
//! every section falling back to its defaults when omitted.

use crate::matchmaking::MatchingConfig;
use crate::types::MatchCriteria;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub matchmaking: MatchmakingSettings,
    pub data: DataSettings,
    pub oracle: OracleSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Address the HTTP server binds to
    pub http_host: String,
    /// Port for the HTTP API, health and metrics endpoints
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// Desired win probability for the requester
    pub target_win_probability: f64,
    /// Accepted distance from the target
    pub tolerance: f64,
    /// Timeout for one oracle call in milliseconds
    pub oracle_timeout_ms: u64,
    /// Extra attempts after a failed oracle call
    pub oracle_retry_attempts: u32,
    /// Start with every known player waiting
    pub seed_queue_with_directory: bool,
}

/// Player data source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// JSON file holding the player directory
    pub players_path: PathBuf,
}

/// Which outcome oracle to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleKind {
    /// Elo expected score from the two ratings
    Elo,
    /// Logistic regression over the match features
    Logistic,
}

impl fmt::Display for OracleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleKind::Elo => write!(f, "elo"),
            OracleKind::Logistic => write!(f, "logistic"),
        }
    }
}

impl FromStr for OracleKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "elo" => Ok(OracleKind::Elo),
            "logistic" => Ok(OracleKind::Logistic),
            other => Err(anyhow!("Unknown oracle kind: {}", other)),
        }
    }
}

/// Outcome oracle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    pub kind: OracleKind,
    /// Model coefficients file, required for the logistic oracle
    pub model_path: Option<PathBuf>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "duel-parlor".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        let criteria = MatchCriteria::default();
        Self {
            target_win_probability: criteria.target,
            tolerance: criteria.tolerance,
            oracle_timeout_ms: 2000,
            oracle_retry_attempts: 1,
            seed_queue_with_directory: false,
        }
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            players_path: PathBuf::from("data/players.json"),
        }
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            kind: OracleKind::Elo,
            model_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            config.service.http_host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            config.service.http_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Matchmaking settings
        if let Ok(target) = env::var("TARGET_WIN_PROBABILITY") {
            config.matchmaking.target_win_probability = target
                .parse()
                .map_err(|_| anyhow!("Invalid TARGET_WIN_PROBABILITY value: {}", target))?;
        }
        if let Ok(tolerance) = env::var("MATCH_TOLERANCE") {
            config.matchmaking.tolerance = tolerance
                .parse()
                .map_err(|_| anyhow!("Invalid MATCH_TOLERANCE value: {}", tolerance))?;
        }
        if let Ok(timeout) = env::var("ORACLE_TIMEOUT_MS") {
            config.matchmaking.oracle_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid ORACLE_TIMEOUT_MS value: {}", timeout))?;
        }
        if let Ok(retries) = env::var("ORACLE_RETRY_ATTEMPTS") {
            config.matchmaking.oracle_retry_attempts = retries
                .parse()
                .map_err(|_| anyhow!("Invalid ORACLE_RETRY_ATTEMPTS value: {}", retries))?;
        }
        if let Ok(seed) = env::var("SEED_QUEUE_WITH_DIRECTORY") {
            config.matchmaking.seed_queue_with_directory = seed
                .parse()
                .map_err(|_| anyhow!("Invalid SEED_QUEUE_WITH_DIRECTORY value: {}", seed))?;
        }

        // Data and oracle
        if let Ok(path) = env::var("PLAYERS_PATH") {
            config.data.players_path = PathBuf::from(path);
        }
        if let Ok(kind) = env::var("ORACLE_KIND") {
            config.oracle.kind = kind.parse()?;
        }
        if let Ok(path) = env::var("ORACLE_MODEL_PATH") {
            config.oracle.model_path = Some(PathBuf::from(path));
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Socket address string for the HTTP server
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.service.http_host, self.service.http_port)
    }

    /// Engine configuration derived from the matchmaking section
    pub fn matching_config(&self) -> MatchingConfig {
        MatchingConfig {
            criteria: MatchCriteria {
                target: self.matchmaking.target_win_probability,
                tolerance: self.matchmaking.tolerance,
            },
            oracle_timeout: Duration::from_millis(self.matchmaking.oracle_timeout_ms),
            oracle_retry_attempts: self.matchmaking.oracle_retry_attempts,
            seed_queue_with_directory: self.matchmaking.seed_queue_with_directory,
        }
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Matchmaking criteria share the engine's validation
    config.matching_config().validate()?;

    if config.data.players_path.as_os_str().is_empty() {
        return Err(anyhow!("Players path cannot be empty"));
    }
    if config.oracle.kind == OracleKind::Logistic && config.oracle.model_path.is_none() {
        return Err(anyhow!("Logistic oracle requires a model path"));
    }

    Ok(())
}
