//! Main entry point for the duel-parlor matchmaking service
//!
//! Loads configuration, player data and the outcome oracle, then serves the
//! HTTP API until SIGINT or SIGTERM.

use anyhow::Result;
use clap::Parser;
use duel_parlor::config::{validate_config, AppConfig, OracleKind};
use duel_parlor::service::{serve, AppState, HealthCheck};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Duel Parlor - 1v1 matchmaking by predicted win probability
#[derive(Parser)]
#[command(
    name = "duel-parlor",
    version,
    about = "A 1v1 matchmaking service that pairs players by predicted win probability",
    long_about = "Duel Parlor keeps a queue of waiting players, scores candidate opponents with an \
                 outcome oracle (Elo expected score or a logistic model over player statistics) \
                 and pairs the requester with the opponent closest to the target win probability, \
                 falling back to the closest rating."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP port override
    #[arg(long, value_name = "PORT", help = "Override HTTP server port")]
    http_port: Option<u16>,

    /// Player data override
    #[arg(long, value_name = "FILE", help = "Override the player data JSON file")]
    players: Option<PathBuf>,

    /// Oracle model override
    #[arg(
        long,
        value_name = "FILE",
        help = "Use the logistic oracle with this model file"
    )]
    oracle_model: Option<PathBuf>,

    /// Target win probability override
    #[arg(long, value_name = "P", help = "Override the target win probability")]
    target: Option<f64>,

    /// Tolerance override
    #[arg(long, value_name = "T", help = "Override the accepted deviation from the target")]
    tolerance: Option<f64>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and data, then exit)
    #[arg(
        long,
        help = "Validate configuration and player data and exit without serving"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("Duel Parlor Matchmaking Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   HTTP: {}", config.http_addr());
    info!("   Players: {}", config.data.players_path.display());
    info!("   Oracle: {}", config.oracle.kind);
    info!(
        "   Target: {} +/- {}",
        config.matchmaking.target_win_probability, config.matchmaking.tolerance
    );
}

/// Load configuration and apply CLI overrides
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }
    if args.debug {
        config.service.log_level = "debug".to_string();
    }
    if let Some(http_port) = args.http_port {
        config.service.http_port = http_port;
    }
    if let Some(players) = &args.players {
        config.data.players_path = players.clone();
    }
    if let Some(model) = &args.oracle_model {
        config.oracle.kind = OracleKind::Logistic;
        config.oracle.model_path = Some(model.clone());
    }
    if let Some(target) = args.target {
        config.matchmaking.target_win_probability = target;
    }
    if let Some(tolerance) = args.tolerance {
        config.matchmaking.tolerance = tolerance;
    }

    // Overrides may have broken what the loader validated
    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let app_state = match AppState::new(config.clone()).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if args.dry_run {
        let health = HealthCheck::check(app_state.clone()).await;
        info!(
            "Dry run completed - {} players loaded, oracle {}",
            health.stats.players_known, health.stats.oracle_model
        );
        return Ok(());
    }

    app_state.start().await;

    let server = tokio::spawn(serve(app_state.clone(), wait_for_shutdown_signal()));
    info!("Press Ctrl+C to shutdown gracefully...");

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("HTTP server failed: {:#}", e);
            app_state.shutdown().await;
            std::process::exit(1);
        }
        Err(e) => {
            error!("HTTP server task panicked: {}", e);
            std::process::exit(1);
        }
    }

    info!("Shutdown signal received, beginning graceful shutdown...");
    if tokio::time::timeout(config.shutdown_timeout(), app_state.shutdown())
        .await
        .is_err()
    {
        warn!("Shutdown timeout exceeded, forcing exit");
    }

    info!("Duel Parlor Matchmaking Service stopped");
    Ok(())
}
