use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use typeduel_server::{RelayConfig, RelayServer};

#[derive(Parser)]
#[command(name = "typeduel-server")]
#[command(about = "Matchmaking and relay server for two-player typing duels")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "typeduel.toml")]
    config: PathBuf,

    /// Bind address, overriding the config file
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = RelayConfig::load(&cli.config).context("Failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
        config.validate()?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging.level)?;

    info!("🎮 typeduel relay v{}", env!("CARGO_PKG_VERSION"));
    info!("Starting with config: {}", cli.config.display());

    let server = RelayServer::new(config);

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    tokio::select! {
        result = server.run() => {
            match result {
                Ok(_) => info!("✅ Server stopped gracefully"),
                Err(e) => error!("❌ Server error: {}", e),
            }
        }
        _ = shutdown_signal => {
            info!("🛑 Shutdown signal received");
        }
    }

    info!("👋 relay shutdown complete");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("typeduel_server={}", level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(true)
                .compact(),
        )
        .init();

    Ok(())
}
