use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use gridarb::api::{self, AppState};
use gridarb::config::BotConfig;
use gridarb::strategy::{Parameters, StrategyRegistry};
use gridarb::venue::VenueRegistry;

#[derive(Parser)]
#[command(name = "gridarb", about = "Multi-venue trading bot", version)]
struct Cli {
    /// Path to the persisted configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control plane
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Run headless: start the configured strategy until interrupted
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = BotConfig::load_or_default(&cli.config);
    init_logging(config.log_level());

    info!("gridarb starting");

    let venues = Arc::new(VenueRegistry::new());
    for venue in config.exchanges.iter().filter(|c| c.enabled) {
        venues.add(venue.clone());
    }

    let strategies = Arc::new(StrategyRegistry::builtin());

    match cli.command {
        Command::Serve { host, port } => {
            let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
            let state = Arc::new(AppState::new(
                venues,
                strategies.clone(),
                config,
                cli.config,
            ));

            tokio::select! {
                result = api::serve(state, addr) => {
                    if let Err(e) = result {
                        error!(error = %e, "Control plane failed");
                    }
                }
                _ = shutdown_signal() => info!("Shutdown signal received"),
            }

            strategies.stop_active().await;
        }
        Command::Run => {
            match config.active_strategy.clone() {
                Some(strategy_id) => {
                    let parameters = Parameters::new(config.strategy_params.clone());
                    if strategies
                        .set_active(&strategy_id, venues.clone(), parameters)
                        .await
                    {
                        strategies.start_active().await;
                    } else {
                        error!(strategy = %strategy_id, "Failed to initialize strategy");
                    }
                }
                None => warn!("No active strategy configured"),
            }

            shutdown_signal().await;
            info!("Shutdown signal received");
            strategies.stop_active().await;
        }
    }

    info!("gridarb stopped");
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}
