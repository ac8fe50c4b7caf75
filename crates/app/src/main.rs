mod cli;
mod config;
mod forum;
mod http;
mod jobs;
mod query_cache;
mod state;
mod views;
mod wiring;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::ConfigError;
use crate::http::HttpError;
use crate::jobs::JobError;
use crate::wiring::WiringError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("wiring error: {0}")]
    Wiring(#[from] WiringError),
    #[error("http error: {0}")]
    Http(#[from] HttpError),
    #[error("job error: {0}")]
    Jobs(#[from] JobError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    config::load_dotenv()?;
    let config = config::AppConfig::from_env()?;
    let poll = cli.run_poller(config.vote_poll_interval.as_secs());
    let state = wiring::build_state(config, cli.offline)?;

    let addr = state.config.http_addr;
    let http_state = state.clone();
    let api = tokio::spawn(async move {
        info!(%addr, gateway = http_state.gateway_mode.as_str(), "http server starting");
        http::serve(addr, http_state).await
    });

    let poller = if poll {
        let poll_state = state.clone();
        Some(tokio::spawn(async move { jobs::start(poll_state).await }))
    } else {
        info!("vote polling disabled");
        None
    };

    let shutdown = shutdown_signal();

    match poller {
        Some(poller) => {
            tokio::select! {
                _ = shutdown => {
                    info!("shutdown signal received");
                }
                res = api => {
                    res??;
                }
                res = poller => {
                    res??;
                }
            }
        }
        None => {
            tokio::select! {
                _ = shutdown => {
                    info!("shutdown signal received");
                }
                res = api => {
                    res??;
                }
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install ctrl-c handler");
    }
}
