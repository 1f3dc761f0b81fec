//! Command-line front end for the balancer
//!
//! ```bash
//! # Select endpoints in a loop, like a client issuing requests
//! s3balancer select --rounds 5 --interval 1
//!
//! # Endpoint health table (or --json)
//! s3balancer status
//!
//! # List buckets through the selected endpoint
//! s3balancer buckets
//! ```

pub mod args;
pub mod commands;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config;
use crate::lb::Balancer;
use args::{Cli, Commands};

/// Install the stderr tracing subscriber; `RUST_LOG` overrides `level`
pub fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run the CLI application
pub async fn run(cli: Cli) -> Result<()> {
    debug!("CLI arguments: {:?}", cli);

    let config = config::load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    info!(endpoints = ?config.endpoints, secure = config.secure, "connecting to endpoints");

    let balancer = Balancer::from_config(&config)
        .await
        .context("Failed to initialize balancer")?;

    let result = match cli.command {
        Commands::Select { rounds, interval } => commands::cmd_select(&balancer, rounds, interval).await,
        Commands::Status { json } => commands::cmd_status(&balancer, json).await,
        Commands::Buckets => commands::cmd_buckets(&balancer).await,
    };

    balancer.shutdown();
    result
}
