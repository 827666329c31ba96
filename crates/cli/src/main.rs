//! userdex
//!
//! Example routines against a search cluster: index management, document
//! writes and reads, bulk operations and searches over a `user` index.

mod commands;
mod config;
mod logging;

use clap::Parser;
use tracing::{error, info};

use crate::config::CliConfig;
use crate::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        nodes = ?config.node_list(),
        timeout_ms = config.request_timeout_ms,
        "Starting userdex"
    );

    if let Err(e) = commands::run(&config).await {
        error!(error = %e, "Routine failed");
        return Err(e);
    }

    Ok(())
}
