//! Example routines, one per subcommand.

pub mod document;
pub mod index;
pub mod query;

use clap::Subcommand;
use tracing::info;
use userdex_store::SearchClient;

use crate::config::CliConfig;
use document::DocCommand;
use index::IndexCommand;
use query::QueryCommand;

const SEPARATOR: &str = "==============================================";

/// Routine groups.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create, show and delete indices
    #[command(subcommand)]
    Index(IndexCommand),

    /// Write, read and delete user documents
    #[command(subcommand)]
    Doc(DocCommand),

    /// Search the user index
    #[command(subcommand)]
    Query(QueryCommand),
}

/// Runs the selected routine on a fresh client.
///
/// The client is closed after the routine, whether or not it failed.
pub async fn run(config: &CliConfig) -> anyhow::Result<()> {
    let client = SearchClient::new(config.to_store_config())?;

    let result = match &config.command {
        Command::Index(cmd) => index::run(&client, cmd).await,
        Command::Doc(cmd) => document::run(&client, cmd).await,
        Command::Query(cmd) => query::run(&client, cmd).await,
    };

    info!("{}", SEPARATOR);
    client.close();
    result
}
