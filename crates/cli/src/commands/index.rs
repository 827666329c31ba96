//! Index routines.

use clap::Subcommand;
use tracing::info;
use userdex_store::{SearchClient, user_index_mapping};

#[derive(Subcommand, Debug, Clone)]
pub enum IndexCommand {
    /// Create an index
    Create {
        /// Index name.
        #[arg(long, default_value = "shopping")]
        name: String,

        /// Apply the user settings and mappings.
        #[arg(long)]
        with_user_mapping: bool,
    },

    /// List all indices, then show one in detail
    Show {
        /// Index to show.
        #[arg(long, default_value = "shopping")]
        name: String,
    },

    /// Delete an index
    Delete {
        /// Index name.
        #[arg(long, default_value = "shopping")]
        name: String,
    },
}

pub async fn run(client: &SearchClient, command: &IndexCommand) -> anyhow::Result<()> {
    match command {
        IndexCommand::Create {
            name,
            with_user_mapping,
        } => {
            let created = if *with_user_mapping {
                let body = user_index_mapping(client.config());
                client.create_index_with_body(name, body).await?
            } else {
                client.create_index(name).await?
            };
            info!(
                index = %created.index,
                acknowledged = created.acknowledged,
                shards_acknowledged = created.shards_acknowledged,
                "Index created"
            );
        }
        IndexCommand::Show { name } => {
            let all = client.get_index("*").await?;
            let names: Vec<&str> = all.keys().map(String::as_str).collect();
            info!(count = names.len(), indices = ?names, "Indices");

            let details = client.get_index(name).await?;
            for (index, info) in &details {
                info!(index = %index, aliases = %info.aliases, "Aliases");
                info!(index = %index, mappings = %info.mappings, "Mappings");
                info!(index = %index, settings = %info.settings, "Settings");
            }
        }
        IndexCommand::Delete { name } => {
            let acknowledged = client.delete_index(name).await?;
            info!(index = %name, acknowledged, "Index deleted");
        }
    }
    Ok(())
}
