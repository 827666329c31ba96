//! Command-line configuration.
//!
//! Every global option can also be set from the environment.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `USERDEX_ES_NODES` | http://localhost:9200 | Node URLs (comma-separated) |
//! | `USERDEX_ES_USERNAME` | - | Basic auth username |
//! | `USERDEX_ES_PASSWORD` | - | Basic auth password |
//! | `USERDEX_ES_TIMEOUT_MS` | 30000 | Request timeout (milliseconds) |
//! | `USERDEX_ES_INSECURE` | false | Skip TLS certificate validation |
//! | `USERDEX_LOG_LEVEL` | info | Log level |

use clap::Parser;
use userdex_store::{StoreAuth, StoreConfig};

use crate::commands::Command;

/// Runs one example routine against a search cluster.
#[derive(Debug, Clone, Parser)]
#[command(name = "userdex")]
#[command(about = "Index, document and search examples against a search cluster")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct CliConfig {
    /// Node URLs (comma-separated). Only the first is used.
    #[arg(
        long,
        env = "USERDEX_ES_NODES",
        default_value = "http://localhost:9200",
        global = true
    )]
    pub nodes: String,

    /// Username for basic authentication.
    #[arg(long, env = "USERDEX_ES_USERNAME", global = true)]
    pub username: Option<String>,

    /// Password for basic authentication.
    #[arg(long, env = "USERDEX_ES_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Request timeout in milliseconds.
    #[arg(
        long,
        env = "USERDEX_ES_TIMEOUT_MS",
        default_value = "30000",
        global = true
    )]
    pub request_timeout_ms: u64,

    /// Skip TLS certificate validation.
    #[arg(long, env = "USERDEX_ES_INSECURE", default_value = "false", global = true)]
    pub insecure: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "USERDEX_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Routine to run.
    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Parses `--nodes` into trimmed, non-empty URLs.
    pub fn node_list(&self) -> Vec<String> {
        self.nodes
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Validates the configuration, returning every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let nodes = self.node_list();
        if nodes.is_empty() {
            errors.push("At least one node URL is required".to_string());
        }
        for node in &nodes {
            if !(node.starts_with("http://") || node.starts_with("https://")) {
                errors.push(format!("Node URL must start with http:// or https://: {}", node));
            }
        }

        if self.request_timeout_ms == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.password.is_some() && self.username.is_none() {
            errors.push("A password was given without a username".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Builds the store client configuration.
    pub fn to_store_config(&self) -> StoreConfig {
        let auth = self.username.as_ref().map(|username| StoreAuth::Basic {
            username: username.clone(),
            password: self.password.clone().unwrap_or_default(),
        });

        StoreConfig {
            nodes: self.node_list(),
            request_timeout_ms: self.request_timeout_ms,
            auth,
            disable_certificate_validation: self.insecure,
            ..Default::default()
        }
    }
}
