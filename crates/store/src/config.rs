//! Client configuration.

use serde::{Deserialize, Serialize};

/// Authentication configuration for the search cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreAuth {
    /// Basic username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

/// Configuration for a [`SearchClient`](crate::SearchClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Node URLs (e.g., `["http://localhost:9200"]`).
    /// Only the first node is used (single-node connection pool).
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<StoreAuth>,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,

    /// Number of primary shards for indices created with a mapping (default: 1).
    #[serde(default = "default_shards")]
    pub number_of_shards: u32,

    /// Number of replica shards for indices created with a mapping (default: 1).
    #[serde(default = "default_replicas")]
    pub number_of_replicas: u32,
}

pub(crate) const DEFAULT_NODE: &str = "http://localhost:9200";

fn default_nodes() -> Vec<String> {
    vec![DEFAULT_NODE.to_string()]
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_shards() -> u32 {
    1
}

fn default_replicas() -> u32 {
    1
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            request_timeout_ms: default_request_timeout_ms(),
            auth: None,
            disable_certificate_validation: false,
            number_of_shards: default_shards(),
            number_of_replicas: default_replicas(),
        }
    }
}

impl StoreConfig {
    /// Creates a configuration pointing at a single node.
    pub fn with_node(url: impl Into<String>) -> Self {
        Self {
            nodes: vec![url.into()],
            ..Default::default()
        }
    }

    /// Returns the node the client connects to.
    pub fn primary_node(&self) -> &str {
        self.nodes
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_NODE)
    }
}
