//! The search cluster client handle.

use std::fmt::Debug;
use std::time::Duration;

use elasticsearch::Elasticsearch;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{StoreAuth, StoreConfig};
use crate::error::{StoreError, StoreResult};

/// A client bound to one search cluster node.
///
/// Building the client does not contact the cluster. Each request is sent
/// and awaited on its own; the wrapped transport owns pooling and
/// serialization.
pub struct SearchClient {
    client: Elasticsearch,
    config: StoreConfig,
}

impl Debug for SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SearchClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let client = Self::build_client(&config)?;
        tracing::debug!(node = %config.primary_node(), "Search client created");
        Ok(Self { client, config })
    }

    fn build_client(config: &StoreConfig) -> StoreResult<Elasticsearch> {
        let parsed_url: elasticsearch::http::Url =
            config
                .primary_node()
                .parse()
                .map_err(|e| StoreError::Connection {
                    message: format!("Invalid URL '{}': {}", config.primary_node(), e),
                })?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);

        let mut builder = TransportBuilder::new(conn_pool)
            .timeout(Duration::from_millis(config.request_timeout_ms));

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some(ref auth) = config.auth {
            builder = match auth {
                StoreAuth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username.clone(), password.clone()))
                }
                StoreAuth::Bearer { token } => builder.auth(Credentials::Bearer(token.clone())),
            };
        }

        let transport = builder.build().map_err(|e| StoreError::Connection {
            message: format!("Failed to build transport: {}", e),
        })?;

        Ok(Elasticsearch::new(transport))
    }

    /// Returns the underlying client.
    pub(crate) fn client(&self) -> &Elasticsearch {
        &self.client
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Checks that the cluster answers and is not red.
    pub async fn health_check(&self) -> StoreResult<String> {
        let response = self
            .client
            .cluster()
            .health(elasticsearch::cluster::ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| StoreError::transport("health check", e))?;

        let body: Value = read_json(response, "health check").await?;
        let status = body
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown")
            .to_string();

        if status == "red" {
            return Err(StoreError::Status {
                operation: "health check".to_string(),
                status: 200,
                body: format!("cluster status is red: {}", body),
            });
        }

        Ok(status)
    }

    /// Releases the client and its connection pool.
    pub fn close(self) {
        tracing::debug!(node = %self.config.primary_node(), "Search client closed");
    }
}

/// Reads a successful response body as `T`, turning error statuses into
/// [`StoreError::Status`].
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    operation: &str,
) -> StoreResult<T> {
    let status = response.status_code();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Status {
            operation: operation.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| StoreError::decode(operation, e))
}

/// Reads the body of a failed response.
pub(crate) async fn error_body(response: Response) -> (u16, String) {
    let status = response.status_code().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}
