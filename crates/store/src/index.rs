//! Index management: create, inspect, delete, refresh.

use std::collections::BTreeMap;

use elasticsearch::indices::{
    IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesGetParts,
    IndicesRefreshParts,
};
use serde::Deserialize;
use serde_json::Value;

use crate::client::{SearchClient, error_body, read_json};
use crate::error::{StoreError, StoreResult};

/// Result of creating an index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateIndexResponse {
    /// Whether the cluster acknowledged the request.
    pub acknowledged: bool,
    /// Whether the shards started before the timeout.
    #[serde(default)]
    pub shards_acknowledged: bool,
    /// Name of the created index.
    pub index: String,
}

/// Aliases, mappings and settings of one index, as returned.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IndexInfo {
    /// Aliases by name.
    #[serde(default)]
    pub aliases: Value,
    /// Field mappings.
    #[serde(default)]
    pub mappings: Value,
    /// Index settings.
    #[serde(default)]
    pub settings: Value,
}

#[derive(Debug, Deserialize)]
struct Acknowledged {
    acknowledged: bool,
}

impl SearchClient {
    /// Creates an index with default settings.
    pub async fn create_index(&self, name: &str) -> StoreResult<CreateIndexResponse> {
        self.send_create_index(name, None).await
    }

    /// Creates an index with the given settings and mappings.
    pub async fn create_index_with_body(
        &self,
        name: &str,
        body: Value,
    ) -> StoreResult<CreateIndexResponse> {
        self.send_create_index(name, Some(body)).await
    }

    async fn send_create_index(
        &self,
        name: &str,
        body: Option<Value>,
    ) -> StoreResult<CreateIndexResponse> {
        let indices = self.client().indices();
        let request = indices.create(IndicesCreateParts::Index(name));
        let response = match body {
            Some(body) => request.body(body).send().await,
            None => request.send().await,
        }
        .map_err(|e| StoreError::transport("create index", e))?;

        if !response.status_code().is_success() {
            let (status, body) = error_body(response).await;
            if body.contains("resource_already_exists_exception") {
                return Err(StoreError::IndexAlreadyExists {
                    index: name.to_string(),
                });
            }
            return Err(StoreError::Status {
                operation: "create index".to_string(),
                status,
                body,
            });
        }

        let created: CreateIndexResponse = response
            .json()
            .await
            .map_err(|e| StoreError::decode("create index", e))?;
        tracing::debug!(index = %created.index, "Created index");
        Ok(created)
    }

    /// Returns the indices matching `pattern`, keyed by name.
    ///
    /// `*` lists every index. A concrete name that does not exist is an error.
    pub async fn get_index(&self, pattern: &str) -> StoreResult<BTreeMap<String, IndexInfo>> {
        let response = self
            .client()
            .indices()
            .get(IndicesGetParts::Index(&[pattern]))
            .send()
            .await
            .map_err(|e| StoreError::transport("get index", e))?;

        if response.status_code().as_u16() == 404 {
            return Err(StoreError::IndexNotFound {
                index: pattern.to_string(),
            });
        }

        read_json(response, "get index").await
    }

    /// Returns whether an index exists.
    pub async fn index_exists(&self, name: &str) -> StoreResult<bool> {
        let response = self
            .client()
            .indices()
            .exists(IndicesExistsParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| StoreError::transport("index exists", e))?;

        Ok(response.status_code().is_success())
    }

    /// Deletes an index, returning whether the cluster acknowledged it.
    pub async fn delete_index(&self, name: &str) -> StoreResult<bool> {
        let response = self
            .client()
            .indices()
            .delete(IndicesDeleteParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| StoreError::transport("delete index", e))?;

        if response.status_code().as_u16() == 404 {
            return Err(StoreError::IndexNotFound {
                index: name.to_string(),
            });
        }

        let ack: Acknowledged = read_json(response, "delete index").await?;
        tracing::debug!(index = %name, acknowledged = ack.acknowledged, "Deleted index");
        Ok(ack.acknowledged)
    }

    /// Refreshes an index so recent writes become searchable.
    pub async fn refresh_index(&self, name: &str) -> StoreResult<()> {
        let response = self
            .client()
            .indices()
            .refresh(IndicesRefreshParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| StoreError::transport("refresh index", e))?;

        if response.status_code().as_u16() == 404 {
            return Err(StoreError::IndexNotFound {
                index: name.to_string(),
            });
        }

        let _: Value = read_json(response, "refresh index").await?;
        Ok(())
    }
}
