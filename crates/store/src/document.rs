//! Single-document operations and delete-by-query.

use elasticsearch::{
    CountParts, CreateParts, DeleteByQueryParts, DeleteParts, GetParts, IndexParts, UpdateParts,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::client::{SearchClient, error_body, read_json};
use crate::error::{StoreError, StoreResult};
use crate::query::Query;

/// Outcome of a write, as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteResult {
    /// A new document was stored.
    Created,
    /// An existing document was replaced or changed.
    Updated,
    /// The document was removed.
    Deleted,
    /// There was no document to remove.
    NotFound,
    /// The update changed nothing.
    Noop,
}

impl std::fmt::Display for WriteResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WriteResult::Created => "created",
            WriteResult::Updated => "updated",
            WriteResult::Deleted => "deleted",
            WriteResult::NotFound => "not_found",
            WriteResult::Noop => "noop",
        };
        f.write_str(s)
    }
}

/// Response to a create, index or delete.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WriteResponse {
    /// Index written to.
    #[serde(rename = "_index")]
    pub index: String,
    /// Document id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Document version after the write.
    #[serde(rename = "_version", default)]
    pub version: u64,
    /// What happened.
    pub result: WriteResult,
}

/// Response to a partial update.
#[derive(Debug, Clone)]
pub struct UpdateResponse<T> {
    /// The write outcome.
    pub write: WriteResponse,
    /// The document after the update, when returned.
    pub source: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct RawUpdateResponse<T> {
    #[serde(flatten)]
    write: WriteResponse,
    #[serde(default)]
    get: Option<RawGetResult<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct RawGetResult<T> {
    #[serde(rename = "_source", default)]
    source: Option<T>,
}

/// A fetched document.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct GetResponse<T> {
    /// Index holding the document.
    #[serde(rename = "_index")]
    pub index: String,
    /// Document id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Current version.
    #[serde(rename = "_version", default)]
    pub version: Option<u64>,
    /// Whether the document exists.
    pub found: bool,
    /// The stored document.
    #[serde(rename = "_source", default)]
    pub source: Option<T>,
}

/// A failure reported by delete-by-query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryFailure {
    /// Index of the failing document.
    #[serde(default)]
    pub index: Option<String>,
    /// Id of the failing document.
    #[serde(default)]
    pub id: Option<String>,
    /// HTTP status of the failure.
    #[serde(default)]
    pub status: Option<u16>,
    /// Error cause, as returned.
    #[serde(default)]
    pub cause: Value,
}

/// Response to a delete-by-query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeleteByQueryResponse {
    /// Time the service spent, in milliseconds.
    #[serde(default)]
    pub took: u64,
    /// Documents that matched.
    #[serde(default)]
    pub total: u64,
    /// Documents deleted.
    #[serde(default)]
    pub deleted: u64,
    /// Per-document failures.
    #[serde(default)]
    pub failures: Vec<QueryFailure>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

impl SearchClient {
    /// Stores `document` under `id`, failing if the id is already taken.
    pub async fn create_document<T: Serialize>(
        &self,
        index: &str,
        id: &str,
        document: &T,
    ) -> StoreResult<WriteResponse> {
        let body = serde_json::to_value(document)?;
        let response = self
            .client()
            .create(CreateParts::IndexId(index, id))
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::transport("create document", e))?;

        if response.status_code().as_u16() == 409 {
            return Err(StoreError::DocumentAlreadyExists {
                index: index.to_string(),
                id: id.to_string(),
            });
        }

        let written: WriteResponse = read_json(response, "create document").await?;
        tracing::debug!(index = %index, id = %id, version = written.version, "Created document");
        Ok(written)
    }

    /// Stores `document` under `id`, replacing any existing document.
    pub async fn index_document<T: Serialize>(
        &self,
        index: &str,
        id: &str,
        document: &T,
    ) -> StoreResult<WriteResponse> {
        let body = serde_json::to_value(document)?;
        let response = self
            .client()
            .index(IndexParts::IndexId(index, id))
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::transport("index document", e))?;

        read_json(response, "index document").await
    }

    /// Merges the set fields of `partial` into the stored document and
    /// returns the document as it is after the update.
    pub async fn update_document<P: Serialize, T: DeserializeOwned>(
        &self,
        index: &str,
        id: &str,
        partial: &P,
    ) -> StoreResult<UpdateResponse<T>> {
        let body = json!({ "doc": serde_json::to_value(partial)? });
        let response = self
            .client()
            .update(UpdateParts::IndexId(index, id))
            ._source(&["true"])
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::transport("update document", e))?;

        if response.status_code().as_u16() == 404 {
            return Err(StoreError::DocumentNotFound {
                index: index.to_string(),
                id: id.to_string(),
            });
        }

        let raw: RawUpdateResponse<T> = read_json(response, "update document").await?;
        Ok(UpdateResponse {
            write: raw.write,
            source: raw.get.and_then(|g| g.source),
        })
    }

    /// Fetches a document by id. Returns `None` when it does not exist.
    pub async fn get_document<T: DeserializeOwned>(
        &self,
        index: &str,
        id: &str,
    ) -> StoreResult<Option<GetResponse<T>>> {
        let response = self
            .client()
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| StoreError::transport("get document", e))?;

        if response.status_code().as_u16() == 404 {
            let (_, body) = error_body(response).await;
            if body.contains("index_not_found_exception") {
                return Err(StoreError::IndexNotFound {
                    index: index.to_string(),
                });
            }
            return Ok(None);
        }

        let found: GetResponse<T> = read_json(response, "get document").await?;
        Ok(found.found.then_some(found))
    }

    /// Deletes a document by id. A missing document is reported through
    /// [`WriteResult::NotFound`], not as an error.
    pub async fn delete_document(&self, index: &str, id: &str) -> StoreResult<WriteResponse> {
        let response = self
            .client()
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| StoreError::transport("delete document", e))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            // The body carries result=not_found unless the index itself is missing.
            let (_, body) = error_body(response).await;
            return match serde_json::from_str::<WriteResponse>(&body) {
                Ok(written) => Ok(written),
                Err(_) => Err(StoreError::IndexNotFound {
                    index: index.to_string(),
                }),
            };
        }

        read_json(response, "delete document").await
    }

    /// Deletes every document in `index` matching `query`.
    pub async fn delete_by_query(
        &self,
        index: &str,
        query: &Query,
    ) -> StoreResult<DeleteByQueryResponse> {
        let response = self
            .client()
            .delete_by_query(DeleteByQueryParts::Index(&[index]))
            .body(json!({ "query": query.to_json() }))
            .send()
            .await
            .map_err(|e| StoreError::transport("delete by query", e))?;

        if response.status_code().as_u16() == 404 {
            return Err(StoreError::IndexNotFound {
                index: index.to_string(),
            });
        }

        read_json(response, "delete by query").await
    }

    /// Counts documents in `index` matching `query`.
    pub async fn count(&self, index: &str, query: &Query) -> StoreResult<u64> {
        let response = self
            .client()
            .count(CountParts::Index(&[index]))
            .body(json!({ "query": query.to_json() }))
            .send()
            .await
            .map_err(|e| StoreError::transport("count", e))?;

        if response.status_code().as_u16() == 404 {
            return Err(StoreError::IndexNotFound {
                index: index.to_string(),
            });
        }

        let counted: CountResponse = read_json(response, "count").await?;
        Ok(counted.count)
    }
}
