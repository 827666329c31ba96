//! Bulk create, index and delete.
//!
//! Operations are sent in one request and applied independently by the
//! service; a failed item does not roll back the others. The response lists
//! one item per operation, in request order.

use std::collections::BTreeMap;

use elasticsearch::BulkParts;
use elasticsearch::params::Refresh;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{SearchClient, read_json};
use crate::error::{StoreError, StoreResult};

/// One operation of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation<T> {
    /// Store or overwrite a document.
    Index {
        /// Target index.
        index: String,
        /// Document id.
        id: String,
        /// The document.
        document: T,
    },
    /// Store a document, failing the item if the id exists.
    Create {
        /// Target index.
        index: String,
        /// Document id.
        id: String,
        /// The document.
        document: T,
    },
    /// Remove a document.
    Delete {
        /// Target index.
        index: String,
        /// Document id.
        id: String,
    },
}

impl<T> BulkOperation<T> {
    fn index_name(&self) -> &str {
        match self {
            BulkOperation::Index { index, .. }
            | BulkOperation::Create { index, .. }
            | BulkOperation::Delete { index, .. } => index,
        }
    }
}

impl<T: Serialize> BulkOperation<T> {
    // An empty index name leaves the target to the request's default index.
    fn into_es(self) -> StoreResult<elasticsearch::BulkOperation<Value>> {
        Ok(match self {
            BulkOperation::Index {
                index,
                id,
                document,
            } => {
                let op =
                    elasticsearch::BulkOperation::index(serde_json::to_value(&document)?).id(id);
                if index.is_empty() {
                    op.into()
                } else {
                    op.index(index).into()
                }
            }
            BulkOperation::Create {
                index,
                id,
                document,
            } => {
                let op =
                    elasticsearch::BulkOperation::create(serde_json::to_value(&document)?).id(id);
                if index.is_empty() {
                    op.into()
                } else {
                    op.index(index).into()
                }
            }
            BulkOperation::Delete { index, id } => {
                let op = elasticsearch::BulkOperation::<Value>::delete(id);
                if index.is_empty() {
                    op.into()
                } else {
                    op.index(index).into()
                }
            }
        })
    }
}

/// An ordered batch of operations.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkRequest<T> {
    operations: Vec<BulkOperation<T>>,
    default_index: Option<String>,
    refresh: bool,
}

impl<T> Default for BulkRequest<T> {
    fn default() -> Self {
        Self {
            operations: Vec::new(),
            default_index: None,
            refresh: false,
        }
    }
}

impl<T> BulkRequest<T> {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an index operation.
    pub fn index(mut self, index: impl Into<String>, id: impl Into<String>, document: T) -> Self {
        self.operations.push(BulkOperation::Index {
            index: index.into(),
            id: id.into(),
            document,
        });
        self
    }

    /// Appends a create operation.
    pub fn create(mut self, index: impl Into<String>, id: impl Into<String>, document: T) -> Self {
        self.operations.push(BulkOperation::Create {
            index: index.into(),
            id: id.into(),
            document,
        });
        self
    }

    /// Appends a delete operation.
    pub fn delete(mut self, index: impl Into<String>, id: impl Into<String>) -> Self {
        self.operations.push(BulkOperation::Delete {
            index: index.into(),
            id: id.into(),
        });
        self
    }

    /// Sets the index used by operations added with an empty index name.
    pub fn default_index(mut self, index: impl Into<String>) -> Self {
        self.default_index = Some(index.into());
        self
    }

    /// Makes the written documents searchable before the call returns.
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Returns the operations in order.
    pub fn operations(&self) -> &[BulkOperation<T>] {
        &self.operations
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// True when there are no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Why a bulk item failed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorCause {
    /// Error type, e.g. `version_conflict_engine_exception`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable reason.
    #[serde(default)]
    pub reason: Option<String>,
}

/// The outcome of one bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItem {
    /// Operation kind: `index`, `create`, `update` or `delete`.
    pub action: String,
    /// Target index.
    pub index: String,
    /// Document id.
    pub id: String,
    /// HTTP status of this item.
    pub status: u16,
    /// Write outcome, when the item succeeded.
    pub result: Option<String>,
    /// Failure cause, when the item failed.
    pub error: Option<ErrorCause>,
}

impl BulkItem {
    /// True when the item failed.
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct RawBulkItem {
    #[serde(rename = "_index", default)]
    index: String,
    #[serde(rename = "_id", default)]
    id: String,
    status: u16,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<ErrorCause>,
}

#[derive(Debug, Deserialize)]
struct RawBulkResponse {
    #[serde(default)]
    took: u64,
    errors: bool,
    #[serde(default)]
    items: Vec<BTreeMap<String, RawBulkItem>>,
}

/// The response to a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkResponse {
    /// Time the service spent, in milliseconds.
    pub took: u64,
    /// True when at least one item failed.
    pub errors: bool,
    /// One item per operation, in request order.
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    /// Iterates the failed items.
    pub fn failures(&self) -> impl Iterator<Item = &BulkItem> {
        self.items.iter().filter(|i| i.is_failure())
    }
}

impl From<RawBulkResponse> for BulkResponse {
    fn from(raw: RawBulkResponse) -> Self {
        let items = raw
            .items
            .into_iter()
            .flat_map(|entry| entry.into_iter())
            .map(|(action, item)| BulkItem {
                action,
                index: item.index,
                id: item.id,
                status: item.status,
                result: item.result,
                error: item.error,
            })
            .collect();

        BulkResponse {
            took: raw.took,
            errors: raw.errors,
            items,
        }
    }
}

impl SearchClient {
    /// Sends all operations of `request` in one call.
    ///
    /// Item failures do not make this return an error; inspect
    /// [`BulkResponse::errors`] and [`BulkResponse::failures`].
    pub async fn bulk<T: Serialize>(&self, request: BulkRequest<T>) -> StoreResult<BulkResponse> {
        if request.is_empty() {
            return Err(StoreError::InvalidRequest {
                message: "bulk request has no operations".to_string(),
            });
        }

        if request.default_index.is_none()
            && request.operations.iter().any(|op| op.index_name().is_empty())
        {
            return Err(StoreError::InvalidRequest {
                message: "bulk operation has no index and the request has no default index"
                    .to_string(),
            });
        }

        let refresh = request.refresh;
        let count = request.len();
        let default_index = request.default_index;
        let ops = request
            .operations
            .into_iter()
            .map(BulkOperation::into_es)
            .collect::<StoreResult<Vec<_>>>()?;

        let parts = match default_index.as_deref() {
            Some(index) => BulkParts::Index(index),
            None => BulkParts::None,
        };
        let mut call = self.client().bulk(parts).body(ops);
        if refresh {
            call = call.refresh(Refresh::True);
        }

        let response = call
            .send()
            .await
            .map_err(|e| StoreError::transport("bulk", e))?;

        let raw: RawBulkResponse = read_json(response, "bulk").await?;
        let response = BulkResponse::from(raw);
        tracing::debug!(
            operations = count,
            took = response.took,
            errors = response.errors,
            "Bulk request completed"
        );
        Ok(response)
    }
}
