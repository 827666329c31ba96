//! userdex store
//!
//! Typed access to a search cluster for the `userdex` command-line examples:
//! index management, single-document writes and reads, bulk operations,
//! delete-by-query, and searches with paging, sorting, source filtering,
//! highlighting and aggregations.
//!
//! The cluster does all storage, analysis and query evaluation. This crate
//! only builds request bodies and decodes responses.
//!
//! # Architecture
//!
//! - [`config`] - Node, timeout and authentication settings
//! - [`client`] - The [`SearchClient`] handle all operations hang off
//! - [`error`] - Error types for all operations
//! - [`model`] - The [`User`] record and its index mapping
//! - [`index`] - Create, inspect and delete indices
//! - [`document`] - Create, update, get and delete documents by id
//! - [`bulk`] - Batches of index, create and delete operations
//! - [`query`] - Query DSL values
//! - [`search`] - Search requests and responses
//!
//! # Quick Start
//!
//! ```no_run
//! use userdex_store::{Query, SearchClient, SearchRequest, StoreConfig, User};
//!
//! # async fn run() -> userdex_store::StoreResult<()> {
//! let client = SearchClient::new(StoreConfig::with_node("http://localhost:9200"))?;
//!
//! let user = User::new("肖杰", "男", 30, 123456789);
//! client.create_document("user", "22222", &user).await?;
//!
//! let request = SearchRequest::new("user").query(Query::term("sex", "男"));
//! let response = client.search::<User>(&request).await?;
//! for hit in response.documents() {
//!     println!("{}", hit);
//! }
//!
//! client.close();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bulk;
pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod model;
pub mod query;
pub mod search;

// Re-export commonly used types at crate root
pub use bulk::{BulkItem, BulkOperation, BulkRequest, BulkResponse, ErrorCause};
pub use client::SearchClient;
pub use config::{StoreAuth, StoreConfig};
pub use document::{
    DeleteByQueryResponse, GetResponse, QueryFailure, UpdateResponse, WriteResponse, WriteResult,
};
pub use error::{StoreError, StoreResult};
pub use index::{CreateIndexResponse, IndexInfo};
pub use model::{Document, User, sample_users, user_index_mapping};
pub use query::{BoolQuery, Fuzziness, Query, RangeQuery};
pub use search::{
    Aggregation, HighlightField, Hit, HitsMetadata, SearchRequest, SearchResponse, SortField,
    SortOrder, SourceFilter, TermsBucket, TotalHits, TotalHitsRelation,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
