//! Search requests and responses.

use std::collections::BTreeMap;

use elasticsearch::SearchParts;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::client::{SearchClient, error_body};
use crate::error::{StoreError, StoreResult};
use crate::query::Query;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    /// Field to sort on.
    pub field: String,
    /// Direction.
    pub order: SortOrder,
}

/// Which `_source` fields the service returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFilter {
    /// Fields to return.
    pub includes: Vec<String>,
    /// Fields to leave out.
    pub excludes: Vec<String>,
}

/// Highlighting for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightField {
    /// Field to highlight.
    pub field: String,
    /// Tags inserted before each fragment match.
    pub pre_tags: Vec<String>,
    /// Tags inserted after each fragment match.
    pub post_tags: Vec<String>,
}

/// A named aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregation {
    /// Largest value of a numeric field.
    Max {
        /// Field to aggregate.
        field: String,
    },
    /// Smallest value of a numeric field.
    Min {
        /// Field to aggregate.
        field: String,
    },
    /// Mean value of a numeric field.
    Avg {
        /// Field to aggregate.
        field: String,
    },
    /// One bucket per distinct value.
    Terms {
        /// Field to group by.
        field: String,
        /// Maximum number of buckets.
        size: Option<u32>,
    },
}

impl Aggregation {
    fn to_json(&self) -> Value {
        match self {
            Aggregation::Max { field } => json!({ "max": { "field": field } }),
            Aggregation::Min { field } => json!({ "min": { "field": field } }),
            Aggregation::Avg { field } => json!({ "avg": { "field": field } }),
            Aggregation::Terms { field, size } => {
                let mut terms = json!({ "field": field });
                if let Some(size) = size {
                    terms["size"] = json!(size);
                }
                json!({ "terms": terms })
            }
        }
    }
}

/// A search against one index (or index pattern).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    index: String,
    query: Query,
    from: Option<u64>,
    size: Option<u64>,
    sort: Vec<SortField>,
    source: Option<SourceFilter>,
    highlight: Vec<HighlightField>,
    aggregations: BTreeMap<String, Aggregation>,
    track_total_hits: Option<bool>,
}

impl SearchRequest {
    /// Starts a match-all search on `index`.
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            query: Query::MatchAll,
            from: None,
            size: None,
            sort: Vec::new(),
            source: None,
            highlight: Vec::new(),
            aggregations: BTreeMap::new(),
            track_total_hits: None,
        }
    }

    /// Returns the target index.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Returns the sort keys in order.
    pub fn sort_fields(&self) -> &[SortField] {
        &self.sort
    }

    /// Returns the `_source` filter, if any.
    pub fn source_filter(&self) -> Option<&SourceFilter> {
        self.source.as_ref()
    }

    /// Returns the highlighted fields.
    pub fn highlight_fields(&self) -> &[HighlightField] {
        &self.highlight
    }

    /// Sets the query.
    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Sets the offset of the first hit.
    pub fn from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    /// Sets the number of hits returned.
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Adds a sort key.
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push(SortField {
            field: field.into(),
            order,
        });
        self
    }

    /// Restricts the returned `_source` fields.
    pub fn source(mut self, includes: &[&str], excludes: &[&str]) -> Self {
        self.source = Some(SourceFilter {
            includes: includes.iter().map(|s| s.to_string()).collect(),
            excludes: excludes.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Highlights matches in `field` with the given tags.
    pub fn highlight(
        mut self,
        field: impl Into<String>,
        pre_tag: impl Into<String>,
        post_tag: impl Into<String>,
    ) -> Self {
        self.highlight.push(HighlightField {
            field: field.into(),
            pre_tags: vec![pre_tag.into()],
            post_tags: vec![post_tag.into()],
        });
        self
    }

    /// Adds a named aggregation.
    pub fn aggregation(mut self, name: impl Into<String>, aggregation: Aggregation) -> Self {
        self.aggregations.insert(name.into(), aggregation);
        self
    }

    /// Asks for an exact total hit count.
    pub fn track_total_hits(mut self, track: bool) -> Self {
        self.track_total_hits = Some(track);
        self
    }

    /// Builds the request body. Only keys that were set are emitted.
    pub fn build_body(&self) -> Value {
        let mut body = json!({ "query": self.query.to_json() });

        if let Some(from) = self.from {
            body["from"] = json!(from);
        }
        if let Some(size) = self.size {
            body["size"] = json!(size);
        }

        if !self.sort.is_empty() {
            body["sort"] = Value::Array(
                self.sort
                    .iter()
                    .map(|s| json!({ s.field.clone(): { "order": s.order.as_str() } }))
                    .collect(),
            );
        }

        if let Some(ref source) = self.source {
            body["_source"] = json!({
                "includes": source.includes,
                "excludes": source.excludes,
            });
        }

        if !self.highlight.is_empty() {
            let mut fields = Map::new();
            for h in &self.highlight {
                fields.insert(
                    h.field.clone(),
                    json!({ "pre_tags": h.pre_tags, "post_tags": h.post_tags }),
                );
            }
            body["highlight"] = json!({ "fields": fields });
        }

        if !self.aggregations.is_empty() {
            let mut aggs = Map::new();
            for (name, agg) in &self.aggregations {
                aggs.insert(name.clone(), agg.to_json());
            }
            body["aggs"] = Value::Object(aggs);
        }

        if let Some(track) = self.track_total_hits {
            body["track_total_hits"] = json!(track);
        }

        body
    }
}

/// Whether a total hit count is exact or a lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalHitsRelation {
    /// The count is exact.
    Eq,
    /// The count is a lower bound.
    Gte,
}

/// Total number of matching documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TotalHits {
    /// The count.
    pub value: u64,
    /// How to read the count.
    pub relation: TotalHitsRelation,
}

impl TotalHits {
    /// True when `value` is the exact number of matches.
    pub fn is_exact(&self) -> bool {
        self.relation == TotalHitsRelation::Eq
    }
}

/// One search hit.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Hit<T> {
    /// Index holding the document.
    #[serde(rename = "_index")]
    pub index: String,
    /// Document id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Relevance score (absent when sorting on a field).
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    /// The stored document, possibly filtered.
    #[serde(rename = "_source", default)]
    pub source: Option<T>,
    /// Highlighted fragments by field.
    #[serde(default)]
    pub highlight: BTreeMap<String, Vec<String>>,
    /// Sort values of this hit.
    #[serde(default)]
    pub sort: Vec<Value>,
}

/// The hits section of a search response.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct HitsMetadata<T> {
    /// Total matches, when tracked.
    #[serde(default)]
    pub total: Option<TotalHits>,
    /// Best score among the hits.
    #[serde(default)]
    pub max_score: Option<f64>,
    /// The returned page of hits.
    #[serde(default = "Vec::new")]
    pub hits: Vec<Hit<T>>,
}

/// A terms aggregation bucket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TermsBucket {
    /// The grouped value.
    pub key: Value,
    /// Number of documents in the bucket.
    pub doc_count: u64,
}

/// A search response with hits decoded as `T`.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct SearchResponse<T> {
    /// Time the service spent, in milliseconds.
    pub took: u64,
    /// Whether the search timed out.
    #[serde(default)]
    pub timed_out: bool,
    /// The hits.
    pub hits: HitsMetadata<T>,
    /// Aggregation results by name, as returned.
    #[serde(default)]
    pub aggregations: BTreeMap<String, Value>,
}

impl<T> SearchResponse<T> {
    /// Iterates the sources of the returned hits.
    pub fn documents(&self) -> impl Iterator<Item = &T> {
        self.hits.hits.iter().filter_map(|h| h.source.as_ref())
    }

    /// Value of a single-value metric aggregation (max, min, avg).
    ///
    /// Returns `None` when the aggregation is absent or had no input.
    pub fn metric_value(&self, name: &str) -> Option<f64> {
        self.aggregations
            .get(name)
            .and_then(|a| a.get("value"))
            .and_then(|v| v.as_f64())
    }

    /// Buckets of a terms aggregation.
    pub fn terms_buckets(&self, name: &str) -> StoreResult<Vec<TermsBucket>> {
        let Some(buckets) = self.aggregations.get(name).and_then(|a| a.get("buckets")) else {
            return Ok(Vec::new());
        };
        serde_json::from_value(buckets.clone())
            .map_err(|e| StoreError::decode("terms aggregation", e))
    }
}

impl SearchClient {
    /// Runs a search and decodes hit sources as `T`.
    pub async fn search<T: DeserializeOwned>(
        &self,
        request: &SearchRequest,
    ) -> StoreResult<SearchResponse<T>> {
        let index = request.index();
        let body = request.build_body();
        tracing::debug!(index = %index, body = %body, "Sending search");

        let response = self
            .client()
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::transport("search", e))?;

        if !response.status_code().is_success() {
            let (status, body) = error_body(response).await;
            if body.contains("index_not_found_exception") {
                return Err(StoreError::IndexNotFound {
                    index: index.to_string(),
                });
            }
            return Err(StoreError::Status {
                operation: "search".to_string(),
                status,
                body,
            });
        }

        response
            .json::<SearchResponse<T>>()
            .await
            .map_err(|e| StoreError::decode("search", e))
    }
}
