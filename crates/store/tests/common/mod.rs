//! An in-process stand-in for a single search node.
//!
//! Serves the REST endpoints the store crate calls over a real socket, keeps
//! documents in memory, and evaluates the subset of the query DSL that
//! `Query` renders. Matching is exact (no analysis), which is enough to
//! check request shapes and response decoding end to end.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tokio::task::JoinHandle;
use userdex_store::{SearchClient, StoreConfig};

/// A request as received by the fake node.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: String,
}

#[derive(Debug, Default)]
struct StoredIndex {
    settings: Value,
    mappings: Value,
    docs: BTreeMap<String, (u64, Value)>,
}

#[derive(Debug, Default)]
struct ClusterState {
    indices: BTreeMap<String, StoredIndex>,
    requests: Vec<RecordedRequest>,
}

type Shared = Arc<Mutex<ClusterState>>;

/// A running fake node. The server stops when this is dropped.
pub struct FakeCluster {
    url: String,
    state: Shared,
    handle: JoinHandle<()>,
}

impl FakeCluster {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(ClusterState::default()));

        let app = Router::new()
            .route("/{index}", any(index_route))
            .route("/{index}/{action}", any(action_route))
            .route("/{index}/{action}/{id}", any(document_route))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake cluster");
        let addr = listener.local_addr().expect("fake cluster address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn config(&self) -> StoreConfig {
        StoreConfig {
            request_timeout_ms: 5000,
            ..StoreConfig::with_node(self.url.clone())
        }
    }

    pub fn client(&self) -> SearchClient {
        SearchClient::new(self.config()).expect("client for fake cluster")
    }

    /// Stores a document directly, creating the index if needed.
    pub fn seed(&self, index: &str, id: &str, doc: Value) {
        let mut state = self.state.lock();
        let stored = state.indices.entry(index.to_string()).or_default();
        stored.docs.insert(id.to_string(), (1, doc));
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        let state = self.state.lock();
        state
            .indices
            .get(index)
            .and_then(|i| i.docs.get(id))
            .map(|(_, doc)| doc.clone())
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.state.lock().indices.contains_key(index)
    }

    pub fn doc_count(&self, index: &str) -> usize {
        self.state
            .lock()
            .indices
            .get(index)
            .map_or(0, |i| i.docs.len())
    }

    pub fn mappings(&self, index: &str) -> Option<Value> {
        self.state
            .lock()
            .indices
            .get(index)
            .map(|i| i.mappings.clone())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Body of the most recent request whose path ends with `suffix`.
    pub fn last_body(&self, suffix: &str) -> Option<String> {
        self.state
            .lock()
            .requests
            .iter()
            .rev()
            .find(|r| r.path.ends_with(suffix))
            .map(|r| r.body.clone())
    }
}

impl Drop for FakeCluster {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ============================================================================
// Routing
// ============================================================================

fn reply(status: StatusCode, body: Value) -> Response {
    (status, axum::Json(body)).into_response()
}

fn error_reply(status: StatusCode, kind: &str, reason: String) -> Response {
    reply(
        status,
        json!({
            "error": {
                "root_cause": [{ "type": kind, "reason": reason }],
                "type": kind,
                "reason": reason
            },
            "status": status.as_u16()
        }),
    )
}

fn index_missing(index: &str) -> Response {
    error_reply(
        StatusCode::NOT_FOUND,
        "index_not_found_exception",
        format!("no such index [{}]", index),
    )
}

fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(body).unwrap_or_else(|_| json!({}))
}

fn record(state: &Shared, method: &Method, path: String, body: &str) {
    state.lock().requests.push(RecordedRequest {
        method: method.clone(),
        path,
        body: body.to_string(),
    });
}

async fn index_route(
    State(state): State<Shared>,
    method: Method,
    Path(index): Path<String>,
    body: String,
) -> Response {
    record(&state, &method, format!("/{}", index), &body);

    if index == "_bulk" {
        return bulk(&state, &body, None);
    }

    let mut guard = state.lock();
    match method {
        Method::PUT => {
            if guard.indices.contains_key(&index) {
                return error_reply(
                    StatusCode::BAD_REQUEST,
                    "resource_already_exists_exception",
                    format!("index [{}] already exists", index),
                );
            }
            let body = parse_body(&body);
            guard.indices.insert(
                index.clone(),
                StoredIndex {
                    settings: body.get("settings").cloned().unwrap_or_else(|| json!({})),
                    mappings: body.get("mappings").cloned().unwrap_or_else(|| json!({})),
                    docs: BTreeMap::new(),
                },
            );
            reply(
                StatusCode::OK,
                json!({ "acknowledged": true, "shards_acknowledged": true, "index": index }),
            )
        }
        Method::GET => {
            let mut out = Map::new();
            for (name, stored) in &guard.indices {
                if index == "*" || *name == index {
                    out.insert(
                        name.clone(),
                        json!({
                            "aliases": {},
                            "mappings": stored.mappings,
                            "settings": { "index": stored.settings }
                        }),
                    );
                }
            }
            if out.is_empty() && index != "*" {
                return index_missing(&index);
            }
            reply(StatusCode::OK, Value::Object(out))
        }
        Method::HEAD => {
            if guard.indices.contains_key(&index) {
                StatusCode::OK.into_response()
            } else {
                StatusCode::NOT_FOUND.into_response()
            }
        }
        Method::DELETE => {
            if guard.indices.remove(&index).is_none() {
                return index_missing(&index);
            }
            reply(StatusCode::OK, json!({ "acknowledged": true }))
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

async fn action_route(
    State(state): State<Shared>,
    method: Method,
    Path((index, action)): Path<(String, String)>,
    body: String,
) -> Response {
    record(&state, &method, format!("/{}/{}", index, action), &body);

    if action == "_bulk" {
        return bulk(&state, &body, Some(index.as_str()));
    }

    if index == "_cluster" && action == "health" {
        return reply(
            StatusCode::OK,
            json!({ "cluster_name": "fake", "status": "green", "number_of_nodes": 1 }),
        );
    }

    let body = parse_body(&body);
    let mut guard = state.lock();
    let Some(stored) = guard.indices.get_mut(&index) else {
        return index_missing(&index);
    };

    match action.as_str() {
        "_search" => reply(StatusCode::OK, search(&index, stored, &body)),
        "_count" => {
            let query = body.get("query").cloned().unwrap_or(json!({ "match_all": {} }));
            let count = stored
                .docs
                .values()
                .filter(|(_, doc)| matches(&query, doc))
                .count();
            reply(StatusCode::OK, json!({ "count": count }))
        }
        "_delete_by_query" => {
            let query = body.get("query").cloned().unwrap_or(json!({ "match_all": {} }));
            let before = stored.docs.len();
            stored.docs.retain(|_, (_, doc)| !matches(&query, doc));
            let deleted = before - stored.docs.len();
            reply(
                StatusCode::OK,
                json!({
                    "took": 3,
                    "timed_out": false,
                    "total": deleted,
                    "deleted": deleted,
                    "batches": 1,
                    "failures": []
                }),
            )
        }
        "_refresh" => reply(
            StatusCode::OK,
            json!({ "_shards": { "total": 1, "successful": 1, "failed": 0 } }),
        ),
        _ => error_reply(
            StatusCode::BAD_REQUEST,
            "illegal_argument_exception",
            format!("unsupported action [{}]", action),
        ),
    }
}

async fn document_route(
    State(state): State<Shared>,
    method: Method,
    Path((index, action, id)): Path<(String, String, String)>,
    body: String,
) -> Response {
    record(&state, &method, format!("/{}/{}/{}", index, action, id), &body);
    let body = parse_body(&body);
    let mut guard = state.lock();

    match (action.as_str(), method) {
        ("_create", _) => {
            let stored = guard.indices.entry(index.clone()).or_default();
            if stored.docs.contains_key(&id) {
                return error_reply(
                    StatusCode::CONFLICT,
                    "version_conflict_engine_exception",
                    format!("[{}]: version conflict, document already exists", id),
                );
            }
            stored.docs.insert(id.clone(), (1, body));
            reply(StatusCode::CREATED, write_result(&index, &id, 1, "created"))
        }
        ("_doc", Method::PUT) | ("_doc", Method::POST) => {
            let stored = guard.indices.entry(index.clone()).or_default();
            let (version, result) = match stored.docs.get(&id) {
                Some((v, _)) => (v + 1, "updated"),
                None => (1, "created"),
            };
            stored.docs.insert(id.clone(), (version, body));
            let status = if result == "created" {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            reply(status, write_result(&index, &id, version, result))
        }
        ("_doc", Method::GET) => {
            let Some(stored) = guard.indices.get(&index) else {
                return index_missing(&index);
            };
            match stored.docs.get(&id) {
                Some((version, doc)) => reply(
                    StatusCode::OK,
                    json!({
                        "_index": index,
                        "_id": id,
                        "_version": version,
                        "found": true,
                        "_source": doc
                    }),
                ),
                None => reply(
                    StatusCode::NOT_FOUND,
                    json!({ "_index": index, "_id": id, "found": false }),
                ),
            }
        }
        ("_doc", Method::DELETE) => {
            let Some(stored) = guard.indices.get_mut(&index) else {
                return index_missing(&index);
            };
            match stored.docs.remove(&id) {
                Some((version, _)) => reply(
                    StatusCode::OK,
                    write_result(&index, &id, version + 1, "deleted"),
                ),
                None => reply(
                    StatusCode::NOT_FOUND,
                    write_result(&index, &id, 1, "not_found"),
                ),
            }
        }
        ("_update", _) => {
            let missing = || {
                error_reply(
                    StatusCode::NOT_FOUND,
                    "document_missing_exception",
                    format!("[{}]: document missing", id),
                )
            };
            let Some(stored) = guard.indices.get_mut(&index) else {
                return missing();
            };
            let Some((version, doc)) = stored.docs.get_mut(&id) else {
                return missing();
            };

            let before = doc.clone();
            if let (Some(target), Some(partial)) = (
                doc.as_object_mut(),
                body.get("doc").and_then(|d| d.as_object()),
            ) {
                for (k, v) in partial {
                    target.insert(k.clone(), v.clone());
                }
            }
            let result = if *doc == before {
                "noop"
            } else {
                *version += 1;
                "updated"
            };

            let mut out = write_result(&index, &id, *version, result);
            out["get"] = json!({ "found": true, "_source": doc.clone() });
            reply(StatusCode::OK, out)
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

fn write_result(index: &str, id: &str, version: u64, result: &str) -> Value {
    json!({
        "_index": index,
        "_id": id,
        "_version": version,
        "result": result,
        "_shards": { "total": 1, "successful": 1, "failed": 0 }
    })
}

// ============================================================================
// Bulk
// ============================================================================

fn bulk(state: &Shared, body: &str, default_index: Option<&str>) -> Response {
    let mut lines = body.lines().filter(|l| !l.trim().is_empty());
    let mut items = Vec::new();
    let mut errors = false;
    let mut guard = state.lock();

    while let Some(line) = lines.next() {
        let action: Value = serde_json::from_str(line).unwrap_or_else(|_| json!({}));
        let Some((kind, meta)) = action.as_object().and_then(|o| o.iter().next()) else {
            continue;
        };
        let kind = kind.clone();
        let index = meta["_index"]
            .as_str()
            .or(default_index)
            .unwrap_or_default()
            .to_string();
        let id = meta["_id"].as_str().unwrap_or_default().to_string();

        let item = match kind.as_str() {
            "index" | "create" => {
                let source: Value = lines
                    .next()
                    .and_then(|l| serde_json::from_str(l).ok())
                    .unwrap_or_else(|| json!({}));
                let stored = guard.indices.entry(index.clone()).or_default();
                match stored.docs.get(&id) {
                    Some(_) if kind == "create" => {
                        errors = true;
                        json!({
                            "_index": index,
                            "_id": id,
                            "status": 409,
                            "error": {
                                "type": "version_conflict_engine_exception",
                                "reason": format!("[{}]: version conflict, document already exists", id)
                            }
                        })
                    }
                    Some((version, _)) => {
                        let version = version + 1;
                        stored.docs.insert(id.clone(), (version, source));
                        json!({ "_index": index, "_id": id, "_version": version, "result": "updated", "status": 200 })
                    }
                    None => {
                        stored.docs.insert(id.clone(), (1, source));
                        json!({ "_index": index, "_id": id, "_version": 1, "result": "created", "status": 201 })
                    }
                }
            }
            "delete" => {
                let removed = guard
                    .indices
                    .get_mut(&index)
                    .and_then(|s| s.docs.remove(&id));
                match removed {
                    Some(_) => {
                        json!({ "_index": index, "_id": id, "result": "deleted", "status": 200 })
                    }
                    None => {
                        json!({ "_index": index, "_id": id, "result": "not_found", "status": 404 })
                    }
                }
            }
            _ => continue,
        };
        items.push(json!({ kind: item }));
    }

    reply(
        StatusCode::OK,
        json!({ "took": items.len(), "errors": errors, "items": items }),
    )
}

// ============================================================================
// Search evaluation
// ============================================================================

fn search(index: &str, stored: &StoredIndex, body: &Value) -> Value {
    let query = body.get("query").cloned().unwrap_or(json!({ "match_all": {} }));
    let mut hits: Vec<(&String, &Value)> = stored
        .docs
        .iter()
        .map(|(id, (_, doc))| (id, doc))
        .filter(|(_, doc)| matches(&query, doc))
        .collect();

    let sort_keys: Vec<(String, bool)> = body
        .get("sort")
        .and_then(|s| s.as_array())
        .map(|keys| {
            keys.iter()
                .filter_map(|k| k.as_object().and_then(|o| o.iter().next()))
                .map(|(field, clause)| (field.clone(), clause["order"] == "desc"))
                .collect()
        })
        .unwrap_or_default();

    for (field, desc) in sort_keys.iter().rev() {
        hits.sort_by(|a, b| {
            let ord = compare(a.1.get(field), b.1.get(field));
            if *desc { ord.reverse() } else { ord }
        });
    }

    let aggregations = aggregate(body.get("aggs"), &hits);
    let total = hits.len();
    let from = body.get("from").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
    let size = body.get("size").and_then(|v| v.as_u64()).unwrap_or(10) as usize;
    let sorted = !sort_keys.is_empty();

    let page: Vec<Value> = hits
        .into_iter()
        .skip(from)
        .take(size)
        .map(|(id, doc)| {
            let mut hit = json!({
                "_index": index,
                "_id": id,
                "_score": if sorted { Value::Null } else { json!(1.0) },
                "_source": filter_source(doc, body.get("_source")),
            });
            if let Some(fields) = body.pointer("/highlight/fields").and_then(|f| f.as_object()) {
                hit["highlight"] = highlight(doc, fields);
            }
            if sorted {
                hit["sort"] = Value::Array(
                    sort_keys
                        .iter()
                        .map(|(f, _)| doc.get(f).cloned().unwrap_or(Value::Null))
                        .collect(),
                );
            }
            hit
        })
        .collect();

    let mut response = json!({
        "took": 1,
        "timed_out": false,
        "hits": {
            "total": { "value": total, "relation": "eq" },
            "max_score": if sorted || total == 0 { Value::Null } else { json!(1.0) },
            "hits": page
        }
    });
    if let Some(aggs) = aggregations {
        response["aggregations"] = aggs;
    }
    response
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field_clause<'a>(body: &'a Value, key: &str) -> Option<(&'a str, &'a Value)> {
    let (field, clause) = body.as_object()?.iter().next()?;
    let value = match clause {
        Value::Object(o) => o.get(key)?,
        other => other,
    };
    Some((field.as_str(), value))
}

fn matches(query: &Value, doc: &Value) -> bool {
    let Some((kind, body)) = query.as_object().and_then(|o| o.iter().next()) else {
        return false;
    };

    match kind.as_str() {
        "match_all" => true,
        "match" | "term" => {
            let key = if kind == "match" { "query" } else { "value" };
            field_clause(body, key)
                .is_some_and(|(f, v)| doc.get(f).is_some_and(|d| text(d) == text(v)))
        }
        "range" => {
            let Some((field, bounds)) = body.as_object().and_then(|o| o.iter().next()) else {
                return false;
            };
            let Some(actual) = doc.get(field).and_then(|v| v.as_f64()) else {
                return false;
            };
            let bound = |k: &str| bounds.get(k).and_then(|v| v.as_f64());
            bound("gt").is_none_or(|b| actual > b)
                && bound("gte").is_none_or(|b| actual >= b)
                && bound("lt").is_none_or(|b| actual < b)
                && bound("lte").is_none_or(|b| actual <= b)
        }
        "fuzzy" => {
            let Some((field, clause)) = body.as_object().and_then(|o| o.iter().next()) else {
                return false;
            };
            let wanted = text(&clause["value"]);
            let Some(actual) = doc.get(field).map(text) else {
                return false;
            };
            let max_edits = match clause["fuzziness"].as_str().unwrap_or("AUTO") {
                "AUTO" => match wanted.chars().count() {
                    0..=2 => 0,
                    3..=5 => 1,
                    _ => 2,
                },
                n => n.parse().unwrap_or(0),
            };
            edit_distance(&wanted, &actual) <= max_edits
        }
        "bool" => {
            let group = |k: &str| {
                body.get(k)
                    .and_then(|g| g.as_array())
                    .cloned()
                    .unwrap_or_default()
            };
            let must = group("must");
            let filter = group("filter");
            let should = group("should");
            let must_not = group("must_not");

            must.iter().all(|q| matches(q, doc))
                && filter.iter().all(|q| matches(q, doc))
                && !must_not.iter().any(|q| matches(q, doc))
                && (should.is_empty()
                    || !must.is_empty()
                    || !filter.is_empty()
                    || should.iter().any(|q| matches(q, doc)))
        }
        _ => false,
    }
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut row = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(row[j] + 1);
        }
        prev = row;
    }
    prev[b.len()]
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.and_then(|v| v.as_f64()), b.and_then(|v| v.as_f64())) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.map(text).cmp(&b.map(text)),
    }
}

fn filter_source(doc: &Value, filter: Option<&Value>) -> Value {
    let Some(filter) = filter else {
        return doc.clone();
    };
    let list = |k: &str| -> Vec<String> {
        filter
            .get(k)
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|s| s.as_str().map(String::from)).collect())
            .unwrap_or_default()
    };
    let includes = list("includes");
    let excludes = list("excludes");

    let mut out = Map::new();
    if let Some(fields) = doc.as_object() {
        for (k, v) in fields {
            let included = includes.is_empty() || includes.contains(k);
            if included && !excludes.contains(k) {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    Value::Object(out)
}

fn highlight(doc: &Value, fields: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    for (field, clause) in fields {
        let Some(value) = doc.get(field) else {
            continue;
        };
        let pre = clause.pointer("/pre_tags/0").and_then(|v| v.as_str()).unwrap_or("<em>");
        let post = clause.pointer("/post_tags/0").and_then(|v| v.as_str()).unwrap_or("</em>");
        out.insert(
            field.clone(),
            json!([format!("{}{}{}", pre, text(value), post)]),
        );
    }
    Value::Object(out)
}

fn aggregate(aggs: Option<&Value>, hits: &[(&String, &Value)]) -> Option<Value> {
    let aggs = aggs?.as_object()?;
    let mut out = Map::new();

    for (name, clause) in aggs {
        let Some((kind, params)) = clause.as_object().and_then(|o| o.iter().next()) else {
            continue;
        };
        let field = params["field"].as_str().unwrap_or_default();
        let numbers: Vec<f64> = hits
            .iter()
            .filter_map(|(_, doc)| doc.get(field).and_then(|v| v.as_f64()))
            .collect();

        let result = match kind.as_str() {
            "max" => json!({ "value": numbers.iter().cloned().reduce(f64::max) }),
            "min" => json!({ "value": numbers.iter().cloned().reduce(f64::min) }),
            "avg" => {
                let avg = (!numbers.is_empty())
                    .then(|| numbers.iter().sum::<f64>() / numbers.len() as f64);
                json!({ "value": avg })
            }
            "terms" => {
                let mut counts: BTreeMap<String, (Value, u64)> = BTreeMap::new();
                for (_, doc) in hits {
                    if let Some(v) = doc.get(field) {
                        counts.entry(text(v)).or_insert((v.clone(), 0)).1 += 1;
                    }
                }
                let mut buckets: Vec<(Value, u64)> = counts.into_values().collect();
                buckets.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| text(&a.0).cmp(&text(&b.0))));
                let buckets: Vec<Value> = buckets
                    .into_iter()
                    .map(|(key, count)| json!({ "key": key, "doc_count": count }))
                    .collect();
                json!({
                    "doc_count_error_upper_bound": 0,
                    "sum_other_doc_count": 0,
                    "buckets": buckets
                })
            }
            _ => continue,
        };
        out.insert(name.clone(), result);
    }

    Some(Value::Object(out))
}
