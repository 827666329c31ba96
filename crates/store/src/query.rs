//! Query DSL values.
//!
//! Each [`Query`] renders to the JSON the search service expects in a
//! `query` clause. Nothing is parsed or evaluated locally.

use serde_json::{Map, Value, json};

/// Edit distance allowed by a fuzzy query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fuzziness {
    /// Distance chosen by the service from the term length.
    Auto,
    /// A fixed number of edits.
    Edits(u8),
}

impl Fuzziness {
    /// Largest edit distance the service accepts.
    pub const MAX_EDITS: u8 = 2;

    /// Returns the DSL form (`"AUTO"` or the edit count as a string).
    pub fn to_dsl(&self) -> String {
        match self {
            Fuzziness::Auto => "AUTO".to_string(),
            Fuzziness::Edits(n) => n.to_string(),
        }
    }
}

impl std::str::FromStr for Fuzziness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Fuzziness::Auto);
        }
        match s.parse::<u8>() {
            Ok(n) if n <= Fuzziness::MAX_EDITS => Ok(Fuzziness::Edits(n)),
            _ => Err(format!(
                "invalid fuzziness '{}': expected AUTO or 0, 1, 2",
                s
            )),
        }
    }
}

/// A query clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Matches every document.
    MatchAll,
    /// Full-text match on one field.
    Match {
        /// Field name.
        field: String,
        /// Text or value to match.
        query: Value,
    },
    /// Exact term on one field.
    Term {
        /// Field name.
        field: String,
        /// Exact value.
        value: Value,
    },
    /// Boolean combination of clauses.
    Bool(BoolQuery),
    /// Bounded range on one field.
    Range(RangeQuery),
    /// Term match within an edit distance.
    Fuzzy {
        /// Field name.
        field: String,
        /// Value to match approximately.
        value: Value,
        /// Allowed edit distance.
        fuzziness: Fuzziness,
    },
}

/// The clauses of a bool query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    /// All of these must match.
    pub must: Vec<Query>,
    /// At least one of these should match when there is no `must`.
    pub should: Vec<Query>,
    /// None of these may match.
    pub must_not: Vec<Query>,
    /// Must match, without scoring.
    pub filter: Vec<Query>,
}

/// A range query; unset bounds are left open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeQuery {
    /// Field name.
    pub field: String,
    /// Exclusive lower bound.
    pub gt: Option<Value>,
    /// Inclusive lower bound.
    pub gte: Option<Value>,
    /// Exclusive upper bound.
    pub lt: Option<Value>,
    /// Inclusive upper bound.
    pub lte: Option<Value>,
}

impl RangeQuery {
    /// Starts a range on `field` with no bounds.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    /// Sets the exclusive lower bound.
    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    /// Sets the inclusive lower bound.
    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    /// Sets the exclusive upper bound.
    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }

    /// Sets the inclusive upper bound.
    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut bounds = Map::new();
        let pairs = [
            ("gt", &self.gt),
            ("gte", &self.gte),
            ("lt", &self.lt),
            ("lte", &self.lte),
        ];
        for (key, bound) in pairs {
            if let Some(v) = bound {
                bounds.insert(key.to_string(), v.clone());
            }
        }
        json!({ "range": { self.field.clone(): Value::Object(bounds) } })
    }
}

impl BoolQuery {
    fn to_json(&self) -> Value {
        let mut clauses = Map::new();
        let groups = [
            ("must", &self.must),
            ("should", &self.should),
            ("must_not", &self.must_not),
            ("filter", &self.filter),
        ];
        for (key, group) in groups {
            if !group.is_empty() {
                clauses.insert(
                    key.to_string(),
                    Value::Array(group.iter().map(Query::to_json).collect()),
                );
            }
        }
        json!({ "bool": Value::Object(clauses) })
    }
}

impl Query {
    /// Full-text match of `query` against `field`.
    pub fn matching(field: impl Into<String>, query: impl Into<Value>) -> Self {
        Query::Match {
            field: field.into(),
            query: query.into(),
        }
    }

    /// Exact term query.
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// All of `clauses` must match.
    pub fn must(clauses: Vec<Query>) -> Self {
        Query::Bool(BoolQuery {
            must: clauses,
            ..Default::default()
        })
    }

    /// Any of `clauses` may match.
    pub fn should(clauses: Vec<Query>) -> Self {
        Query::Bool(BoolQuery {
            should: clauses,
            ..Default::default()
        })
    }

    /// Fuzzy term query.
    pub fn fuzzy(field: impl Into<String>, value: impl Into<Value>, fuzziness: Fuzziness) -> Self {
        Query::Fuzzy {
            field: field.into(),
            value: value.into(),
            fuzziness,
        }
    }

    /// Renders the clause as DSL JSON.
    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::Match { field, query } => {
                json!({ "match": { field.clone(): { "query": query } } })
            }
            Query::Term { field, value } => {
                json!({ "term": { field.clone(): { "value": value } } })
            }
            Query::Bool(b) => b.to_json(),
            Query::Range(r) => r.to_json(),
            Query::Fuzzy {
                field,
                value,
                fuzziness,
            } => json!({
                "fuzzy": {
                    field.clone(): {
                        "value": value,
                        "fuzziness": fuzziness.to_dsl()
                    }
                }
            }),
        }
    }
}

impl From<RangeQuery> for Query {
    fn from(range: RangeQuery) -> Self {
        Query::Range(range)
    }
}

impl From<BoolQuery> for Query {
    fn from(b: BoolQuery) -> Self {
        Query::Bool(b)
    }
}
