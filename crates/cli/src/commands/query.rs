//! Search routines.

use clap::Subcommand;
use serde_json::Value;
use tracing::info;
use userdex_store::{
    Aggregation, Document, Fuzziness, Query, RangeQuery, SearchClient, SearchRequest, SortOrder,
    User,
};

use super::document::log_hits;

const HIGHLIGHT_PRE: &str = "<div>";
const HIGHLIGHT_POST: &str = "</div>";

#[derive(Subcommand, Debug, Clone)]
pub enum QueryCommand {
    /// Match one field against a value
    Match {
        /// Field name.
        #[arg(long, default_value = "age")]
        field: String,
        /// Value to match.
        #[arg(long, default_value = "3")]
        value: String,
    },

    /// Return every user
    All {
        /// Number of hits.
        #[arg(long, default_value = "100")]
        size: u64,
    },

    /// Return one page of users
    Page {
        /// Offset of the first hit.
        #[arg(long, default_value = "0")]
        from: u64,
        /// Page size.
        #[arg(long, default_value = "10")]
        size: u64,
    },

    /// Return one page of ages, oldest first
    PageSorted {
        /// Offset of the first hit.
        #[arg(long, default_value = "0")]
        from: u64,
        /// Page size.
        #[arg(long, default_value = "10")]
        size: u64,
    },

    /// Users aged 1 who are 女
    Must,

    /// Users aged 30 or named 21
    Should,

    /// Documents with a field in [gte, lt)
    Range {
        /// Index to search.
        #[arg(long, default_value = "material")]
        index: String,
        /// Numeric field.
        #[arg(long, default_value = "size")]
        field: String,
        /// Inclusive lower bound.
        #[arg(long, default_value = "30")]
        gte: i64,
        /// Exclusive upper bound.
        #[arg(long, default_value = "50")]
        lt: i64,
        /// Number of hits.
        #[arg(long, default_value = "100")]
        size: u64,
    },

    /// Approximate match within an edit distance
    Fuzzy {
        /// Field name.
        #[arg(long, default_value = "name")]
        field: String,
        /// Value to match.
        #[arg(long, default_value = "肖杰")]
        value: String,
        /// Edit distance: AUTO or a number.
        #[arg(long, default_value = "1")]
        fuzziness: Fuzziness,
    },

    /// Match with highlighted fragments
    Highlight {
        /// Field name.
        #[arg(long, default_value = "name")]
        field: String,
        /// Value to match.
        #[arg(long, default_value = "肖杰")]
        value: String,
    },

    /// Largest age
    MaxAge,

    /// Number of users per sex
    GroupBySex,
}

/// Builds the search a routine sends.
pub fn build_request(command: &QueryCommand) -> SearchRequest {
    let users = User::index_name();

    match command {
        QueryCommand::Match { field, value } => {
            SearchRequest::new(users).query(Query::matching(field.as_str(), value.as_str()))
        }
        QueryCommand::All { size } => SearchRequest::new(users).size(*size),
        QueryCommand::Page { from, size } => SearchRequest::new(users).from(*from).size(*size),
        QueryCommand::PageSorted { from, size } => SearchRequest::new(users)
            .source(&["age"], &["name"])
            .sort("age", SortOrder::Desc)
            .from(*from)
            .size(*size),
        QueryCommand::Must => SearchRequest::new(users).query(Query::must(vec![
            Query::matching("age", "1"),
            Query::matching("sex", "女"),
        ])),
        QueryCommand::Should => SearchRequest::new(users).query(Query::should(vec![
            Query::matching("age", "30"),
            Query::matching("name", "21"),
        ])),
        QueryCommand::Range {
            index,
            field,
            gte,
            lt,
            size,
        } => SearchRequest::new(index.as_str())
            .query(RangeQuery::new(field.as_str()).gte(*gte).lt(*lt).into())
            .size(*size),
        QueryCommand::Fuzzy {
            field,
            value,
            fuzziness,
        } => SearchRequest::new(users).query(Query::fuzzy(
            field.as_str(),
            value.as_str(),
            *fuzziness,
        )),
        QueryCommand::Highlight { field, value } => SearchRequest::new(users)
            .query(Query::matching(field.as_str(), value.as_str()))
            .highlight(field.as_str(), HIGHLIGHT_PRE, HIGHLIGHT_POST),
        QueryCommand::MaxAge => SearchRequest::new(users).size(0).aggregation(
            "maxAge",
            Aggregation::Max {
                field: "age".to_string(),
            },
        ),
        QueryCommand::GroupBySex => SearchRequest::new(users).size(0).aggregation(
            "sex_group",
            Aggregation::Terms {
                field: "sex".to_string(),
                size: None,
            },
        ),
    }
}

pub async fn run(client: &SearchClient, command: &QueryCommand) -> anyhow::Result<()> {
    let request = build_request(command);

    match command {
        QueryCommand::Range { .. } => {
            // The range index holds arbitrary documents, not users.
            let response = client.search::<Value>(&request).await?;
            if let Some(total) = response.hits.total {
                info!(total = total.value, exact = total.is_exact(), "Total hits");
            }
            for hit in &response.hits.hits {
                let source = hit.source.clone().unwrap_or(Value::Null);
                info!(id = %hit.id, source = %source, "Hit");
            }
        }
        QueryCommand::Highlight { .. } => {
            let response = client.search::<User>(&request).await?;
            log_hits(&response);
            for hit in &response.hits.hits {
                for (field, fragments) in &hit.highlight {
                    info!(id = %hit.id, field = %field, fragments = ?fragments, "Highlight");
                }
            }
        }
        QueryCommand::MaxAge => {
            let response = client.search::<User>(&request).await?;
            match response.metric_value("maxAge") {
                Some(max) => info!(max_age = max, "Max age"),
                None => info!("Max age: no values"),
            }
        }
        QueryCommand::GroupBySex => {
            let response = client.search::<User>(&request).await?;
            for bucket in response.terms_buckets("sex_group")? {
                info!(key = %bucket.key, doc_count = bucket.doc_count, "Group");
            }
        }
        _ => {
            let response = client.search::<User>(&request).await?;
            log_hits(&response);
        }
    }
    Ok(())
}
