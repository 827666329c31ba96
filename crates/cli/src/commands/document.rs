//! Document routines on the user index.

use clap::Subcommand;
use rand::Rng;
use tracing::{info, warn};
use userdex_store::{
    BulkRequest, BulkResponse, Document, Query, SearchClient, SearchRequest, SearchResponse, User,
    sample_users,
};

const INSERT_TEL_BOUND: i64 = 1_000_000_000;
const UPDATE_TEL_BOUND: i64 = 100_000_000;

#[derive(Subcommand, Debug, Clone)]
pub enum DocCommand {
    /// Create one user document
    Insert {
        /// Document id.
        #[arg(long, default_value = "22222")]
        id: String,
    },

    /// Partially update a user document
    Update {
        /// Document id.
        #[arg(long, default_value = "22222")]
        id: String,
    },

    /// Fetch a user document
    Get {
        /// Document id.
        #[arg(long, default_value = "22222")]
        id: String,
    },

    /// Find users by sex
    SearchSex {
        /// Value to match.
        #[arg(long, default_value = "男")]
        sex: String,
    },

    /// Index sample users in one bulk request, keyed by age
    BulkInsert {
        /// Number of users.
        #[arg(long, default_value = "100")]
        count: usize,
    },

    /// Delete the sample users in one bulk request
    BulkDelete {
        /// Number of users.
        #[arg(long, default_value = "100")]
        count: usize,
    },

    /// Delete every user with a matching name
    DeleteByName {
        /// Name to match.
        #[arg(long, default_value = "肖杰")]
        name: String,
    },

    /// Delete a user document
    Delete {
        /// Document id.
        #[arg(long, default_value = "22222")]
        id: String,
    },
}

fn random_tel(bound: i64) -> i64 {
    rand::rng().random_range(0..bound)
}

fn new_user(tel: i64) -> User {
    User::new("肖杰", "男", 30, tel)
}

fn changed_user(tel: i64) -> User {
    User::new("大牛子", "女", 22, tel)
}

fn bulk_insert_request(count: usize) -> BulkRequest<User> {
    sample_users(count)
        .into_iter()
        .fold(BulkRequest::new(), |req, user| {
            let id = user.age.unwrap_or_default().to_string();
            req.index(User::index_name(), id, user)
        })
}

fn bulk_delete_request(count: usize) -> BulkRequest<User> {
    (0..count).fold(BulkRequest::new(), |req, i| {
        req.delete(User::index_name(), i.to_string())
    })
}

pub async fn run(client: &SearchClient, command: &DocCommand) -> anyhow::Result<()> {
    let index = User::index_name();

    match command {
        DocCommand::Insert { id } => {
            let user = new_user(random_tel(INSERT_TEL_BOUND));
            let written = client.create_document(index, id, &user).await?;
            info!(
                index = %written.index,
                id = %written.id,
                version = written.version,
                result = %written.result,
                "Inserted {}",
                user
            );
        }
        DocCommand::Update { id } => {
            let partial = changed_user(random_tel(UPDATE_TEL_BOUND));
            let updated = client
                .update_document::<_, User>(index, id, &partial)
                .await?;
            info!(
                id = %updated.write.id,
                version = updated.write.version,
                result = %updated.write.result,
                "Updated document"
            );
            match updated.source {
                Some(user) => info!(id = %id, "Now {}", user),
                None => info!(id = %id, "No source returned"),
            }
        }
        DocCommand::Get { id } => match client.get_document::<User>(index, id).await? {
            Some(found) => {
                let user = found.source.unwrap_or_default();
                info!(id = %found.id, version = ?found.version, "Found {}", user);
            }
            None => info!(id = %id, "Document not found"),
        },
        DocCommand::SearchSex { sex } => {
            let request = SearchRequest::new(index).query(Query::matching("sex", sex.as_str()));
            let response = client.search::<User>(&request).await?;
            log_hits(&response);
        }
        DocCommand::BulkInsert { count } => {
            let response = client.bulk(bulk_insert_request(*count)).await?;
            log_bulk(&response);
        }
        DocCommand::BulkDelete { count } => {
            let response = client.bulk(bulk_delete_request(*count)).await?;
            log_bulk(&response);
        }
        DocCommand::DeleteByName { name } => {
            let response = client
                .delete_by_query(index, &Query::matching("name", name.as_str()))
                .await?;
            info!(
                took = response.took,
                total = response.total,
                deleted = response.deleted,
                failures = response.failures.len(),
                "Deleted by query"
            );
        }
        DocCommand::Delete { id } => {
            let written = client.delete_document(index, id).await?;
            info!(
                id = %written.id,
                version = written.version,
                result = %written.result,
                "Deleted document"
            );
        }
    }
    Ok(())
}

/// Logs the total and every hit of a user search.
pub(crate) fn log_hits(response: &SearchResponse<User>) {
    match response.hits.total {
        Some(total) if total.is_exact() => info!(total = total.value, "Total hits"),
        Some(total) => info!(total = total.value, "Total hits (lower bound)"),
        None => info!("Total hits not tracked"),
    }
    info!(took = response.took, max_score = ?response.hits.max_score, "Search finished");

    for hit in &response.hits.hits {
        match &hit.source {
            Some(user) => info!(id = %hit.id, score = ?hit.score, "{}", user),
            None => info!(id = %hit.id, score = ?hit.score, "Hit without source"),
        }
    }
}

fn log_bulk(response: &BulkResponse) {
    info!(took = response.took, items = response.items.len(), "Bulk finished");
    if response.errors {
        warn!("bulk failed");
        for item in response.failures() {
            let reason = item
                .error
                .as_ref()
                .and_then(|e| e.reason.as_deref())
                .unwrap_or("unknown");
            warn!(action = %item.action, id = %item.id, status = item.status, reason, "Item failed");
        }
        return;
    }
    for item in &response.items {
        let result = item.result.as_deref().unwrap_or("unknown");
        info!(action = %item.action, id = %item.id, result, "Item");
    }
}
