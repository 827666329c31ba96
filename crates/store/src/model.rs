//! The user record and its index layout.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::StoreConfig;

/// A record type stored in a named index.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    /// The index documents of this type live in by default.
    fn index_name() -> &'static str;
}

/// A user: name, sex, age and phone number, all optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Sex, stored as a keyword.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    /// Age in years.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    /// Phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tel: Option<i64>,
}

impl User {
    /// Creates a user with every field set.
    pub fn new(name: impl Into<String>, sex: impl Into<String>, age: i32, tel: i64) -> Self {
        Self {
            name: Some(name.into()),
            sex: Some(sex.into()),
            age: Some(age),
            tel: Some(tel),
        }
    }
}

impl Document for User {
    fn index_name() -> &'static str {
        "user"
    }
}

fn field<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "null".to_string(),
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User(name={}, sex={}, age={}, tel={})",
            field(&self.name),
            field(&self.sex),
            field(&self.age),
            field(&self.tel)
        )
    }
}

/// Generates `count` users: name `肖杰{i}`, age `i`, sex `男` for even and
/// `女` for odd `i`, no phone number.
pub fn sample_users(count: usize) -> Vec<User> {
    (0..count)
        .map(|i| User {
            name: Some(format!("肖杰{}", i)),
            sex: Some(if i % 2 == 0 { "男" } else { "女" }.to_string()),
            age: Some(i as i32),
            tel: None,
        })
        .collect()
}

/// Settings and mappings for the user index.
///
/// `sex` is a keyword so it can be aggregated; `name` keeps a keyword
/// subfield next to the analyzed text.
pub fn user_index_mapping(config: &StoreConfig) -> Value {
    json!({
        "settings": {
            "number_of_shards": config.number_of_shards,
            "number_of_replicas": config.number_of_replicas
        },
        "mappings": {
            "properties": {
                "name": {
                    "type": "text",
                    "fields": {
                        "keyword": { "type": "keyword" }
                    }
                },
                "sex": { "type": "keyword" },
                "age": { "type": "integer" },
                "tel": { "type": "long" }
            }
        }
    })
}
