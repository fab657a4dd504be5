//! Key-path addressed document store holding the business records.
//!
//! Paths are `/`-separated (`bookings/B1`, `dailyVisitors/2026-10-19/v7`). Every operation
//! is atomic for the path it touches; nothing spans more than one record path.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use rentdesk_core::config::DatabaseConfig;

pub mod memory;
pub mod sql;

pub use memory::InMemoryDocumentStore;
pub use sql::SqlDocumentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid store path `{0}`")]
    InvalidPath(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One child of a collection: its key and the document stored under it.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub key: String,
    pub value: Value,
}

/// Several collections read in one pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    collections: BTreeMap<String, Vec<Record>>,
}

impl Snapshot {
    pub fn insert(&mut self, collection: &str, records: Vec<Record>) {
        self.collections.insert(collection.to_string(), records);
    }

    pub fn records(&self, collection: &str) -> &[Record] {
        self.collections.get(collection).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Children of the node at `collection`, in the store's natural key order. A missing
    /// node reads as an empty collection.
    async fn read_all(&self, collection: &str) -> Result<Vec<Record>, StoreError>;

    /// Merges `fields` into the document at `path`, creating it if absent.
    async fn update_fields(&self, path: &str, fields: Map<String, Value>)
        -> Result<(), StoreError>;

    /// Replaces the document at `path`. Setting `null` removes it.
    async fn set(&self, path: &str, document: Value) -> Result<(), StoreError>;

    /// Removes the document at `path`. Removing an absent path succeeds.
    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Reads several collections as one consistent view.
    async fn snapshot(&self, collections: &[&str]) -> Result<Snapshot, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub type SharedStore = Arc<dyn DocumentStore>;

/// Opens the store named by `database.url`: `memory://` for a process-local tree, any
/// sqlite URL for the persisted store (migrations are applied before returning).
pub async fn open(database: &DatabaseConfig) -> Result<SharedStore, StoreError> {
    if database.is_in_memory() {
        return Ok(Arc::new(InMemoryDocumentStore::default()));
    }

    let pool = crate::connect_with_settings(
        &database.url,
        database.max_connections,
        database.timeout_secs,
    )
    .await?;
    crate::migrations::run_pending(&pool).await?;
    Ok(Arc::new(SqlDocumentStore::new(pool)))
}

pub(crate) fn split_path(path: &str) -> Result<Vec<&str>, StoreError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(StoreError::InvalidPath(path.to_string()));
    }

    let segments = trimmed.split('/').map(str::trim).collect::<Vec<_>>();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

pub(crate) fn children_of(node: Option<&Value>) -> Vec<Record> {
    match node {
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(key, value)| Record { key: key.clone(), value: value.clone() })
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn node_at<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |node, segment| node.get(*segment))
}

/// Writes `value` at `segments` below `root`, turning non-object intermediates into objects.
pub(crate) fn insert_at(root: &mut Value, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(entries) = node else {
            return;
        };
        node = entries.entry(segment.to_string()).or_insert_with(|| Value::Object(Map::new()));
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(entries) = node {
        entries.insert(last.to_string(), value);
    }
}

/// Deletes the entry at `segments`. Returns whether anything was removed.
pub(crate) fn remove_at(root: &mut Value, segments: &[&str]) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut node = root;
    for segment in parents {
        match node.get_mut(*segment) {
            Some(next) => node = next,
            None => return false,
        }
    }

    match node {
        Value::Object(entries) => entries.remove(*last).is_some(),
        _ => false,
    }
}

pub(crate) fn merge_fields(existing: Option<Value>, fields: Map<String, Value>) -> Value {
    let mut merged = match existing {
        Some(Value::Object(entries)) => entries,
        _ => Map::new(),
    };
    for (key, value) in fields {
        if value.is_null() {
            merged.remove(&key);
        } else {
            merged.insert(key, value);
        }
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{insert_at, merge_fields, node_at, remove_at, split_path, StoreError};

    #[test]
    fn split_path_rejects_empty_segments() {
        assert_eq!(split_path("/bookings/B1/").ok(), Some(vec!["bookings", "B1"]));
        assert!(matches!(split_path("bookings//B1"), Err(StoreError::InvalidPath(_))));
        assert!(matches!(split_path("  "), Err(StoreError::InvalidPath(_))));
    }

    #[test]
    fn insert_and_remove_walk_nested_objects() {
        let mut root = json!({});
        insert_at(&mut root, &["dailyVisitors", "2026-10-19", "v1"], json!({"booked": false}));
        insert_at(&mut root, &["dailyVisitors", "2026-10-19", "v2"], json!({"booked": true}));

        assert_eq!(
            node_at(&root, &["dailyVisitors", "2026-10-19", "v1"]),
            Some(&json!({"booked": false}))
        );
        assert!(remove_at(&mut root, &["dailyVisitors", "2026-10-19", "v1"]));
        assert!(!remove_at(&mut root, &["dailyVisitors", "2026-10-19", "v1"]));
        assert!(!remove_at(&mut root, &["reviews", "R1"]));
    }

    #[test]
    fn merge_fields_keeps_untouched_fields() {
        let merged = merge_fields(
            Some(json!({"name": "Asha", "status": "Active"})),
            json!({"status": "Completed"}).as_object().cloned().unwrap_or_default(),
        );
        assert_eq!(merged, json!({"name": "Asha", "status": "Completed"}));
    }
}
