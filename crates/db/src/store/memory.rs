use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{
    children_of, insert_at, merge_fields, node_at, remove_at, split_path, DocumentStore, Record,
    Snapshot, StoreError,
};

/// Process-local document tree. Each operation holds the lock for its whole duration.
pub struct InMemoryDocumentStore {
    root: RwLock<Value>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self { root: RwLock::new(Value::Object(Map::new())) }
    }
}

impl InMemoryDocumentStore {
    pub fn with_root(root: Value) -> Self {
        Self { root: RwLock::new(root) }
    }

    /// Document at an exact path, if any.
    pub async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let segments = split_path(path)?;
        let root = self.root.read().await;
        Ok(node_at(&root, &segments).cloned())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn read_all(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        let segments = split_path(collection)?;
        let root = self.root.read().await;
        Ok(children_of(node_at(&root, &segments)))
    }

    async fn update_fields(
        &self,
        path: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let mut root = self.root.write().await;
        let merged = merge_fields(node_at(&root, &segments).cloned(), fields);
        insert_at(&mut root, &segments, merged);
        Ok(())
    }

    async fn set(&self, path: &str, document: Value) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let mut root = self.root.write().await;
        if document.is_null() {
            remove_at(&mut root, &segments);
        } else {
            insert_at(&mut root, &segments, document);
        }
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let mut root = self.root.write().await;
        remove_at(&mut root, &segments);
        Ok(())
    }

    async fn snapshot(&self, collections: &[&str]) -> Result<Snapshot, StoreError> {
        let paths =
            collections.iter().map(|collection| split_path(collection)).collect::<Result<Vec<_>, _>>()?;
        let root = self.root.read().await;

        let mut snapshot = Snapshot::default();
        for (collection, segments) in collections.iter().zip(paths) {
            snapshot.insert(collection, children_of(node_at(&root, &segments)));
        }
        Ok(snapshot)
    }
}
