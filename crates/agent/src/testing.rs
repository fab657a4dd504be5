//! Store doubles shared by the unit tests in this crate.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use rentdesk_db::{DocumentStore, InMemoryDocumentStore, Record, Snapshot, StoreError};

fn unavailable() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

/// Every operation fails.
pub(crate) struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn read_all(&self, _collection: &str) -> Result<Vec<Record>, StoreError> {
        Err(unavailable())
    }

    async fn update_fields(&self, _path: &str, _fields: Map<String, Value>) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn set(&self, _path: &str, _document: Value) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn remove(&self, _path: &str) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn snapshot(&self, _collections: &[&str]) -> Result<Snapshot, StoreError> {
        Err(unavailable())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(unavailable())
    }
}

/// Delegates to an in-memory store but fails writes under one collection.
pub(crate) struct WriteFailingStore {
    inner: Arc<InMemoryDocumentStore>,
    failing_collection: &'static str,
}

impl WriteFailingStore {
    pub(crate) fn new(inner: Arc<InMemoryDocumentStore>, failing_collection: &'static str) -> Self {
        Self { inner, failing_collection }
    }

    fn check(&self, path: &str) -> Result<(), StoreError> {
        if path.split('/').next() == Some(self.failing_collection) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for WriteFailingStore {
    async fn read_all(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        self.inner.read_all(collection).await
    }

    async fn update_fields(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.check(path)?;
        self.inner.update_fields(path, fields).await
    }

    async fn set(&self, path: &str, document: Value) -> Result<(), StoreError> {
        self.check(path)?;
        self.inner.set(path, document).await
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.check(path)?;
        self.inner.remove(path).await
    }

    async fn snapshot(&self, collections: &[&str]) -> Result<Snapshot, StoreError> {
        self.inner.snapshot(collections).await
    }
}
