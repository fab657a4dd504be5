use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{Row, Sqlite, Transaction};

use super::{
    children_of, insert_at, merge_fields, node_at, remove_at, split_path, DocumentStore, Record,
    Snapshot, StoreError,
};
use crate::DbPool;

/// SQLite-backed store. Each row keeps one document at the path it was written to; reads
/// reassemble a subtree from the rows at, above and below the requested path.
pub struct SqlDocumentStore {
    pool: DbPool,
}

impl SqlDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Takes the write lock at `BEGIN`, so a read-then-write never has to upgrade.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, StoreError> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }
}

const SUBTREE_QUERY: &str = "SELECT path, body FROM document
     WHERE path = ?1
        OR substr(path, 1, ?3) = ?2
        OR substr(?1, 1, length(path) + 1) = path || '/'
     ORDER BY path";

async fn load_subtree(
    tx: &mut Transaction<'_, Sqlite>,
    segments: &[&str],
) -> Result<Value, StoreError> {
    let path = segments.join("/");
    let prefix = format!("{path}/");
    let rows = sqlx::query(SUBTREE_QUERY)
        .bind(&path)
        .bind(&prefix)
        .bind(prefix.chars().count() as i64)
        .fetch_all(&mut **tx)
        .await?;

    let mut root = Value::Object(Map::new());
    for row in rows {
        let row_path: String = row.try_get("path")?;
        let body: String = row.try_get("body")?;
        let document = serde_json::from_str::<Value>(&body)
            .map_err(|error| StoreError::Decode(format!("document `{row_path}`: {error}")))?;
        let row_segments = row_path.split('/').collect::<Vec<_>>();
        insert_at(&mut root, &row_segments, document);
    }
    Ok(root)
}

/// Drops the subtree at `segments`, including copies embedded in ancestor rows.
async fn clear_path(
    tx: &mut Transaction<'_, Sqlite>,
    segments: &[&str],
) -> Result<(), StoreError> {
    let path = segments.join("/");
    let prefix = format!("{path}/");

    sqlx::query("DELETE FROM document WHERE path = ?1 OR substr(path, 1, ?3) = ?2")
        .bind(&path)
        .bind(&prefix)
        .bind(prefix.chars().count() as i64)
        .execute(&mut **tx)
        .await?;

    let ancestors = sqlx::query(
        "SELECT path, body FROM document WHERE substr(?1, 1, length(path) + 1) = path || '/'",
    )
    .bind(&path)
    .fetch_all(&mut **tx)
    .await?;

    let now = Utc::now().to_rfc3339();
    for row in ancestors {
        let ancestor_path: String = row.try_get("path")?;
        let body: String = row.try_get("body")?;
        let mut document = serde_json::from_str::<Value>(&body)
            .map_err(|error| StoreError::Decode(format!("document `{ancestor_path}`: {error}")))?;
        let depth = ancestor_path.split('/').count();
        if remove_at(&mut document, &segments[depth..]) {
            sqlx::query("UPDATE document SET body = ?2, updated_at = ?3 WHERE path = ?1")
                .bind(&ancestor_path)
                .bind(encode(&document)?)
                .bind(&now)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

async fn write_path(
    tx: &mut Transaction<'_, Sqlite>,
    segments: &[&str],
    document: &Value,
) -> Result<(), StoreError> {
    clear_path(tx, segments).await?;
    if document.is_null() {
        return Ok(());
    }

    sqlx::query("INSERT INTO document (path, body, updated_at) VALUES (?1, ?2, ?3)")
        .bind(segments.join("/"))
        .bind(encode(document)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn encode(document: &Value) -> Result<String, StoreError> {
    serde_json::to_string(document).map_err(|error| StoreError::Decode(error.to_string()))
}

#[async_trait]
impl DocumentStore for SqlDocumentStore {
    async fn read_all(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        let segments = split_path(collection)?;
        let mut tx = self.pool.begin().await?;
        let root = load_subtree(&mut tx, &segments).await?;
        tx.commit().await?;
        Ok(children_of(node_at(&root, &segments)))
    }

    async fn update_fields(
        &self,
        path: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let mut tx = self.begin_write().await?;
        let root = load_subtree(&mut tx, &segments).await?;
        let merged = merge_fields(node_at(&root, &segments).cloned(), fields);
        write_path(&mut tx, &segments, &merged).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn set(&self, path: &str, document: Value) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let mut tx = self.begin_write().await?;
        write_path(&mut tx, &segments, &document).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let mut tx = self.begin_write().await?;
        clear_path(&mut tx, &segments).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn snapshot(&self, collections: &[&str]) -> Result<Snapshot, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut snapshot = Snapshot::default();
        for collection in collections {
            let segments = split_path(collection)?;
            let root = load_subtree(&mut tx, &segments).await?;
            snapshot.insert(collection, children_of(node_at(&root, &segments)));
        }
        tx.commit().await?;
        Ok(snapshot)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
