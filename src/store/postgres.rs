//! PostgreSQL document store
//!
//! Every collection shares the `documents` table; the body is JSONB. Writes
//! raise `pg_notify('document_changes', <collection>)` and a listener task
//! turns those into snapshots for local subscribers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgListener, Pool, Postgres, Transaction};
use uuid::Uuid;

use super::{BatchOp, ChangeFeed, Document, DocumentStore, Subscription};
use crate::error::AppResult;

const CHANNEL: &str = "document_changes";

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
    feed: Arc<ChangeFeed>,
}

impl PgStore {
    /// Wrap a pool and start the change listener
    pub async fn new(pool: Pool<Postgres>) -> AppResult<Self> {
        let store = Self {
            pool,
            feed: Arc::new(ChangeFeed::default()),
        };

        let mut listener = PgListener::connect_with(&store.pool).await?;
        listener.listen(CHANNEL).await?;

        let pool = store.pool.clone();
        let feed = store.feed.clone();
        tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        let collection = notification.payload();
                        if !feed.has_subscribers(collection).await {
                            continue;
                        }
                        match load_all(&pool, collection).await {
                            Ok(documents) => feed.publish(collection, documents).await,
                            Err(e) => {
                                tracing::warn!("Failed to reload {} after change: {}", collection, e)
                            }
                        }
                    }
                    // The listener reconnects on its own
                    Err(e) => tracing::warn!("Change listener error: {}", e),
                }
            }
        });

        Ok(store)
    }

    async fn notify(
        tx: &mut Transaction<'_, Postgres>,
        collection: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANNEL)
            .bind(collection)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn write_upsert(
        tx: &mut Transaction<'_, Postgres>,
        collection: &str,
        id: &str,
        data: &Value,
        merge: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO UPDATE
            SET data = CASE WHEN $4 THEN documents.data || EXCLUDED.data ELSE EXCLUDED.data END,
                updated_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(data)
        .bind(merge)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

async fn load_all(pool: &Pool<Postgres>, collection: &str) -> Result<Vec<Document>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, Value)>(
        "SELECT id, data FROM documents WHERE collection = $1 ORDER BY id",
    )
    .bind(collection)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, data)| Document { id, data })
        .collect())
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get_all(&self, collection: &str) -> AppResult<Vec<Document>> {
        Ok(load_all(&self.pool, collection).await?)
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        let row = sqlx::query_as::<_, (String, Value)>(
            "SELECT id, data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, data)| Document { id, data }))
    }

    async fn upsert(
        &self,
        collection: &str,
        id: Option<String>,
        data: Value,
        merge: bool,
    ) -> AppResult<String> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut tx = self.pool.begin().await?;
        Self::write_upsert(&mut tx, collection, &id, &data, merge).await?;
        Self::notify(&mut tx, collection).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let existed = result.rows_affected() > 0;
        if existed {
            Self::notify(&mut tx, collection).await?;
        }
        tx.commit().await?;
        Ok(existed)
    }

    async fn commit_batch(&self, collection: &str, ops: Vec<BatchOp>) -> AppResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for op in &ops {
            match op {
                BatchOp::Upsert { id, data, merge } => {
                    Self::write_upsert(&mut tx, collection, id, data, *merge).await?
                }
                BatchOp::Delete { id } => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                        .bind(collection)
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        Self::notify(&mut tx, collection).await?;
        tx.commit().await?;
        tracing::debug!("Committed {} operations on {}", ops.len(), collection);
        Ok(())
    }

    async fn subscribe(&self, collection: &str) -> AppResult<Subscription> {
        Ok(self.feed.subscribe(collection).await)
    }
}
