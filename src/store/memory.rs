//! Process-local document store

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{merge_into, BatchOp, ChangeFeed, Document, DocumentStore, Subscription};
use crate::error::AppResult;

type Collection = BTreeMap<String, Value>;

/// In-memory store, used for development and tests
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(collection: Option<&Collection>) -> Vec<Document> {
        collection
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn apply(docs: &mut Collection, id: String, data: Value, merge: bool) {
        if merge {
            if let Some(current) = docs.get_mut(&id) {
                merge_into(current, data);
                return;
            }
        }
        docs.insert(id, data);
    }

    async fn notify(&self, collection: &str) {
        if !self.feed.has_subscribers(collection).await {
            return;
        }
        let snapshot = {
            let collections = self.collections.read().await;
            Self::snapshot(collections.get(collection))
        };
        self.feed.publish(collection, snapshot).await;
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_all(&self, collection: &str) -> AppResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(Self::snapshot(collections.get(collection)))
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn upsert(
        &self,
        collection: &str,
        id: Option<String>,
        data: Value,
        merge: bool,
    ) -> AppResult<String> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        {
            let mut collections = self.collections.write().await;
            let docs = collections.entry(collection.to_string()).or_default();
            Self::apply(docs, id.clone(), data, merge);
        }
        self.notify(collection).await;
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<bool> {
        let existed = {
            let mut collections = self.collections.write().await;
            collections
                .get_mut(collection)
                .map(|docs| docs.remove(id).is_some())
                .unwrap_or(false)
        };
        if existed {
            self.notify(collection).await;
        }
        Ok(existed)
    }

    async fn commit_batch(&self, collection: &str, ops: Vec<BatchOp>) -> AppResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        {
            // A single write guard makes the batch visible all at once
            let mut collections = self.collections.write().await;
            let docs = collections.entry(collection.to_string()).or_default();
            for op in ops {
                match op {
                    BatchOp::Upsert { id, data, merge } => Self::apply(docs, id, data, merge),
                    BatchOp::Delete { id } => {
                        docs.remove(&id);
                    }
                }
            }
        }
        self.notify(collection).await;
        Ok(())
    }

    async fn subscribe(&self, collection: &str) -> AppResult<Subscription> {
        Ok(self.feed.subscribe(collection).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_generates_id_and_merges() {
        let store = MemoryStore::new();
        let id = store
            .upsert("systems", None, json!({"name": "Bridge 1", "status": "OK"}), false)
            .await
            .unwrap();
        assert!(Uuid::parse_str(&id).is_ok());

        store
            .upsert("systems", Some(id.clone()), json!({"status": "NOK"}), true)
            .await
            .unwrap();
        let doc = store.get_by_id("systems", &id).await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"name": "Bridge 1", "status": "NOK"}));

        store
            .upsert("systems", Some(id.clone()), json!({"status": "OK"}), false)
            .await
            .unwrap();
        let doc = store.get_by_id("systems", &id).await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"status": "OK"}));
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = MemoryStore::new();
        store
            .upsert("logs", Some("1".into()), json!({}), false)
            .await
            .unwrap();
        assert!(store.delete("logs", "1").await.unwrap());
        assert!(!store.delete("logs", "1").await.unwrap());
        assert!(!store.delete("unknown", "1").await.unwrap());
    }

    #[tokio::test]
    async fn test_batch_and_subscription() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("logs").await.unwrap();

        store
            .commit_batch(
                "logs",
                vec![
                    BatchOp::Upsert {
                        id: "b".into(),
                        data: json!({"n": 2}),
                        merge: false,
                    },
                    BatchOp::Upsert {
                        id: "a".into(),
                        data: json!({"n": 1}),
                        merge: false,
                    },
                ],
            )
            .await
            .unwrap();

        let snapshot = sub.next().await.unwrap();
        let ids: Vec<_> = snapshot.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        store
            .commit_batch("logs", vec![BatchOp::Delete { id: "a".into() }])
            .await
            .unwrap();
        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.get_all("logs").await.unwrap().len(), 1);
    }
}
