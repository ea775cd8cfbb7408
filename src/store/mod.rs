//! Document store: the persistence and change-notification layer
//!
//! Records live in named collections keyed by string id. Every write to a
//! collection pushes a full snapshot of that collection to its subscribers.

pub mod memory;
pub mod postgres;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::error::{AppError, AppResult};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Collection names
pub mod collections {
    pub const SYSTEMS: &str = "systems";
    /// Checklists, one document per device id
    pub const DETAILS: &str = "details";
    pub const LOGS: &str = "logs";
    pub const HISTORY: &str = "history";
    pub const INCIDENTS: &str = "incidents";
    pub const MAINTENANCE: &str = "maintenance";
    pub const MATERIAL_HISTORY: &str = "material_history";
    pub const USERS: &str = "users";
    pub const CATEGORIES: &str = "categories";

    pub const ALL: [&str; 9] = [
        SYSTEMS,
        DETAILS,
        LOGS,
        HISTORY,
        INCIDENTS,
        MAINTENANCE,
        MATERIAL_HISTORY,
        USERS,
        CATEGORIES,
    ];

    pub fn is_known(name: &str) -> bool {
        ALL.contains(&name)
    }
}

/// A stored record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Deserialize the record, exposing the document id as its `id` field
    pub fn decode<T: DeserializeOwned>(&self) -> AppResult<T> {
        let mut data = self.data.clone();
        if let Some(map) = data.as_object_mut() {
            map.insert("id".to_string(), Value::String(self.id.clone()));
        }
        Ok(serde_json::from_value(data)?)
    }
}

/// Serialize a record for storage; the id lives in the key, not the body
pub fn encode<T: Serialize>(record: &T) -> AppResult<Value> {
    let mut data = serde_json::to_value(record)?;
    let Some(map) = data.as_object_mut() else {
        return Err(AppError::Internal("Documents must be JSON objects".to_string()));
    };
    map.remove("id");
    Ok(data)
}

/// One write inside a collection batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Upsert { id: String, data: Value, merge: bool },
    Delete { id: String },
}

/// Apply `patch` over `current`: top-level keys replace, others are kept
pub fn merge_into(current: &mut Value, patch: Value) {
    match (current, patch) {
        (Value::Object(current), Value::Object(patch)) => {
            for (key, value) in patch {
                current.insert(key, value);
            }
        }
        (current, patch) => *current = patch,
    }
}

/// Full contents of a collection after a write
pub type Snapshot = Arc<Vec<Document>>;

/// Live feed of one collection; dropping it unsubscribes
pub struct Subscription {
    collection: String,
    receiver: broadcast::Receiver<Snapshot>,
}

impl Subscription {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Wait for the next snapshot. Skips over snapshots missed while lagging.
    pub async fn next(&mut self) -> Option<Snapshot> {
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Subscriber to {} skipped {} snapshots", self.collection, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Snapshot> {
        BroadcastStream::new(self.receiver).filter_map(|snapshot| snapshot.ok())
    }
}

/// Per-collection broadcast channels shared by the store backends
#[derive(Default)]
pub struct ChangeFeed {
    senders: Mutex<HashMap<String, broadcast::Sender<Snapshot>>>,
}

impl ChangeFeed {
    const CAPACITY: usize = 16;

    pub async fn subscribe(&self, collection: &str) -> Subscription {
        let mut senders = self.senders.lock().await;
        let sender = senders
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(Self::CAPACITY).0);
        Subscription {
            collection: collection.to_string(),
            receiver: sender.subscribe(),
        }
    }

    pub async fn has_subscribers(&self, collection: &str) -> bool {
        self.senders
            .lock()
            .await
            .get(collection)
            .map(|s| s.receiver_count() > 0)
            .unwrap_or(false)
    }

    pub async fn publish(&self, collection: &str, documents: Vec<Document>) {
        let mut senders = self.senders.lock().await;
        if let Some(sender) = senders.get(collection) {
            if sender.send(Arc::new(documents)).is_err() {
                // Last subscriber went away
                senders.remove(collection);
            }
        }
    }
}

/// Abstract document store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document of a collection, ordered by id
    async fn get_all(&self, collection: &str) -> AppResult<Vec<Document>>;

    async fn get_by_id(&self, collection: &str, id: &str) -> AppResult<Option<Document>>;

    /// Insert or update a document and return its id. A missing id generates
    /// one; `merge` keeps top-level fields absent from `data`.
    async fn upsert(
        &self,
        collection: &str,
        id: Option<String>,
        data: Value,
        merge: bool,
    ) -> AppResult<String>;

    /// Returns whether the document existed
    async fn delete(&self, collection: &str, id: &str) -> AppResult<bool>;

    /// Apply all operations to one collection, all or nothing
    async fn commit_batch(&self, collection: &str, ops: Vec<BatchOp>) -> AppResult<()>;

    async fn subscribe(&self, collection: &str) -> AppResult<Subscription>;
}
