//! Repository layer: typed collection access over a document store

pub mod checklists;
pub mod devices;
pub mod events;
pub mod logs;
pub mod users;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::AppResult,
    store::{self, BatchOp, DocumentStore, Subscription},
};

/// Main repository struct holding the document store
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
}

impl Repository {
    /// Create a new repository on top of the given store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Decode every document of a collection. Undecodable records are
    /// skipped with a warning so one bad row cannot hide the rest.
    pub(crate) async fn list<T: DeserializeOwned>(&self, collection: &str) -> AppResult<Vec<T>> {
        let documents = self.store.get_all(collection).await?;
        Ok(documents
            .iter()
            .filter_map(|doc| match doc.decode() {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping malformed {}/{}: {}", collection, doc.id, e);
                    None
                }
            })
            .collect())
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> AppResult<Option<T>> {
        match self.store.get_by_id(collection, id).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    /// Write a record; `None` id appends with a generated id
    pub(crate) async fn put<T: Serialize>(
        &self,
        collection: &str,
        id: Option<&str>,
        record: &T,
        merge: bool,
    ) -> AppResult<String> {
        let data = store::encode(record)?;
        self.store
            .upsert(collection, id.map(str::to_string), data, merge)
            .await
    }

    pub(crate) async fn remove(&self, collection: &str, id: &str) -> AppResult<bool> {
        self.store.delete(collection, id).await
    }

    /// Ids of every document in a collection
    pub async fn ids(&self, collection: &str) -> AppResult<Vec<String>> {
        let documents = self.store.get_all(collection).await?;
        Ok(documents.into_iter().map(|doc| doc.id).collect())
    }

    pub async fn commit_batch(&self, collection: &str, ops: Vec<BatchOp>) -> AppResult<()> {
        self.store.commit_batch(collection, ops).await
    }

    pub async fn subscribe(&self, collection: &str) -> AppResult<Subscription> {
        self.store.subscribe(collection).await
    }

    /// Raw dump of a collection
    pub async fn dump(&self, collection: &str) -> AppResult<Vec<store::Document>> {
        self.store.get_all(collection).await
    }
}
