//! Full JSON export of the document store

use serde_json::{Map, Value};

use crate::{
    error::AppResult,
    models::user::UserClaims,
    repository::Repository,
    store::collections,
};

#[derive(Clone)]
pub struct BackupService {
    repository: Repository,
}

impl BackupService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Every collection as `{collection: [{id, ...fields}]}`. Password
    /// hashes are exported too, so the dump is admin-only.
    pub async fn export(&self, admin: &UserClaims) -> AppResult<Value> {
        admin.require_admin()?;

        let mut dump = Map::new();
        for collection in collections::ALL {
            let documents = self.repository.dump(collection).await?;
            let records: Vec<Value> = documents
                .into_iter()
                .map(|doc| {
                    let mut record = Map::new();
                    record.insert("id".to_string(), Value::String(doc.id));
                    if let Value::Object(fields) = doc.data {
                        record.extend(fields);
                    }
                    Value::Object(record)
                })
                .collect();
            dump.insert(collection.to_string(), Value::Array(records));
        }

        tracing::info!("Backup exported by {}", admin.sub);
        Ok(Value::Object(dump))
    }
}
