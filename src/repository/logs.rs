//! Append-only event records: inspection logs, fix history, material history

use super::Repository;
use crate::{
    error::AppResult,
    models::{history::HistoryItem, inspection_log::InspectionLog, material::MaterialHistory},
    store::collections::{HISTORY, LOGS, MATERIAL_HISTORY},
};

impl Repository {
    pub async fn logs_list(&self) -> AppResult<Vec<InspectionLog>> {
        self.list(LOGS).await
    }

    /// Append a log and return its generated id
    pub async fn logs_append(&self, log: &InspectionLog) -> AppResult<String> {
        self.put(LOGS, None, log, false).await
    }

    pub async fn history_list(&self) -> AppResult<Vec<HistoryItem>> {
        self.list(HISTORY).await
    }

    pub async fn history_append(&self, item: &HistoryItem) -> AppResult<String> {
        self.put(HISTORY, None, item, false).await
    }

    pub async fn history_delete(&self, id: &str) -> AppResult<bool> {
        self.remove(HISTORY, id).await
    }

    pub async fn material_history_list(&self) -> AppResult<Vec<MaterialHistory>> {
        self.list(MATERIAL_HISTORY).await
    }

    pub async fn material_history_append(&self, record: &MaterialHistory) -> AppResult<String> {
        self.put(MATERIAL_HISTORY, None, record, false).await
    }
}
