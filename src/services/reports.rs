//! Inspection log and fix history reports

use std::cmp::Reverse;

use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::{
        history::{HistoryItem, HistoryQuery},
        inspection_log::{InspectionLog, LogQuery},
        timestamp,
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
}

impl ReportsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Logs for one day and/or one inspector, newest first
    pub async fn logs(&self, query: &LogQuery) -> AppResult<Vec<InspectionLog>> {
        let day = match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(date) => Some(NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", date))
            })?),
            None => None,
        };
        let inspector = query.inspector.as_deref().map(str::trim).filter(|i| !i.is_empty());

        let mut logs: Vec<InspectionLog> = self
            .repository
            .logs_list()
            .await?
            .into_iter()
            .filter(|log| day.map_or(true, |d| timestamp::date_of(&log.timestamp) == Some(d)))
            .filter(|log| inspector.map_or(true, |name| log.inspector_name == name))
            .collect();
        logs.sort_by_key(|log| Reverse(timestamp::parse(&log.timestamp)));
        Ok(logs)
    }

    /// Fix history, most recently resolved first
    pub async fn history(&self, query: &HistoryQuery) -> AppResult<Vec<HistoryItem>> {
        let needle = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut items: Vec<HistoryItem> = self
            .repository
            .history_list()
            .await?
            .into_iter()
            .filter(|item| match &needle {
                Some(needle) => [&item.system_name, &item.issue_content, &item.action_note]
                    .iter()
                    .any(|field| field.to_lowercase().contains(needle.as_str())),
                None => true,
            })
            .collect();
        items.sort_by_key(|item| Reverse(timestamp::parse(&item.resolved_at)));
        Ok(items)
    }

    pub async fn delete_history(&self, id: &str, admin: &UserClaims) -> AppResult<()> {
        admin.require_admin()?;
        if !self.repository.history_delete(id).await? {
            return Err(AppError::NotFound(format!("History entry {} not found", id)));
        }
        tracing::info!("History entry {} deleted by {}", id, admin.sub);
        Ok(())
    }
}
