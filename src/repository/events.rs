//! Incidents and maintenance tasks

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{incident::Incident, maintenance::MaintenanceTask},
    store::collections::{INCIDENTS, MAINTENANCE},
};

impl Repository {
    pub async fn incidents_list(&self) -> AppResult<Vec<Incident>> {
        self.list(INCIDENTS).await
    }

    pub async fn incidents_get_by_id(&self, id: &str) -> AppResult<Incident> {
        self.get(INCIDENTS, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Incident {} not found", id)))
    }

    /// Insert when `incident.id` is empty, replace otherwise. Returns the id.
    pub async fn incidents_save(&self, incident: &Incident) -> AppResult<String> {
        let id = (!incident.id.is_empty()).then_some(incident.id.as_str());
        self.put(INCIDENTS, id, incident, false).await
    }

    pub async fn maintenance_list(&self) -> AppResult<Vec<MaintenanceTask>> {
        self.list(MAINTENANCE).await
    }

    pub async fn maintenance_get_by_id(&self, id: &str) -> AppResult<MaintenanceTask> {
        self.get(MAINTENANCE, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Maintenance task {} not found", id)))
    }

    pub async fn maintenance_save(&self, task: &MaintenanceTask) -> AppResult<String> {
        let id = (!task.id.is_empty()).then_some(task.id.as_str());
        self.put(MAINTENANCE, id, task, false).await
    }
}
