//! Scheduled maintenance tasks

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MaintenanceTask {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// `YYYY-MM-DD`
    pub deadline: String,
    /// Assignee user codes
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub assignee_names: Vec<String>,
    /// Supervisor user codes
    #[serde(default)]
    pub supervisors: Vec<String>,
    #[serde(default)]
    pub supervisor_names: Vec<String>,
    /// Single assignee code on older records
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub assigned_by_name: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub completed_note: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl MaintenanceTask {
    pub fn is_assignee(&self, code: &str) -> bool {
        self.assignees.iter().any(|c| c == code) || self.assigned_to.as_deref() == Some(code)
    }

    pub fn is_supervisor(&self, code: &str) -> bool {
        self.supervisors.iter().any(|c| c == code)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMaintenanceTask {
    #[validate(length(min = 1, message = "Task title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub deadline: String,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub supervisors: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteMaintenanceTask {
    pub note: String,
}
