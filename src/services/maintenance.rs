//! Maintenance task scheduling and completion

use chrono::NaiveDate;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        maintenance::{CompleteMaintenanceTask, CreateMaintenanceTask, MaintenanceTask, TaskStatus},
        timestamp,
        user::{User, UserClaims},
    },
    repository::Repository,
};

fn clean_codes(codes: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        if !cleaned.iter().any(|c| c == code) {
            cleaned.push(code.to_string());
        }
    }
    cleaned
}

/// Display names for codes, the code itself when nobody on the roster has it
fn names_for(codes: &[String], roster: &[User]) -> Vec<String> {
    codes
        .iter()
        .map(|code| {
            roster
                .iter()
                .find(|u| &u.code == code)
                .map(|u| u.name.clone())
                .unwrap_or_else(|| code.clone())
        })
        .collect()
}

#[derive(Clone)]
pub struct MaintenanceService {
    repository: Repository,
}

impl MaintenanceService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Newest first
    pub async fn list(&self) -> AppResult<Vec<MaintenanceTask>> {
        let mut tasks = self.repository.maintenance_list().await?;
        tasks.sort_by_key(|t| std::cmp::Reverse(timestamp::parse(&t.created_at)));
        Ok(tasks)
    }

    pub async fn create(
        &self,
        data: CreateMaintenanceTask,
        admin: &UserClaims,
    ) -> AppResult<MaintenanceTask> {
        admin.require_admin()?;
        let data = CreateMaintenanceTask {
            title: data.title.trim().to_string(),
            ..data
        };
        data.validate()?;

        let deadline = NaiveDate::parse_from_str(data.deadline.trim(), "%Y-%m-%d").map_err(|_| {
            AppError::Validation(format!("Invalid deadline '{}', expected YYYY-MM-DD", data.deadline))
        })?;

        let assignees = clean_codes(&data.assignees);
        let supervisors = clean_codes(&data.supervisors);
        if assignees.is_empty() && supervisors.is_empty() {
            return Err(AppError::Validation(
                "Select at least one assignee or supervisor".to_string(),
            ));
        }

        let roster = self.repository.users_list().await?;
        let mut task = MaintenanceTask {
            id: String::new(),
            title: data.title,
            description: data.description,
            deadline: deadline.format("%Y-%m-%d").to_string(),
            assignee_names: names_for(&assignees, &roster),
            supervisor_names: names_for(&supervisors, &roster),
            assignees,
            supervisors,
            assigned_to: None,
            assigned_by_name: admin.name.clone(),
            status: TaskStatus::Pending,
            completed_at: None,
            completed_note: None,
            created_at: timestamp::now_display(),
        };
        task.id = self.repository.maintenance_save(&task).await?;
        tracing::info!("Maintenance task {} scheduled for {}", task.id, task.deadline);
        Ok(task)
    }

    pub async fn complete(
        &self,
        id: &str,
        data: CompleteMaintenanceTask,
        user: &UserClaims,
    ) -> AppResult<MaintenanceTask> {
        let mut task = self.repository.maintenance_get_by_id(id).await?;

        let code = user.code();
        if !(user.is_admin() || task.is_assignee(code) || task.is_supervisor(code)) {
            return Err(AppError::Authorization(
                "Only assignees, supervisors or an administrator can complete this task".to_string(),
            ));
        }
        let note = data.note.trim();
        if note.is_empty() {
            return Err(AppError::Validation("A completion note is required".to_string()));
        }
        if task.status == TaskStatus::Completed {
            return Err(AppError::Conflict(format!("Task {} is already completed", id)));
        }

        task.status = TaskStatus::Completed;
        task.completed_at = Some(timestamp::now_display());
        task.completed_note = Some(note.to_string());
        self.repository.maintenance_save(&task).await?;
        Ok(task)
    }
}
