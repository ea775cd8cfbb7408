//! Maintenance task endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::maintenance::{CompleteMaintenanceTask, CreateMaintenanceTask, MaintenanceTask},
};

use super::AuthenticatedUser;

#[utoipa::path(
    get,
    path = "/maintenance",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tasks, newest first", body = Vec<MaintenanceTask>)
    )
)]
pub async fn list_tasks(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<MaintenanceTask>>> {
    let tasks = state.services.maintenance.list().await?;
    Ok(Json(tasks))
}

/// Schedule a task
#[utoipa::path(
    post,
    path = "/maintenance",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    request_body = CreateMaintenanceTask,
    responses(
        (status = 201, description = "Task scheduled", body = MaintenanceTask)
    )
)]
pub async fn create_task(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateMaintenanceTask>,
) -> AppResult<(StatusCode, Json<MaintenanceTask>)> {
    let task = state.services.maintenance.create(data, &claims).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Complete a task
#[utoipa::path(
    post,
    path = "/maintenance/{id}/complete",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Task ID")),
    request_body = CompleteMaintenanceTask,
    responses(
        (status = 200, description = "Task completed", body = MaintenanceTask),
        (status = 403, description = "Not an assignee, supervisor or administrator", body = crate::error::ErrorResponse)
    )
)]
pub async fn complete_task(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(data): Json<CompleteMaintenanceTask>,
) -> AppResult<Json<MaintenanceTask>> {
    let task = state.services.maintenance.complete(&id, data, &claims).await?;
    Ok(Json(task))
}
