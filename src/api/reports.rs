//! Report endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        history::{HistoryItem, HistoryQuery},
        inspection_log::{InspectionLog, LogQuery},
    },
};

use super::AuthenticatedUser;

/// Inspection log
#[utoipa::path(
    get,
    path = "/reports/logs",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(LogQuery),
    responses(
        (status = 200, description = "Logs, newest first", body = Vec<InspectionLog>)
    )
)]
pub async fn list_logs(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<LogQuery>,
) -> AppResult<Json<Vec<InspectionLog>>> {
    let logs = state.services.reports.logs(&query).await?;
    Ok(Json(logs))
}

/// Fix history
#[utoipa::path(
    get,
    path = "/reports/history",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(HistoryQuery),
    responses(
        (status = 200, description = "Fixes, most recently resolved first", body = Vec<HistoryItem>)
    )
)]
pub async fn list_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<HistoryItem>>> {
    let items = state.services.reports.history(&query).await?;
    Ok(Json(items))
}

#[utoipa::path(
    delete,
    path = "/reports/history/{id}",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "History entry ID")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 404, description = "Entry not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.services.reports.delete_history(&id, &claims).await?;
    Ok(StatusCode::NO_CONTENT)
}
