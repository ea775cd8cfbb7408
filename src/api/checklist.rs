//! Checklist endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::checklist::{
        ChecklistConfigRequest, ChecklistItem, ChecklistView, SaveChecklistRequest, SaveOutcome,
    },
};

use super::AuthenticatedUser;

/// Open a device checklist for inspection
#[utoipa::path(
    get,
    path = "/devices/{id}/checklist",
    tag = "checklist",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Checklist items, template when never saved", body = ChecklistView),
        (status = 404, description = "Device not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn open_checklist(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<ChecklistView>> {
    let view = state.services.checklist.open_checklist(&id).await?;
    Ok(Json(view))
}

/// Submit an inspection
#[utoipa::path(
    put,
    path = "/devices/{id}/checklist",
    tag = "checklist",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Device ID")),
    request_body = SaveChecklistRequest,
    responses(
        (status = 200, description = "Inspection saved", body = SaveOutcome),
        (status = 400, description = "Invalid item ids, unchecked items, missing notes or missing opened_at", body = crate::error::ErrorResponse)
    )
)]
pub async fn save_checklist(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(request): Json<SaveChecklistRequest>,
) -> AppResult<Json<SaveOutcome>> {
    let outcome = state
        .services
        .checklist
        .save_checklist(&id, request, &claims)
        .await?;
    Ok(Json(outcome))
}

/// Replace the checklist structure of a device
#[utoipa::path(
    put,
    path = "/devices/{id}/checklist/config",
    tag = "checklist",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Device ID")),
    request_body = ChecklistConfigRequest,
    responses(
        (status = 200, description = "Stored items", body = Vec<ChecklistItem>),
        (status = 403, description = "Administrator only", body = crate::error::ErrorResponse)
    )
)]
pub async fn save_checklist_config(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(request): Json<ChecklistConfigRequest>,
) -> AppResult<Json<Vec<ChecklistItem>>> {
    claims.require_admin()?;
    let items = state
        .services
        .checklist
        .save_checklist_config(&id, request.items)
        .await?;
    Ok(Json(items))
}
