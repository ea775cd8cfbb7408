//! Storekeeper endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        checklist::ApproveMaterialRequest,
        material::{MaterialHistory, MaterialRequest},
    },
};

use super::AuthenticatedUser;

/// Pending material requests
#[utoipa::path(
    get,
    path = "/materials/requests",
    tag = "materials",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending requests", body = Vec<MaterialRequest>)
    )
)]
pub async fn list_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<MaterialRequest>>> {
    let requests = state.services.checklist.list_material_requests().await?;
    Ok(Json(requests))
}

/// Dispensed materials, newest first
#[utoipa::path(
    get,
    path = "/materials/history",
    tag = "materials",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dispensed materials", body = Vec<MaterialHistory>)
    )
)]
pub async fn list_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<MaterialHistory>>> {
    let records = state.services.checklist.material_history().await?;
    Ok(Json(records))
}

/// Dispense the requested material
#[utoipa::path(
    post,
    path = "/devices/{id}/items/{item_id}/material-approval",
    tag = "materials",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Device ID"),
        ("item_id" = String, Path, description = "Checklist item ID")
    ),
    request_body = ApproveMaterialRequest,
    responses(
        (status = 201, description = "Material dispensed", body = MaterialHistory),
        (status = 404, description = "No pending request for this item", body = crate::error::ErrorResponse)
    )
)]
pub async fn approve_material(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, item_id)): Path<(String, String)>,
    Json(request): Json<ApproveMaterialRequest>,
) -> AppResult<(StatusCode, Json<MaterialHistory>)> {
    let record = state
        .services
        .checklist
        .approve_material(&id, &item_id, request.material_name.as_deref(), &claims)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}
