//! Device and category endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::device::{Category, CreateDevice, Device, DeviceSummary, UpdateDevice},
};

use super::AuthenticatedUser;

/// List devices in natural id order
#[utoipa::path(
    get,
    path = "/devices",
    tag = "devices",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Device list", body = Vec<Device>)
    )
)]
pub async fn list_devices(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Device>>> {
    let devices = state.services.devices.list().await?;
    Ok(Json(devices))
}

/// Dashboard counters
#[utoipa::path(
    get,
    path = "/devices/summary",
    tag = "devices",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Status counts", body = DeviceSummary)
    )
)]
pub async fn device_summary(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<DeviceSummary>> {
    let summary = state.services.devices.summary().await?;
    Ok(Json(summary))
}

/// Get device by ID
#[utoipa::path(
    get,
    path = "/devices/{id}",
    tag = "devices",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Device details", body = Device),
        (status = 404, description = "Device not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_device(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Device>> {
    let device = state.services.devices.get_by_id(&id).await?;
    Ok(Json(device))
}

/// Create device
#[utoipa::path(
    post,
    path = "/devices",
    tag = "devices",
    security(("bearer_auth" = [])),
    request_body = CreateDevice,
    responses(
        (status = 201, description = "Device created", body = Device),
        (status = 409, description = "Device ID already in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_device(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateDevice>,
) -> AppResult<(StatusCode, Json<Device>)> {
    let device = state.services.devices.create(data, &claims).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

/// Rename or re-categorise a device
#[utoipa::path(
    put,
    path = "/devices/{id}",
    tag = "devices",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Device ID")),
    request_body = UpdateDevice,
    responses(
        (status = 200, description = "Device updated", body = Device)
    )
)]
pub async fn update_device(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(data): Json<UpdateDevice>,
) -> AppResult<Json<Device>> {
    let device = state.services.devices.update(&id, data, &claims).await?;
    Ok(Json(device))
}

/// Delete a device and its checklist
#[utoipa::path(
    delete,
    path = "/devices/{id}",
    tag = "devices",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Device ID")),
    responses(
        (status = 204, description = "Device deleted")
    )
)]
pub async fn delete_device(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.services.devices.delete(&id, &claims).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List equipment categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "devices",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Category list", body = Vec<Category>)
    )
)]
pub async fn list_categories(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Category>>> {
    let categories = state.services.devices.categories().await?;
    Ok(Json(categories))
}
