//! Incident endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::incident::{CreateIncident, Incident, ResolveIncident},
};

use super::AuthenticatedUser;

/// List incidents, newest first
#[utoipa::path(
    get,
    path = "/incidents",
    tag = "incidents",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Incident list", body = Vec<Incident>)
    )
)]
pub async fn list_incidents(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Incident>>> {
    let incidents = state.services.incidents.list().await?;
    Ok(Json(incidents))
}

/// Report an incident
#[utoipa::path(
    post,
    path = "/incidents",
    tag = "incidents",
    security(("bearer_auth" = [])),
    request_body = CreateIncident,
    responses(
        (status = 201, description = "Incident opened", body = Incident),
        (status = 400, description = "Missing title or system", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_incident(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateIncident>,
) -> AppResult<(StatusCode, Json<Incident>)> {
    let incident = state.services.incidents.create(data, &claims).await?;
    Ok((StatusCode::CREATED, Json(incident)))
}

/// Resolve an incident
#[utoipa::path(
    post,
    path = "/incidents/{id}/resolve",
    tag = "incidents",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Incident ID")),
    request_body = ResolveIncident,
    responses(
        (status = 200, description = "Incident resolved", body = Incident),
        (status = 409, description = "Already resolved", body = crate::error::ErrorResponse)
    )
)]
pub async fn resolve_incident(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(data): Json<ResolveIncident>,
) -> AppResult<Json<Incident>> {
    let incident = state.services.incidents.resolve(&id, data, &claims).await?;
    Ok(Json(incident))
}
