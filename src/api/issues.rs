//! Open issue summary and fix endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::checklist::{
        MaterialRequestBody, OpenIssue, ResolveIssueRequest, SummaryCommitRequest, SummaryOutcome,
    },
};

use super::AuthenticatedUser;

/// Every NOK item across all devices
#[utoipa::path(
    get,
    path = "/issues",
    tag = "issues",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Open issues", body = Vec<OpenIssue>)
    )
)]
pub async fn list_issues(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<OpenIssue>>> {
    let issues = state.services.checklist.list_open_issues().await?;
    Ok(Json(issues))
}

/// Apply fixes and material requests from the summary view in one go
///
/// Nothing is written when any entry is rejected.
#[utoipa::path(
    post,
    path = "/issues/commit",
    tag = "issues",
    security(("bearer_auth" = [])),
    request_body = SummaryCommitRequest,
    responses(
        (status = 200, description = "Entries applied", body = SummaryOutcome),
        (status = 400, description = "Missing action or material", body = crate::error::ErrorResponse)
    )
)]
pub async fn commit_summary(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<SummaryCommitRequest>,
) -> AppResult<Json<SummaryOutcome>> {
    let outcome = state
        .services
        .checklist
        .commit_summary(request.entries, &claims)
        .await?;
    Ok(Json(outcome))
}

/// Mark one NOK item fixed
#[utoipa::path(
    post,
    path = "/devices/{id}/items/{item_id}/resolve",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Device ID"),
        ("item_id" = String, Path, description = "Checklist item ID")
    ),
    request_body = ResolveIssueRequest,
    responses(
        (status = 200, description = "Issue resolved", body = SummaryOutcome),
        (status = 404, description = "Device or item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn resolve_issue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, item_id)): Path<(String, String)>,
    Json(request): Json<ResolveIssueRequest>,
) -> AppResult<Json<SummaryOutcome>> {
    let outcome = state
        .services
        .checklist
        .resolve_issue(&id, &item_id, &request.action_note, &claims)
        .await?;
    Ok(Json(outcome))
}

/// Request parts for one NOK item
#[utoipa::path(
    post,
    path = "/devices/{id}/items/{item_id}/material-request",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Device ID"),
        ("item_id" = String, Path, description = "Checklist item ID")
    ),
    request_body = MaterialRequestBody,
    responses(
        (status = 200, description = "Material requested", body = SummaryOutcome)
    )
)]
pub async fn request_material(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, item_id)): Path<(String, String)>,
    Json(request): Json<MaterialRequestBody>,
) -> AppResult<Json<SummaryOutcome>> {
    let outcome = state
        .services
        .checklist
        .request_material(&id, &item_id, &request.material, &claims)
        .await?;
    Ok(Json(outcome))
}
