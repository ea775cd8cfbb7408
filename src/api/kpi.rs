//! KPI dashboard endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        kpi::{KpiQuery, KpiReport, ResetReport, ResetRequest},
        timestamp::MonthFilter,
    },
};

use super::AuthenticatedUser;

/// Monthly scorecards for every user
#[utoipa::path(
    get,
    path = "/kpi",
    tag = "kpi",
    security(("bearer_auth" = [])),
    params(KpiQuery),
    responses(
        (status = 200, description = "Scorecards, best first", body = KpiReport),
        (status = 400, description = "Malformed month", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<KpiQuery>,
) -> AppResult<Json<KpiReport>> {
    claims.require_admin()?;
    let month = match query.month.as_deref().filter(|m| !m.trim().is_empty()) {
        Some(month) => month.parse()?,
        None => MonthFilter::current(),
    };
    let report = state.services.kpi.report(month).await?;
    Ok(Json(report))
}

/// Delete all KPI event data and reset every device and checklist
///
/// Not atomic across collections. On a storage error part of the data may
/// already be reset; calling again completes the reset.
#[utoipa::path(
    post,
    path = "/kpi/reset",
    tag = "kpi",
    security(("bearer_auth" = [])),
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Reset complete", body = ResetReport),
        (status = 400, description = "Confirmation text did not match", body = crate::error::ErrorResponse),
        (status = 500, description = "Reset stopped part way", body = crate::error::ErrorResponse)
    )
)]
pub async fn reset(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<ResetRequest>,
) -> AppResult<Json<ResetReport>> {
    let report = state
        .services
        .kpi
        .reset_kpi_data(&request.confirmation, &claims)
        .await?;
    Ok(Json(report))
}
