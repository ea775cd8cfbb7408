//! Backup endpoint

use axum::{extract::State, Json};
use serde_json::Value;

use crate::error::AppResult;

use super::AuthenticatedUser;

/// Export every collection as JSON
#[utoipa::path(
    get,
    path = "/backup",
    tag = "backup",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Object keyed by collection name", body = Object),
        (status = 403, description = "Administrator only", body = crate::error::ErrorResponse)
    )
)]
pub async fn export(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let dump = state.services.backup.export(&claims).await?;
    Ok(Json(dump))
}
