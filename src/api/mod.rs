//! API handlers for the Groundcheck REST endpoints

pub mod auth;
pub mod backup;
pub mod checklist;
pub mod devices;
pub mod health;
pub mod incidents;
pub mod issues;
pub mod kpi;
pub mod maintenance;
pub mod materials;
pub mod openapi;
pub mod reports;
pub mod stream;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", post(auth::change_password))
        // Users
        .route("/users", get(users::list_users))
        .route("/users", post(users::create_user))
        .route("/users/:id", delete(users::delete_user))
        // Devices
        .route("/devices", get(devices::list_devices))
        .route("/devices", post(devices::create_device))
        .route("/devices/summary", get(devices::device_summary))
        .route("/devices/:id", get(devices::get_device))
        .route("/devices/:id", put(devices::update_device))
        .route("/devices/:id", delete(devices::delete_device))
        .route("/categories", get(devices::list_categories))
        // Checklists
        .route("/devices/:id/checklist", get(checklist::open_checklist))
        .route("/devices/:id/checklist", put(checklist::save_checklist))
        .route("/devices/:id/checklist/config", put(checklist::save_checklist_config))
        // Issues
        .route("/issues", get(issues::list_issues))
        .route("/issues/commit", post(issues::commit_summary))
        .route("/devices/:id/items/:item_id/resolve", post(issues::resolve_issue))
        .route(
            "/devices/:id/items/:item_id/material-request",
            post(issues::request_material),
        )
        // Materials
        .route("/materials/requests", get(materials::list_requests))
        .route("/materials/history", get(materials::list_history))
        .route(
            "/devices/:id/items/:item_id/material-approval",
            post(materials::approve_material),
        )
        // Incidents
        .route("/incidents", get(incidents::list_incidents))
        .route("/incidents", post(incidents::create_incident))
        .route("/incidents/:id/resolve", post(incidents::resolve_incident))
        // Maintenance
        .route("/maintenance", get(maintenance::list_tasks))
        .route("/maintenance", post(maintenance::create_task))
        .route("/maintenance/:id/complete", post(maintenance::complete_task))
        // KPI
        .route("/kpi", get(kpi::get_report))
        .route("/kpi/reset", post(kpi::reset))
        // Reports
        .route("/reports/logs", get(reports::list_logs))
        .route("/reports/history", get(reports::list_history))
        .route("/reports/history/:id", delete(reports::delete_history))
        // Backup
        .route("/backup", get(backup::export))
        // Realtime
        .route("/stream/:collection", get(stream::subscribe))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
