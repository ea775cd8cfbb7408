//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{
        auth, backup, checklist, devices, health, incidents, issues, kpi, maintenance, materials,
        reports, stream, users,
    },
    models,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Groundcheck API",
        version = "0.3.0",
        description = "Airport ground equipment inspection tracker REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        auth::change_password,
        // Users
        users::list_users,
        users::create_user,
        users::delete_user,
        // Devices
        devices::list_devices,
        devices::device_summary,
        devices::get_device,
        devices::create_device,
        devices::update_device,
        devices::delete_device,
        devices::list_categories,
        // Checklists
        checklist::open_checklist,
        checklist::save_checklist,
        checklist::save_checklist_config,
        // Issues
        issues::list_issues,
        issues::commit_summary,
        issues::resolve_issue,
        issues::request_material,
        // Materials
        materials::list_requests,
        materials::list_history,
        materials::approve_material,
        // Incidents
        incidents::list_incidents,
        incidents::create_incident,
        incidents::resolve_incident,
        // Maintenance
        maintenance::list_tasks,
        maintenance::create_task,
        maintenance::complete_task,
        // KPI
        kpi::get_report,
        kpi::reset,
        // Reports
        reports::list_logs,
        reports::list_history,
        reports::delete_history,
        // Backup
        backup::export,
        // Realtime
        stream::subscribe,
    ),
    components(
        schemas(
            models::status::Status,
            // Users
            models::user::Role,
            models::user::UserInfo,
            models::user::CreateUser,
            models::user::LoginRequest,
            models::user::LoginStatus,
            models::user::LoginResponse,
            models::user::ChangePasswordRequest,
            // Devices
            models::device::Device,
            models::device::Category,
            models::device::CreateDevice,
            models::device::UpdateDevice,
            models::device::DeviceSummary,
            // Checklists
            models::checklist::ChecklistItem,
            models::checklist::ChecklistView,
            models::checklist::SaveChecklistRequest,
            models::checklist::ChecklistConfigRequest,
            models::checklist::SaveOutcome,
            models::checklist::IssueRef,
            models::checklist::OpenIssue,
            models::checklist::FixStatus,
            models::checklist::SummaryEntry,
            models::checklist::SummaryCommitRequest,
            models::checklist::SummaryOutcome,
            models::checklist::DeviceStatusChange,
            models::checklist::ResolveIssueRequest,
            models::checklist::MaterialRequestBody,
            models::checklist::ApproveMaterialRequest,
            // Materials
            models::material::MaterialRequest,
            models::material::MaterialHistory,
            // Events
            models::inspection_log::InspectionLog,
            models::history::HistoryItem,
            models::incident::Incident,
            models::incident::IncidentStatus,
            models::incident::CreateIncident,
            models::incident::ResolveIncident,
            models::maintenance::MaintenanceTask,
            models::maintenance::TaskStatus,
            models::maintenance::CreateMaintenanceTask,
            models::maintenance::CompleteMaintenanceTask,
            // KPI
            models::kpi::Scorecard,
            models::kpi::KpiTotals,
            models::kpi::KpiReport,
            models::kpi::ResetRequest,
            models::kpi::ResetReport,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "User roster"),
        (name = "devices", description = "Devices and categories"),
        (name = "checklist", description = "Device inspection checklists"),
        (name = "issues", description = "Open issues and fixes"),
        (name = "materials", description = "Material requests and dispensing"),
        (name = "incidents", description = "Incident reports"),
        (name = "maintenance", description = "Maintenance tasks"),
        (name = "kpi", description = "KPI scorecards"),
        (name = "reports", description = "Inspection and fix reports"),
        (name = "backup", description = "Data export"),
        (name = "stream", description = "Realtime collection snapshots")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
