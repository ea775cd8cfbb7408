//! Incident reports, independent of scheduled checklists

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentStatus {
    Open,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Incident {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub system_name: String,
    #[serde(default)]
    pub description: String,
    pub status: IncidentStatus,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub reported_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub resolved_by: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<String>,
    #[serde(default)]
    pub resolution_note: Option<String>,
    /// Names of everyone who took part in the fix
    #[serde(default)]
    pub participants: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateIncident {
    #[validate(length(min = 1, message = "Incident title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "System name is required"))]
    pub system_name: String,
    #[serde(default)]
    pub description: String,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveIncident {
    pub note: String,
    pub participants: Vec<String>,
}
