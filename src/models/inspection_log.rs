//! Inspection log: one immutable entry per checklist save

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::status::Status;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InspectionLog {
    #[serde(default)]
    pub id: String,
    pub timestamp: String,
    #[serde(default)]
    pub inspector_name: String,
    /// Missing on records written before codes were logged
    #[serde(default)]
    pub inspector_code: Option<String>,
    pub system_id: String,
    #[serde(default)]
    pub system_name: String,
    pub result: Status,
    #[serde(default)]
    pub note: String,
    /// Seconds between opening and saving the checklist
    #[serde(default)]
    pub duration: Option<i64>,
}

/// Report filters for the inspection log view
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct LogQuery {
    /// Single day, `YYYY-MM-DD`
    pub date: Option<String>,
    /// Exact inspector name
    pub inspector: Option<String>,
}
