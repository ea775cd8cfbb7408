//! Fix history: a NOK item closed out in the summary view

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryItem {
    #[serde(default)]
    pub id: String,
    pub system_name: String,
    pub issue_content: String,
    /// When the issue was found
    #[serde(default)]
    pub timestamp: String,
    pub resolved_at: String,
    #[serde(default)]
    pub action_note: String,
    /// Who found it
    #[serde(default)]
    pub inspector_name: Option<String>,
    /// Who fixed it
    pub resolver_name: String,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    /// Case-insensitive match on system, issue or action
    pub search: Option<String>,
}
