//! KPI scorecards and the reset operation

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// One user's monthly metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct Scorecard {
    pub user_id: String,
    pub code: String,
    pub name: String,
    pub inspections: u32,
    pub faults_found: u32,
    pub fixes: u32,
    pub incidents: u32,
    pub maintenance_executed: u32,
    pub maintenance_supervised: u32,
    /// Inspections finished in under 30 seconds
    pub negligence_flags: u32,
    /// May be negative
    pub score: i64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct KpiQuery {
    /// `YYYY-MM`, defaults to the current month
    pub month: Option<String>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct KpiTotals {
    pub inspections: u32,
    pub fixes: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KpiReport {
    pub month: String,
    pub scorecards: Vec<Scorecard>,
    pub totals: KpiTotals,
    pub top_performer: Option<Scorecard>,
    pub negligence_warnings: Vec<Scorecard>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetRequest {
    /// Must be the literal `RESET`
    pub confirmation: String,
}

/// Records touched by a KPI reset
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ResetReport {
    pub logs: usize,
    pub history: usize,
    pub incidents: usize,
    pub maintenance: usize,
    pub material_history: usize,
    pub devices: usize,
    pub checklists: usize,
}
