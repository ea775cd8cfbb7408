//! Dispensed material records

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Pending request shown to the storekeeper
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MaterialRequest {
    pub key: String,
    pub device_id: String,
    pub system_name: String,
    pub item_id: String,
    pub item_content: String,
    pub material: String,
    pub requester: Option<String>,
    pub requested_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MaterialHistory {
    #[serde(default)]
    pub id: String,
    pub device_id: String,
    #[serde(default)]
    pub system_name: String,
    pub item_id: String,
    #[serde(default)]
    pub item_content: String,
    pub material_name: String,
    #[serde(default)]
    pub requester: Option<String>,
    #[serde(default)]
    pub requested_at: String,
    pub approved_at: String,
    pub approver: String,
}
