//! Checklist models: per-device inspection items and the issue workflow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{device::Device, status::Status};

/// One inspection line of a device checklist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChecklistItem {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub note: String,
    /// Stamped when this item's status or note was last edited
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub inspector_name: Option<String>,
    /// Parts requested for the repair, cleared once dispensed
    #[serde(default)]
    pub material_request: Option<String>,
}

impl ChecklistItem {
    pub fn unchecked(id: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            content: content.to_string(),
            status: None,
            note: String::new(),
            timestamp: String::new(),
            inspector_name: None,
            material_request: None,
        }
    }

    pub fn is_nok(&self) -> bool {
        Status::is_nok(self.status)
    }

    /// Same inspection content, ignoring the per-edit stamps
    pub fn same_outcome(&self, other: &ChecklistItem) -> bool {
        self.id == other.id
            && self.content == other.content
            && self.status == other.status
            && self.note.trim() == other.note.trim()
    }
}

/// Stored checklist document, keyed by device id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checklist {
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
}

/// Items instantiated the first time a checklist is opened
pub fn default_template() -> Vec<ChecklistItem> {
    [
        ("1", "Visual check of the unit (housing, cabling)"),
        ("2", "Operational check (power on/off)"),
        ("3", "Signal and warning lights"),
        ("4", "System connection / control screen"),
        ("5", "Cleaning after inspection"),
    ]
    .into_iter()
    .map(|(id, content)| ChecklistItem::unchecked(id, content))
    .collect()
}

/// A checklist as handed to an inspector
#[derive(Debug, Serialize, ToSchema)]
pub struct ChecklistView {
    pub device: Device,
    pub items: Vec<ChecklistItem>,
    /// Echo back on save so the inspection duration can be measured
    pub opened_at: DateTime<Utc>,
}

/// Submit an inspection
#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveChecklistRequest {
    pub items: Vec<ChecklistItem>,
    /// Required; the `opened_at` handed out by the open call
    pub opened_at: Option<DateTime<Utc>>,
    /// Whether anything was edited since opening; derived from the stored items when omitted
    pub is_dirty: Option<bool>,
}

/// Replace the checklist structure (configuration mode)
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChecklistConfigRequest {
    pub items: Vec<ChecklistItem>,
}

/// Pointer to one unresolved NOK item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IssueRef {
    /// `<device_id>_<item_id>`
    pub key: String,
    pub device_id: String,
    pub item_id: String,
}

impl IssueRef {
    pub fn new(device_id: &str, item_id: &str) -> Self {
        Self {
            key: issue_key(device_id, item_id),
            device_id: device_id.to_string(),
            item_id: item_id.to_string(),
        }
    }
}

pub fn issue_key(device_id: &str, item_id: &str) -> String {
    format!("{}_{}", device_id, item_id)
}

/// Split an issue key at its first underscore. Device ids never contain one,
/// item ids may.
pub fn parse_issue_key(key: &str) -> Option<IssueRef> {
    let (device_id, item_id) = key.split_once('_')?;
    if device_id.is_empty() || item_id.is_empty() {
        return None;
    }
    Some(IssueRef {
        key: key.to_string(),
        device_id: device_id.to_string(),
        item_id: item_id.to_string(),
    })
}

/// Result of a checklist save
#[derive(Debug, Serialize, ToSchema)]
pub struct SaveOutcome {
    /// Nothing written: unchanged re-save by the same inspector
    pub skipped: bool,
    pub status: Option<Status>,
    pub log_id: Option<String>,
    pub new_issues: Vec<IssueRef>,
    /// Next NOK device after this one, never wrapping to the start
    pub next_device_id: Option<String>,
}

/// Row of the summary view
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OpenIssue {
    pub key: String,
    pub device_id: String,
    pub item_id: String,
    /// `<device name> > <item content>`
    pub system_name: String,
    /// The inspector's note, or a generic label when none was left
    pub issue_content: String,
    pub timestamp: String,
    pub inspector_name: Option<String>,
    pub material_request: Option<String>,
}

/// What the resolver did about an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixStatus {
    Fixed,
    /// Work in progress, nothing recorded
    Fixing,
    PendingMaterial,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SummaryEntry {
    pub key: String,
    pub fix_status: FixStatus,
    /// Action note for `FIXED`, material name for `PENDING_MATERIAL`
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SummaryCommitRequest {
    pub entries: Vec<SummaryEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceStatusChange {
    pub device_id: String,
    pub status: Status,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryOutcome {
    pub fixed: usize,
    pub pending_material: usize,
    pub history_ids: Vec<String>,
    pub devices: Vec<DeviceStatusChange>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveIssueRequest {
    pub action_note: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MaterialRequestBody {
    pub material: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ApproveMaterialRequest {
    /// Defaults to the requested material
    pub material_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_issue_key_keeps_underscores_in_item_id() {
        let issue = parse_issue_key("A1_hinge_1").unwrap();
        assert_eq!(issue.device_id, "A1");
        assert_eq!(issue.item_id, "hinge_1");
        assert_eq!(parse_issue_key(&issue_key("B2", "3")), Some(IssueRef::new("B2", "3")));
        assert!(parse_issue_key("A1").is_none());
        assert!(parse_issue_key("A1_").is_none());
    }

    #[test]
    fn test_default_template() {
        let items = default_template();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert!(items.iter().all(|i| i.status.is_none()));
    }

    #[test]
    fn test_item_decodes_with_missing_fields() {
        let item: ChecklistItem =
            serde_json::from_str(r#"{"id":"1","content":"Hinge","status":"NOK"}"#).unwrap();
        assert!(item.is_nok());
        assert_eq!(item.note, "");
        assert_eq!(item.material_request, None);
    }
}
