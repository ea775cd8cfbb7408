//! Status consistency engine
//!
//! Owns every write that can change a checklist item's status and keeps the
//! owning device in line: a device is NOK exactly when one of its items is.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        checklist::{
            default_template, parse_issue_key, ChecklistItem, ChecklistView, DeviceStatusChange,
            FixStatus, IssueRef, OpenIssue, SaveChecklistRequest, SaveOutcome, SummaryEntry,
            SummaryOutcome,
        },
        device::{Device, FAULT_MARKER},
        history::HistoryItem,
        inspection_log::InspectionLog,
        material::{MaterialHistory, MaterialRequest},
        status::Status,
        timestamp,
        user::UserClaims,
    },
    repository::Repository,
};

/// Log note for an inspection without faults
pub const NORMAL_NOTE: &str = "System operating normally";

/// Issue label used when the inspector left no note
const GENERIC_FAULT: &str = "Checklist fault";

/// The single status derivation: NOK iff any item is NOK, OK otherwise
pub fn derive_status(items: &[ChecklistItem]) -> Status {
    if items.iter().any(ChecklistItem::is_nok) {
        Status::Nok
    } else {
        Status::Ok
    }
}

/// Bring a device's status and note in line with its items
fn apply_derived(device: &mut Device, items: &[ChecklistItem]) -> Status {
    let status = derive_status(items);
    device.status = Some(status);
    device.note = match status {
        Status::Nok => FAULT_MARKER.to_string(),
        _ => String::new(),
    };
    status
}

fn join_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every item needs its own non-empty id
fn check_item_ids(items: &[ChecklistItem]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for (index, item) in items.iter().enumerate() {
        if item.id.trim().is_empty() {
            return Err(AppError::Validation(format!("Item {} has no id", index + 1)));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(AppError::Validation(format!("Duplicate item id {}", item.id)));
        }
    }
    Ok(())
}

/// Inspection rules, first violation wins
pub fn validate_submission(items: &[ChecklistItem], parent: Option<Status>) -> AppResult<()> {
    check_item_ids(items)?;

    let unchecked: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.status.is_none())
        .map(|(i, _)| i + 1)
        .collect();
    if !unchecked.is_empty() {
        return Err(AppError::Validation(format!(
            "{} item(s) not checked: {}",
            unchecked.len(),
            join_indices(&unchecked)
        )));
    }

    let missing_note: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| {
            matches!(item.status, Some(Status::Nok) | Some(Status::Na)) && item.note.trim().is_empty()
        })
        .map(|(i, _)| i + 1)
        .collect();
    if !missing_note.is_empty() {
        return Err(AppError::Validation(format!(
            "A note is required for NOK/NA items: {}",
            join_indices(&missing_note)
        )));
    }

    if parent == Some(Status::Nok) && !items.iter().any(ChecklistItem::is_nok) {
        return Err(AppError::Validation(
            "Device is marked NOK: mark the faulty checklist item as NOK before saving".to_string(),
        ));
    }

    Ok(())
}

/// Inspection log note: the faults found, or the normal note
pub fn log_note(items: &[ChecklistItem]) -> String {
    let faults: Vec<String> = items
        .iter()
        .filter(|item| item.is_nok())
        .map(|item| {
            let note = item.note.trim();
            if note.is_empty() {
                item.content.clone()
            } else {
                format!("{} ({})", item.content, note)
            }
        })
        .collect();
    if faults.is_empty() {
        NORMAL_NOTE.to_string()
    } else {
        format!("Faults detected: {}", faults.join("; "))
    }
}

/// First NOK device after `current_id` in list order. Never wraps.
pub fn next_nok_after(devices: &[Device], current_id: &str) -> Option<String> {
    let position = devices.iter().position(|d| d.id == current_id)?;
    devices[position + 1..]
        .iter()
        .find(|d| Status::is_nok(d.status))
        .map(|d| d.id.clone())
}

/// Device status as implied by its stored items. Falls back to the device
/// record while nothing has been inspected.
fn effective_status(device: &Device, stored: &[ChecklistItem]) -> Option<Status> {
    if stored.iter().any(|item| item.status.is_some()) {
        Some(derive_status(stored))
    } else {
        device.status
    }
}

fn items_differ(stored: &[ChecklistItem], submitted: &[ChecklistItem]) -> bool {
    stored.len() != submitted.len()
        || stored
            .iter()
            .zip(submitted)
            .any(|(old, new)| !old.same_outcome(new))
}

fn issue_label(item: &ChecklistItem) -> String {
    let note = item.note.trim();
    if note.is_empty() {
        GENERIC_FAULT.to_string()
    } else {
        note.to_string()
    }
}

fn system_label(device: &Device, item: &ChecklistItem) -> String {
    format!("{} > {}", device.name, item.content)
}

/// One resolver decision on one open issue
struct Decision {
    issue: IssueRef,
    fix_status: FixStatus,
    action: String,
}

#[derive(Clone)]
pub struct ChecklistService {
    repository: Repository,
}

impl ChecklistService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Write the device after its checklist. On failure the checklist is
    /// already stored, so the caller is told how to finish.
    async fn write_device(&self, device: &Device, written: &str) -> AppResult<()> {
        if let Err(e) = self.repository.devices_save(device).await {
            tracing::warn!("{} for {} stored but device update failed: {}", written, device.id, e);
            return Err(AppError::Storage(format!(
                "{} for {} saved, but the device status was not updated. Save the checklist again to finish.",
                written, device.id
            )));
        }
        Ok(())
    }

    /// Load a device checklist, falling back to the default template
    pub async fn open_checklist(&self, device_id: &str) -> AppResult<ChecklistView> {
        let device = self.repository.devices_get_by_id(device_id).await?;
        let items = match self.repository.checklist_get(device_id).await? {
            Some(items) if !items.is_empty() => items,
            _ => default_template(),
        };
        Ok(ChecklistView {
            device,
            items,
            opened_at: Utc::now(),
        })
    }

    /// Submit an inspection of one device
    pub async fn save_checklist(
        &self,
        device_id: &str,
        request: SaveChecklistRequest,
        user: &UserClaims,
    ) -> AppResult<SaveOutcome> {
        let mut device = self.repository.devices_get_by_id(device_id).await?;
        let stored = self
            .repository
            .checklist_get(device_id)
            .await?
            .unwrap_or_default();
        let mut items = request.items;
        let parent = effective_status(&device, &stored);

        validate_submission(&items, parent)?;
        let opened_at = request.opened_at.ok_or_else(|| {
            AppError::Validation("opened_at is required: open the checklist before saving".to_string())
        })?;

        let dirty = request
            .is_dirty
            .unwrap_or_else(|| items_differ(&stored, &items));
        if device.status.is_some()
            && device.status == parent
            && !dirty
            && device.inspector_name.as_deref() == Some(user.name.as_str())
        {
            tracing::debug!("Unchanged checklist for {} re-saved by {}, skipping", device_id, user.sub);
            let devices = self.repository.devices_list().await?;
            return Ok(SaveOutcome {
                skipped: true,
                status: device.status,
                log_id: None,
                new_issues: Vec::new(),
                next_device_id: next_nok_after(&devices, device_id),
            });
        }

        let now = timestamp::now_display();

        // Edit stamps are the server's: changed items get this save's, others keep theirs
        for item in items.iter_mut() {
            match stored.iter().find(|old| old.id == item.id) {
                Some(old) if old.same_outcome(item) => {
                    item.timestamp = old.timestamp.clone();
                    item.inspector_name = old.inspector_name.clone();
                }
                _ => {
                    item.timestamp = now.clone();
                    item.inspector_name = Some(user.name.clone());
                }
            }
        }

        let new_issues: Vec<IssueRef> = items
            .iter()
            .filter(|item| item.is_nok())
            .filter(|item| {
                !stored
                    .iter()
                    .any(|old| old.id == item.id && old.is_nok())
            })
            .map(|item| IssueRef::new(device_id, &item.id))
            .collect();

        self.repository.checklist_save(device_id, &items).await?;

        let status = apply_derived(&mut device, &items);
        device.inspector_name = Some(user.name.clone());
        device.timestamp = Some(now.clone());
        self.write_device(&device, "Checklist").await?;

        let duration = Some((Utc::now() - opened_at).num_seconds().max(0));
        let log = InspectionLog {
            id: String::new(),
            timestamp: now,
            inspector_name: user.name.clone(),
            inspector_code: Some(user.sub.clone()),
            system_id: device.id.clone(),
            system_name: device.name.clone(),
            result: status,
            note: log_note(&items),
            duration,
        };
        let log_id = self.repository.logs_append(&log).await?;

        tracing::info!(
            "Checklist for {} saved by {}: {} ({} new issue(s))",
            device_id,
            user.sub,
            status,
            new_issues.len()
        );

        let devices = self.repository.devices_list().await?;
        Ok(SaveOutcome {
            skipped: false,
            status: Some(status),
            log_id: Some(log_id),
            new_issues,
            next_device_id: next_nok_after(&devices, device_id),
        })
    }

    /// Replace the checklist structure without inspection rules
    pub async fn save_checklist_config(
        &self,
        device_id: &str,
        items: Vec<ChecklistItem>,
    ) -> AppResult<Vec<ChecklistItem>> {
        let mut device = self.repository.devices_get_by_id(device_id).await?;

        check_item_ids(&items)?;
        if let Some(index) = items.iter().position(|item| item.content.trim().is_empty()) {
            return Err(AppError::Validation(format!(
                "Item {} needs a description",
                index + 1
            )));
        }

        self.repository.checklist_save(device_id, &items).await?;

        // Unchecked devices stay unchecked
        if device.status.is_some() {
            let before = device.status;
            let status = apply_derived(&mut device, &items);
            if before != Some(status) {
                tracing::info!("Device {} re-derived to {} after configuration change", device_id, status);
            }
            self.write_device(&device, "Checklist configuration").await?;
        }
        Ok(items)
    }

    /// Stored checklists of every device, in device order
    async fn device_checklists(&self) -> AppResult<Vec<(Device, Vec<ChecklistItem>)>> {
        let devices = self.repository.devices_list().await?;
        let mut checklists: HashMap<String, Vec<ChecklistItem>> =
            self.repository.checklists_all().await?.into_iter().collect();
        Ok(devices
            .into_iter()
            .map(|device| {
                let items = checklists.remove(&device.id).unwrap_or_default();
                (device, items)
            })
            .collect())
    }

    /// Every NOK item across devices
    pub async fn list_open_issues(&self) -> AppResult<Vec<OpenIssue>> {
        let mut issues = Vec::new();
        for (device, items) in self.device_checklists().await? {
            for item in items.iter().filter(|i| i.is_nok()) {
                let issue = IssueRef::new(&device.id, &item.id);
                issues.push(OpenIssue {
                    key: issue.key,
                    device_id: issue.device_id,
                    item_id: issue.item_id,
                    system_name: system_label(&device, item),
                    issue_content: issue_label(item),
                    timestamp: item.timestamp.clone(),
                    inspector_name: item.inspector_name.clone(),
                    material_request: item.material_request.clone(),
                });
            }
        }
        Ok(issues)
    }

    /// Items waiting for parts
    pub async fn list_material_requests(&self) -> AppResult<Vec<MaterialRequest>> {
        let mut requests = Vec::new();
        for (device, items) in self.device_checklists().await? {
            for item in &items {
                let Some(material) = item.material_request.as_deref().filter(|m| !m.trim().is_empty())
                else {
                    continue;
                };
                requests.push(MaterialRequest {
                    key: IssueRef::new(&device.id, &item.id).key,
                    device_id: device.id.clone(),
                    system_name: device.name.clone(),
                    item_id: item.id.clone(),
                    item_content: item.content.clone(),
                    material: material.to_string(),
                    requester: item.inspector_name.clone(),
                    requested_at: item.timestamp.clone(),
                });
            }
        }
        Ok(requests)
    }

    /// Apply a batch of summary decisions; nothing is written unless every entry is valid
    pub async fn commit_summary(
        &self,
        entries: Vec<SummaryEntry>,
        resolver: &UserClaims,
    ) -> AppResult<SummaryOutcome> {
        let missing_material = entries
            .iter()
            .filter(|e| e.fix_status == FixStatus::PendingMaterial && e.action.trim().is_empty())
            .count();
        if missing_material > 0 {
            return Err(AppError::Validation(format!(
                "Enter the material needed for {} item(s) marked Pending Material",
                missing_material
            )));
        }

        let missing_action = entries
            .iter()
            .filter(|e| e.fix_status == FixStatus::Fixed && e.action.trim().is_empty())
            .count();
        if missing_action > 0 {
            return Err(AppError::Validation(format!(
                "Enter the action taken for {} item(s) marked Fixed",
                missing_action
            )));
        }

        // Fixing entries carry no change
        let actionable: Vec<&SummaryEntry> = entries
            .iter()
            .filter(|e| e.fix_status != FixStatus::Fixing)
            .collect();
        if actionable.is_empty() {
            return Err(AppError::Validation(
                "Nothing to save: mark at least one issue Fixed or Pending Material".to_string(),
            ));
        }

        let decisions = actionable
            .into_iter()
            .map(|entry| -> AppResult<Decision> {
                let issue = parse_issue_key(&entry.key).ok_or_else(|| {
                    AppError::BadRequest(format!("Invalid issue key '{}'", entry.key))
                })?;
                Ok(Decision {
                    issue,
                    fix_status: entry.fix_status,
                    action: entry.action.trim().to_string(),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        self.apply_decisions(decisions, resolver).await
    }

    /// Write validated decisions, one device at a time
    async fn apply_decisions(
        &self,
        decisions: Vec<Decision>,
        resolver: &UserClaims,
    ) -> AppResult<SummaryOutcome> {
        // Group by device, reading the current stored state
        let mut by_device: BTreeMap<String, Vec<Decision>> = BTreeMap::new();
        for decision in decisions {
            by_device
                .entry(decision.issue.device_id.clone())
                .or_default()
                .push(decision);
        }

        let mut loaded = Vec::with_capacity(by_device.len());
        for (device_id, decisions) in by_device {
            let device = self.repository.devices_get_by_id(&device_id).await?;
            let items = self
                .repository
                .checklist_get(&device_id)
                .await?
                .unwrap_or_default();
            for decision in &decisions {
                let item = items
                    .iter()
                    .find(|i| i.id == decision.issue.item_id)
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Issue {} not found", decision.issue.key))
                    })?;
                if !item.is_nok() {
                    return Err(AppError::Validation(format!(
                        "Issue {} is no longer open",
                        decision.issue.key
                    )));
                }
            }
            loaded.push((device, items, decisions));
        }

        let now = timestamp::now_display();
        let mut outcome = SummaryOutcome {
            fixed: 0,
            pending_material: 0,
            history_ids: Vec::new(),
            devices: Vec::new(),
        };

        for (mut device, mut items, decisions) in loaded {
            let mut history = Vec::new();
            for decision in decisions {
                let Some(item) = items.iter_mut().find(|i| i.id == decision.issue.item_id) else {
                    continue;
                };
                match decision.fix_status {
                    FixStatus::Fixed => {
                        history.push(HistoryItem {
                            id: String::new(),
                            system_name: system_label(&device, item),
                            issue_content: issue_label(item),
                            timestamp: item.timestamp.clone(),
                            resolved_at: now.clone(),
                            action_note: decision.action,
                            inspector_name: item.inspector_name.clone(),
                            resolver_name: resolver.name.clone(),
                        });
                        item.status = Some(Status::Ok);
                        item.note.clear();
                        item.material_request = None;
                        outcome.fixed += 1;
                    }
                    FixStatus::PendingMaterial => {
                        item.material_request = Some(decision.action);
                        outcome.pending_material += 1;
                    }
                    FixStatus::Fixing => {}
                }
            }

            self.repository.checklist_save(&device.id, &items).await?;
            for record in &history {
                outcome
                    .history_ids
                    .push(self.repository.history_append(record).await?);
            }

            let status = apply_derived(&mut device, &items);
            self.write_device(&device, "Fixes").await?;
            outcome.devices.push(DeviceStatusChange {
                device_id: device.id.clone(),
                status,
            });
        }

        tracing::info!(
            "Summary committed by {}: {} fixed, {} pending material",
            resolver.sub,
            outcome.fixed,
            outcome.pending_material
        );
        Ok(outcome)
    }

    /// Close one NOK item
    pub async fn resolve_issue(
        &self,
        device_id: &str,
        item_id: &str,
        action_note: &str,
        resolver: &UserClaims,
    ) -> AppResult<SummaryOutcome> {
        let action = action_note.trim();
        if action.is_empty() {
            return Err(AppError::Validation("Enter the action taken".to_string()));
        }
        let decision = Decision {
            issue: IssueRef::new(device_id, item_id),
            fix_status: FixStatus::Fixed,
            action: action.to_string(),
        };
        self.apply_decisions(vec![decision], resolver).await
    }

    /// Flag a NOK item as waiting for parts
    pub async fn request_material(
        &self,
        device_id: &str,
        item_id: &str,
        material: &str,
        requester: &UserClaims,
    ) -> AppResult<SummaryOutcome> {
        let material = material.trim();
        if material.is_empty() {
            return Err(AppError::Validation("Enter the material needed".to_string()));
        }
        let decision = Decision {
            issue: IssueRef::new(device_id, item_id),
            fix_status: FixStatus::PendingMaterial,
            action: material.to_string(),
        };
        self.apply_decisions(vec![decision], requester).await
    }

    /// Dispense requested parts. The item stays NOK until it is fixed.
    pub async fn approve_material(
        &self,
        device_id: &str,
        item_id: &str,
        material_name: Option<&str>,
        approver: &UserClaims,
    ) -> AppResult<MaterialHistory> {
        let device = self.repository.devices_get_by_id(device_id).await?;
        let mut items = self
            .repository
            .checklist_get(device_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No checklist for device {}", device_id)))?;
        let item = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found on {}", item_id, device_id)))?;
        let requested = item
            .material_request
            .take()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| {
                AppError::NotFound(format!("No pending material request for {}_{}", device_id, item_id))
            })?;

        let material_name = material_name
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or(requested);
        item.note = format!("Material dispensed: {}. Repair in progress.", material_name);

        let mut record = MaterialHistory {
            id: String::new(),
            device_id: device.id.clone(),
            system_name: device.name.clone(),
            item_id: item.id.clone(),
            item_content: item.content.clone(),
            material_name,
            requester: item.inspector_name.clone(),
            requested_at: item.timestamp.clone(),
            approved_at: timestamp::now_display(),
            approver: approver.name.clone(),
        };

        self.repository.checklist_save(device_id, &items).await?;
        record.id = self.repository.material_history_append(&record).await?;

        tracing::info!(
            "Material '{}' dispensed for {}_{} by {}",
            record.material_name,
            device_id,
            item_id,
            approver.sub
        );
        Ok(record)
    }

    /// Dispensed material, newest first
    pub async fn material_history(&self) -> AppResult<Vec<MaterialHistory>> {
        let mut records = self.repository.material_history_list().await?;
        records.sort_by(|a, b| timestamp::parse(&b.approved_at).cmp(&timestamp::parse(&a.approved_at)));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::{
        models::user::Role,
        services::test_support::{claims, item, repository, seed_device},
        store::{
            collections::SYSTEMS, BatchOp, Document, DocumentStore, MemoryStore, Subscription,
        },
    };

    fn inspector() -> UserClaims {
        claims("NV001", "Tran Van A", Role::User)
    }

    fn request(items: Vec<ChecklistItem>, is_dirty: Option<bool>) -> SaveChecklistRequest {
        SaveChecklistRequest {
            items,
            opened_at: Some(Utc::now()),
            is_dirty,
        }
    }

    #[test]
    fn test_derive_status() {
        assert_eq!(derive_status(&[]), Status::Ok);
        assert_eq!(
            derive_status(&[item("1", "a", Some(Status::Ok), ""), item("2", "b", Some(Status::Na), "n/a")]),
            Status::Ok
        );
        assert_eq!(
            derive_status(&[item("1", "a", Some(Status::Ok), ""), item("2", "b", Some(Status::Nok), "x")]),
            Status::Nok
        );
    }

    #[test]
    fn test_validation_names_first_unchecked_index() {
        let items = vec![
            item("1", "a", None, ""),
            item("2", "b", Some(Status::Ok), ""),
            item("3", "c", Some(Status::Ok), ""),
        ];
        let err = validate_submission(&items, None).unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.ends_with(": 1"), "{}", msg),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_validation_requires_notes_for_nok_and_na() {
        let items = vec![
            item("1", "a", Some(Status::Ok), ""),
            item("2", "b", Some(Status::Nok), "  "),
            item("3", "c", Some(Status::Na), ""),
        ];
        match validate_submission(&items, None).unwrap_err() {
            AppError::Validation(msg) => assert!(msg.ends_with(": 2, 3"), "{}", msg),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_next_nok_never_wraps() {
        let mut devices: Vec<Device> = ["A1", "A2", "A3"]
            .iter()
            .map(|id| Device::new(id, "CAT1", id))
            .collect();
        devices[0].status = Some(Status::Nok);
        assert_eq!(next_nok_after(&devices, "A2"), None);
        devices[2].status = Some(Status::Nok);
        assert_eq!(next_nok_after(&devices, "A1").as_deref(), Some("A3"));
        assert_eq!(next_nok_after(&devices, "missing"), None);
    }

    #[test]
    fn test_log_note() {
        assert_eq!(log_note(&[item("1", "a", Some(Status::Ok), "")]), NORMAL_NOTE);
        let note = log_note(&[
            item("1", "Hinge", Some(Status::Nok), "broken hinge"),
            item("2", "Lights", Some(Status::Nok), ""),
        ]);
        assert_eq!(note, "Faults detected: Hinge (broken hinge); Lights");
    }

    #[tokio::test]
    async fn test_open_checklist_uses_template_without_persisting() {
        let repo = repository();
        seed_device(&repo, "A1", None, None).await;
        let service = ChecklistService::new(repo.clone());

        let view = service.open_checklist("A1").await.unwrap();
        assert_eq!(view.items.len(), 5);
        assert!(repo.checklist_get("A1").await.unwrap().is_none());

        assert!(matches!(
            service.open_checklist("ZZ9").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_save_keeps_device_status_in_line_with_items() {
        let repo = repository();
        seed_device(&repo, "A1", None, None).await;
        let service = ChecklistService::new(repo.clone());
        let user = inspector();

        let outcome = service
            .save_checklist(
                "A1",
                request(
                    vec![
                        item("1", "Housing", Some(Status::Ok), ""),
                        item("2", "Hinge", Some(Status::Nok), "loose"),
                    ],
                    Some(true),
                ),
                &user,
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, Some(Status::Nok));
        assert_eq!(outcome.new_issues, vec![IssueRef::new("A1", "2")]);

        let device = repo.devices_get_by_id("A1").await.unwrap();
        assert_eq!(device.status, Some(Status::Nok));
        assert_eq!(device.note, FAULT_MARKER);
        assert_eq!(device.inspector_name.as_deref(), Some("Tran Van A"));

        // A second inspector confirms the fault
        let other = claims("NV003", "Le Thi C", Role::User);
        service
            .save_checklist(
                "A1",
                request(
                    vec![
                        item("1", "Housing", Some(Status::Ok), ""),
                        item("2", "Hinge", Some(Status::Nok), "still loose"),
                    ],
                    Some(true),
                ),
                &other,
            )
            .await
            .unwrap();
        let device = repo.devices_get_by_id("A1").await.unwrap();
        assert_eq!(device.status, Some(Status::Nok));
        assert_eq!(repo.logs_list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unchanged_resave_by_same_inspector_is_skipped() {
        let repo = repository();
        seed_device(&repo, "A1", None, None).await;
        let service = ChecklistService::new(repo.clone());
        let user = inspector();
        let items = vec![
            item("1", "Housing", Some(Status::Ok), ""),
            item("2", "Lights", Some(Status::Ok), ""),
        ];

        let first = service
            .save_checklist("A1", request(items.clone(), Some(true)), &user)
            .await
            .unwrap();
        assert!(!first.skipped);
        let device_after_first = repo.devices_get_by_id("A1").await.unwrap();

        let second = service
            .save_checklist("A1", request(items.clone(), Some(false)), &user)
            .await
            .unwrap();
        assert!(second.skipped);
        assert_eq!(repo.logs_list().await.unwrap().len(), 1);
        assert_eq!(repo.devices_get_by_id("A1").await.unwrap(), device_after_first);

        // Dirtiness is derived when the client does not say
        let third = service
            .save_checklist("A1", request(items, None), &user)
            .await
            .unwrap();
        assert!(third.skipped);

        // Another inspector always gets a log
        let other = claims("NV003", "Le Thi C", Role::User);
        let fourth = service
            .save_checklist(
                "A1",
                request(
                    vec![
                        item("1", "Housing", Some(Status::Ok), ""),
                        item("2", "Lights", Some(Status::Ok), ""),
                    ],
                    Some(false),
                ),
                &other,
            )
            .await
            .unwrap();
        assert!(!fourth.skipped);
        assert_eq!(repo.logs_list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_consistency_guard_leaves_state_untouched() {
        let repo = repository();
        let stored = vec![
            item("1", "Housing", Some(Status::Ok), ""),
            item("2", "Hinge", Some(Status::Nok), "broken"),
        ];
        seed_device(&repo, "A1", Some(Status::Nok), Some(stored.clone())).await;
        let service = ChecklistService::new(repo.clone());

        let result = service
            .save_checklist(
                "A1",
                request(
                    vec![
                        item("1", "Housing", Some(Status::Ok), ""),
                        item("2", "Hinge", Some(Status::Ok), ""),
                    ],
                    Some(true),
                ),
                &inspector(),
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(repo.checklist_get("A1").await.unwrap(), Some(stored));
        assert_eq!(
            repo.devices_get_by_id("A1").await.unwrap().status,
            Some(Status::Nok)
        );
        assert!(repo.logs_list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_navigation_hint_scans_forward() {
        let repo = repository();
        seed_device(&repo, "A1", Some(Status::Nok), None).await;
        seed_device(&repo, "A2", None, None).await;
        seed_device(&repo, "A10", Some(Status::Nok), None).await;
        let service = ChecklistService::new(repo);

        let outcome = service
            .save_checklist(
                "A2",
                request(vec![item("1", "Housing", Some(Status::Ok), "")], Some(true)),
                &inspector(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.next_device_id.as_deref(), Some("A10"));
    }

    #[tokio::test]
    async fn test_end_to_end_fault_then_fix() {
        let repo = repository();
        seed_device(
            &repo,
            "A1",
            None,
            Some(vec![item("1", "Housing", None, ""), item("2", "Hinge", None, "")]),
        )
        .await;
        let service = ChecklistService::new(repo.clone());

        service
            .save_checklist(
                "A1",
                request(
                    vec![
                        item("1", "Housing", Some(Status::Ok), ""),
                        item("2", "Hinge", Some(Status::Nok), "broken hinge"),
                    ],
                    None,
                ),
                &inspector(),
            )
            .await
            .unwrap();

        assert_eq!(
            repo.devices_get_by_id("A1").await.unwrap().status,
            Some(Status::Nok)
        );
        let logs = repo.logs_list().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].result, Status::Nok);
        assert!(logs[0].note.contains("broken hinge"));
        assert_eq!(logs[0].inspector_code.as_deref(), Some("NV001"));

        let issues = service.list_open_issues().await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key, "A1_2");

        let resolver = claims("NV002", "NV002", Role::User);
        service
            .resolve_issue("A1", "2", "replaced hinge", &resolver)
            .await
            .unwrap();

        let items = repo.checklist_get("A1").await.unwrap().unwrap();
        assert_eq!(items[1].status, Some(Status::Ok));
        assert_eq!(items[1].note, "");
        assert_eq!(
            repo.devices_get_by_id("A1").await.unwrap().status,
            Some(Status::Ok)
        );
        let history = repo.history_list().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].resolver_name, "NV002");
        assert_eq!(history[0].inspector_name.as_deref(), Some("Tran Van A"));
        assert_eq!(history[0].action_note, "replaced hinge");
        assert!(service.list_open_issues().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_summary_validation_writes_nothing() {
        let repo = repository();
        let stored = vec![
            item("1", "Hinge", Some(Status::Nok), "broken"),
            item("2", "Lights", Some(Status::Nok), "dim"),
        ];
        seed_device(&repo, "A1", Some(Status::Nok), Some(stored.clone())).await;
        let service = ChecklistService::new(repo.clone());
        let resolver = inspector();

        let entries = vec![
            SummaryEntry {
                key: "A1_1".into(),
                fix_status: FixStatus::Fixed,
                action: "tightened".into(),
            },
            SummaryEntry {
                key: "A1_2".into(),
                fix_status: FixStatus::PendingMaterial,
                action: " ".into(),
            },
        ];
        assert!(matches!(
            service.commit_summary(entries, &resolver).await,
            Err(AppError::Validation(_))
        ));

        let only_fixing = vec![SummaryEntry {
            key: "A1_1".into(),
            fix_status: FixStatus::Fixing,
            action: String::new(),
        }];
        assert!(matches!(
            service.commit_summary(only_fixing, &resolver).await,
            Err(AppError::Validation(_))
        ));

        let unknown = vec![SummaryEntry {
            key: "A1_9".into(),
            fix_status: FixStatus::Fixed,
            action: "done".into(),
        }];
        assert!(matches!(
            service.commit_summary(unknown, &resolver).await,
            Err(AppError::NotFound(_))
        ));

        assert_eq!(repo.checklist_get("A1").await.unwrap(), Some(stored));
        assert!(repo.history_list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_fix_keeps_device_nok() {
        let repo = repository();
        seed_device(
            &repo,
            "A1",
            Some(Status::Nok),
            Some(vec![
                item("1", "Hinge", Some(Status::Nok), "broken"),
                item("2", "Lights", Some(Status::Nok), "dim"),
            ]),
        )
        .await;
        let service = ChecklistService::new(repo.clone());

        let outcome = service
            .commit_summary(
                vec![
                    SummaryEntry {
                        key: "A1_1".into(),
                        fix_status: FixStatus::Fixed,
                        action: "replaced".into(),
                    },
                    SummaryEntry {
                        key: "A1_2".into(),
                        fix_status: FixStatus::PendingMaterial,
                        action: "LED bulb".into(),
                    },
                ],
                &inspector(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.fixed, 1);
        assert_eq!(outcome.pending_material, 1);
        assert_eq!(outcome.devices[0].status, Status::Nok);

        let requests = service.list_material_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].material, "LED bulb");
    }

    #[tokio::test]
    async fn test_approve_material() {
        let repo = repository();
        let mut pending = item("2", "Lights", Some(Status::Nok), "dim");
        pending.material_request = Some("LED bulb".into());
        pending.inspector_name = Some("Tran Van A".into());
        seed_device(
            &repo,
            "A1",
            Some(Status::Nok),
            Some(vec![item("1", "Hinge", Some(Status::Ok), ""), pending]),
        )
        .await;
        let service = ChecklistService::new(repo.clone());
        let storekeeper = claims("ADMIN", "Store Keeper", Role::Admin);

        let record = service
            .approve_material("A1", "2", None, &storekeeper)
            .await
            .unwrap();
        assert_eq!(record.material_name, "LED bulb");
        assert_eq!(record.requester.as_deref(), Some("Tran Van A"));
        assert_eq!(record.approver, "Store Keeper");

        let items = repo.checklist_get("A1").await.unwrap().unwrap();
        assert_eq!(items[1].status, Some(Status::Nok));
        assert_eq!(items[1].material_request, None);
        assert!(items[1].note.starts_with("Material dispensed: LED bulb"));
        assert_eq!(
            repo.devices_get_by_id("A1").await.unwrap().status,
            Some(Status::Nok)
        );
        assert_eq!(service.material_history().await.unwrap().len(), 1);

        // Nothing left to approve
        assert!(matches!(
            service.approve_material("A1", "2", None, &storekeeper).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.approve_material("A1", "7", None, &storekeeper).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_config_save_rederives_checked_devices_only() {
        let repo = repository();
        seed_device(
            &repo,
            "A1",
            Some(Status::Nok),
            Some(vec![item("1", "Hinge", Some(Status::Nok), "broken")]),
        )
        .await;
        seed_device(&repo, "A2", None, None).await;
        let service = ChecklistService::new(repo.clone());

        service
            .save_checklist_config("A1", vec![item("2", "Lights", Some(Status::Ok), "")])
            .await
            .unwrap();
        assert_eq!(
            repo.devices_get_by_id("A1").await.unwrap().status,
            Some(Status::Ok)
        );

        service
            .save_checklist_config("A2", vec![item("1", "Lights", None, "")])
            .await
            .unwrap();
        assert_eq!(repo.devices_get_by_id("A2").await.unwrap().status, None);

        assert!(matches!(
            service
                .save_checklist_config("A2", vec![item("1", "a", None, ""), item("1", "b", None, "")])
                .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_item_id_with_underscore_can_be_resolved() {
        let repo = repository();
        seed_device(&repo, "A1", None, None).await;
        let service = ChecklistService::new(repo.clone());
        service
            .save_checklist_config(
                "A1",
                vec![item("hinge_1", "Hinge", None, ""), item("lamp", "Lamp", None, "")],
            )
            .await
            .unwrap();

        let outcome = service
            .save_checklist(
                "A1",
                request(
                    vec![
                        item("hinge_1", "Hinge", Some(Status::Nok), "cracked"),
                        item("lamp", "Lamp", Some(Status::Ok), ""),
                    ],
                    Some(true),
                ),
                &inspector(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.new_issues[0].key, "A1_hinge_1");

        service
            .request_material("A1", "hinge_1", "hinge pin", &inspector())
            .await
            .unwrap();
        assert_eq!(service.list_material_requests().await.unwrap()[0].item_id, "hinge_1");

        let fixed = service
            .resolve_issue("A1", "hinge_1", "replaced", &inspector())
            .await
            .unwrap();
        assert_eq!(fixed.fixed, 1);
        assert_eq!(
            repo.devices_get_by_id("A1").await.unwrap().status,
            Some(Status::Ok)
        );
    }

    #[tokio::test]
    async fn test_summary_key_with_underscore_item_id() {
        let repo = repository();
        seed_device(
            &repo,
            "B2",
            Some(Status::Nok),
            Some(vec![item("door_left", "Left door", Some(Status::Nok), "stuck")]),
        )
        .await;
        let service = ChecklistService::new(repo.clone());

        let outcome = service
            .commit_summary(
                vec![SummaryEntry {
                    key: "B2_door_left".into(),
                    fix_status: FixStatus::Fixed,
                    action: "greased rail".into(),
                }],
                &inspector(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.devices[0].device_id, "B2");
        assert_eq!(outcome.devices[0].status, Status::Ok);
    }

    #[tokio::test]
    async fn test_changed_item_is_stamped_for_current_inspector() {
        let repo = repository();
        seed_device(&repo, "A1", None, None).await;
        let service = ChecklistService::new(repo.clone());
        let first = claims("NV001", "An", Role::User);
        let second = claims("NV002", "Binh", Role::User);

        service
            .save_checklist(
                "A1",
                request(
                    vec![
                        item("1", "Housing", Some(Status::Ok), ""),
                        item("2", "Hinge", Some(Status::Ok), ""),
                    ],
                    Some(true),
                ),
                &first,
            )
            .await
            .unwrap();

        // The second inspector edits what the open call returned, stamps included
        let mut items = service.open_checklist("A1").await.unwrap().items;
        assert_eq!(items[1].inspector_name.as_deref(), Some("An"));
        items[1].status = Some(Status::Nok);
        items[1].note = "loose".into();
        service
            .save_checklist("A1", request(items, Some(true)), &second)
            .await
            .unwrap();

        let stored = repo.checklist_get("A1").await.unwrap().unwrap();
        assert_eq!(stored[0].inspector_name.as_deref(), Some("An"));
        assert_eq!(stored[1].inspector_name.as_deref(), Some("Binh"));

        service
            .resolve_issue("A1", "2", "tightened", &first)
            .await
            .unwrap();
        let history = repo.history_list().await.unwrap();
        assert_eq!(history[0].inspector_name.as_deref(), Some("Binh"));
        assert_eq!(history[0].resolver_name, "An");
    }

    #[tokio::test]
    async fn test_save_requires_opened_at() {
        let repo = repository();
        seed_device(&repo, "A1", None, None).await;
        let service = ChecklistService::new(repo.clone());

        let result = service
            .save_checklist(
                "A1",
                SaveChecklistRequest {
                    items: vec![item("1", "Housing", Some(Status::Ok), "")],
                    opened_at: None,
                    is_dirty: Some(true),
                },
                &inspector(),
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(repo.logs_list().await.unwrap().is_empty());

        let opened_at = Utc::now() - chrono::Duration::seconds(90);
        service
            .save_checklist(
                "A1",
                SaveChecklistRequest {
                    items: vec![item("1", "Housing", Some(Status::Ok), "")],
                    opened_at: Some(opened_at),
                    is_dirty: Some(true),
                },
                &inspector(),
            )
            .await
            .unwrap();
        let duration = repo.logs_list().await.unwrap()[0].duration.unwrap();
        assert!(duration >= 90, "{}", duration);
    }

    #[tokio::test]
    async fn test_save_rejects_missing_or_duplicate_item_ids() {
        let repo = repository();
        seed_device(&repo, "A1", None, None).await;
        let service = ChecklistService::new(repo.clone());

        for items in [
            vec![item("", "Housing", Some(Status::Nok), "dented")],
            vec![
                item("1", "Housing", Some(Status::Ok), ""),
                item("1", "Hinge", Some(Status::Ok), ""),
            ],
        ] {
            assert!(matches!(
                service
                    .save_checklist("A1", request(items, Some(true)), &inspector())
                    .await,
                Err(AppError::Validation(_))
            ));
        }
        assert!(repo.checklist_get("A1").await.unwrap().is_none());
    }

    /// Memory store that refuses device writes
    struct DeviceWritesRejected(Arc<MemoryStore>);

    #[async_trait]
    impl DocumentStore for DeviceWritesRejected {
        async fn get_all(&self, collection: &str) -> AppResult<Vec<Document>> {
            self.0.get_all(collection).await
        }

        async fn get_by_id(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
            self.0.get_by_id(collection, id).await
        }

        async fn upsert(
            &self,
            collection: &str,
            id: Option<String>,
            data: Value,
            merge: bool,
        ) -> AppResult<String> {
            if collection == SYSTEMS {
                return Err(AppError::Storage("write rejected".into()));
            }
            self.0.upsert(collection, id, data, merge).await
        }

        async fn delete(&self, collection: &str, id: &str) -> AppResult<bool> {
            self.0.delete(collection, id).await
        }

        async fn commit_batch(&self, collection: &str, ops: Vec<BatchOp>) -> AppResult<()> {
            self.0.commit_batch(collection, ops).await
        }

        async fn subscribe(&self, collection: &str) -> AppResult<Subscription> {
            self.0.subscribe(collection).await
        }
    }

    #[tokio::test]
    async fn test_failed_device_write_is_reported_and_recoverable() {
        let store = Arc::new(MemoryStore::new());
        let repo = Repository::new(store.clone());
        seed_device(
            &repo,
            "A1",
            Some(Status::Nok),
            Some(vec![
                item("1", "Housing", Some(Status::Ok), ""),
                item("2", "Hinge", Some(Status::Nok), "loose"),
            ]),
        )
        .await;

        let degraded = ChecklistService::new(Repository::new(Arc::new(DeviceWritesRejected(
            store.clone(),
        ))));
        match degraded.resolve_issue("A1", "2", "tightened", &inspector()).await {
            Err(AppError::Storage(msg)) => assert!(msg.contains("Save the checklist again"), "{}", msg),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
        assert_eq!(
            repo.devices_get_by_id("A1").await.unwrap().status,
            Some(Status::Nok)
        );

        // The stored items are already fixed, so a plain save brings the device back in line
        let service = ChecklistService::new(repo.clone());
        let items = service.open_checklist("A1").await.unwrap().items;
        assert!(!items.iter().any(ChecklistItem::is_nok));
        service
            .save_checklist("A1", request(items, Some(true)), &inspector())
            .await
            .unwrap();
        assert_eq!(
            repo.devices_get_by_id("A1").await.unwrap().status,
            Some(Status::Ok)
        );
    }
}
