//! KPI aggregation engine
//!
//! Scores each user for one month from four independent record streams.
//! Everything here reads fresh snapshots; nothing is cached between runs.

use serde_json::json;

use crate::{
    config::KpiConfig,
    error::{AppError, AppResult},
    models::{
        checklist::Checklist,
        history::HistoryItem,
        incident::{Incident, IncidentStatus},
        inspection_log::InspectionLog,
        kpi::{KpiReport, KpiTotals, ResetReport, Scorecard},
        maintenance::{MaintenanceTask, TaskStatus},
        timestamp::MonthFilter,
        user::{User, UserClaims},
    },
    repository::Repository,
    store::{
        collections::{DETAILS, HISTORY, INCIDENTS, LOGS, MAINTENANCE, MATERIAL_HISTORY, SYSTEMS},
        BatchOp,
    },
};

pub const WEIGHT_INSPECTION: i64 = 1;
pub const WEIGHT_FAULT_FOUND: i64 = 2;
pub const WEIGHT_FIX: i64 = 2;
pub const WEIGHT_INCIDENT: i64 = 5;
pub const WEIGHT_MAINTENANCE_EXECUTED: i64 = 10;
pub const WEIGHT_MAINTENANCE_SUPERVISED: i64 = 5;
pub const PENALTY_NEGLIGENCE: i64 = 5;

/// Inspections shorter than this many seconds are flagged
pub const NEGLIGENCE_THRESHOLD_SECS: i64 = 30;

/// Literal the admin must type to wipe KPI data
pub const RESET_CONFIRMATION: &str = "RESET";

/// How users are matched to inspection logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRules {
    /// Also match `inspector_name` against the user's name
    pub legacy_name_matching: bool,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            legacy_name_matching: true,
        }
    }
}

impl From<&KpiConfig> for MatchRules {
    fn from(config: &KpiConfig) -> Self {
        Self {
            legacy_name_matching: config.legacy_name_matching,
        }
    }
}

impl MatchRules {
    fn is_inspector(&self, log: &InspectionLog, user: &User) -> bool {
        log.inspector_code.as_deref() == Some(user.code.as_str())
            || (self.legacy_name_matching && log.inspector_name == user.name)
    }
}

impl Scorecard {
    fn compute_score(&mut self) {
        self.score = i64::from(self.inspections) * WEIGHT_INSPECTION
            + i64::from(self.faults_found) * WEIGHT_FAULT_FOUND
            + i64::from(self.fixes) * WEIGHT_FIX
            + i64::from(self.incidents) * WEIGHT_INCIDENT
            + i64::from(self.maintenance_executed) * WEIGHT_MAINTENANCE_EXECUTED
            + i64::from(self.maintenance_supervised) * WEIGHT_MAINTENANCE_SUPERVISED
            - i64::from(self.negligence_flags) * PENALTY_NEGLIGENCE;
    }
}

fn count<T>(records: &[&T], predicate: impl Fn(&T) -> bool) -> u32 {
    let n = records.iter().filter(|&&r| predicate(r)).count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Score every user for `month`, best first. Ties keep roster order.
pub fn compute_scorecards(
    month: MonthFilter,
    users: &[User],
    logs: &[InspectionLog],
    history: &[HistoryItem],
    incidents: &[Incident],
    tasks: &[MaintenanceTask],
    rules: MatchRules,
) -> Vec<Scorecard> {
    let logs: Vec<&InspectionLog> = logs.iter().filter(|l| month.contains(&l.timestamp)).collect();
    let history: Vec<&HistoryItem> = history
        .iter()
        .filter(|h| month.contains(&h.resolved_at))
        .collect();
    let incidents: Vec<&Incident> = incidents
        .iter()
        .filter(|i| i.status == IncidentStatus::Resolved)
        .filter(|i| i.resolved_at.as_deref().is_some_and(|at| month.contains(at)))
        .collect();
    let tasks: Vec<&MaintenanceTask> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .filter(|t| t.completed_at.as_deref().is_some_and(|at| month.contains(at)))
        .collect();

    let mut scorecards: Vec<Scorecard> = users
        .iter()
        .map(|user| {
            let mut card = Scorecard {
                user_id: user.id.clone(),
                code: user.code.clone(),
                name: user.name.clone(),
                inspections: count(&logs, |l| rules.is_inspector(l, user)),
                faults_found: count(&history, |h| h.inspector_name.as_deref() == Some(user.name.as_str())),
                fixes: count(&history, |h| h.resolver_name == user.name),
                incidents: count(&incidents, |i| {
                    i.resolved_by.as_deref() == Some(user.name.as_str())
                        || i.participants.iter().any(|p| p == &user.name)
                }),
                maintenance_executed: count(&tasks, |t| t.is_assignee(&user.code)),
                maintenance_supervised: count(&tasks, |t| t.is_supervisor(&user.code)),
                negligence_flags: count(&logs, |l| {
                    rules.is_inspector(l, user)
                        && l.duration.is_some_and(|d| d < NEGLIGENCE_THRESHOLD_SECS)
                }),
                score: 0,
            };
            card.compute_score();
            card
        })
        .collect();

    // sort_by is stable
    scorecards.sort_by(|a, b| b.score.cmp(&a.score));
    scorecards
}

/// Dashboard view over computed scorecards
pub fn build_report(month: MonthFilter, scorecards: Vec<Scorecard>) -> KpiReport {
    let totals = KpiTotals {
        inspections: scorecards.iter().map(|s| s.inspections).sum(),
        fixes: scorecards.iter().map(|s| s.fixes).sum(),
    };
    KpiReport {
        month: month.to_string(),
        top_performer: scorecards.first().cloned(),
        negligence_warnings: scorecards
            .iter()
            .filter(|s| s.negligence_flags > 0)
            .cloned()
            .collect(),
        totals,
        scorecards,
    }
}

#[derive(Clone)]
pub struct KpiService {
    repository: Repository,
    rules: MatchRules,
}

impl KpiService {
    pub fn new(repository: Repository, config: KpiConfig) -> Self {
        Self {
            repository,
            rules: MatchRules::from(&config),
        }
    }

    pub async fn scorecards(&self, month: MonthFilter) -> AppResult<Vec<Scorecard>> {
        let users = self.repository.users_list().await?;
        let logs = self.repository.logs_list().await?;
        let history = self.repository.history_list().await?;
        let incidents = self.repository.incidents_list().await?;
        let tasks = self.repository.maintenance_list().await?;
        Ok(compute_scorecards(
            month, &users, &logs, &history, &incidents, &tasks, self.rules,
        ))
    }

    pub async fn report(&self, month: MonthFilter) -> AppResult<KpiReport> {
        let scorecards = self.scorecards(month).await?;
        tracing::debug!("Computed {} scorecards for {}", scorecards.len(), month);
        Ok(build_report(month, scorecards))
    }

    /// Delete every document of a collection in one batch
    async fn clear_collection(&self, collection: &str) -> AppResult<usize> {
        let ids = self.repository.ids(collection).await?;
        let count = ids.len();
        let ops = ids.into_iter().map(|id| BatchOp::Delete { id }).collect();
        self.repository.commit_batch(collection, ops).await?;
        Ok(count)
    }

    async fn reset_devices(&self) -> AppResult<usize> {
        let ids = self.repository.ids(SYSTEMS).await?;
        let count = ids.len();
        let ops = ids
            .into_iter()
            .map(|id| BatchOp::Upsert {
                id,
                data: json!({
                    "status": "OK",
                    "note": "",
                    "inspector_name": null,
                    "timestamp": null,
                }),
                merge: true,
            })
            .collect();
        self.repository.commit_batch(SYSTEMS, ops).await?;
        Ok(count)
    }

    async fn reset_checklists(&self) -> AppResult<usize> {
        let checklists = self.repository.checklists_all().await?;
        let count = checklists.len();
        let mut ops = Vec::with_capacity(count);
        for (device_id, mut items) in checklists {
            for item in items.iter_mut() {
                item.status = None;
                item.note.clear();
                item.timestamp.clear();
                item.inspector_name = None;
                item.material_request = None;
            }
            ops.push(BatchOp::Upsert {
                id: device_id,
                data: serde_json::to_value(Checklist { items })?,
                merge: true,
            });
        }
        self.repository.commit_batch(DETAILS, ops).await?;
        Ok(count)
    }

    /// Wipe KPI event data and put every device and checklist back to a
    /// clean state. Each collection is committed on its own; a failure
    /// leaves earlier collections reset and is fixed by running it again.
    pub async fn reset_kpi_data(
        &self,
        confirmation: &str,
        admin: &UserClaims,
    ) -> AppResult<ResetReport> {
        admin.require_admin()?;
        if confirmation.trim() != RESET_CONFIRMATION {
            return Err(AppError::Validation(format!(
                "Type {} to confirm deleting all KPI data",
                RESET_CONFIRMATION
            )));
        }

        tracing::info!("KPI reset requested by {}", admin.sub);
        let mut report = ResetReport::default();
        let mut completed: Vec<&str> = Vec::new();

        for collection in [LOGS, HISTORY, INCIDENTS, MAINTENANCE, MATERIAL_HISTORY] {
            let cleared = self
                .clear_collection(collection)
                .await
                .map_err(|e| degraded(&completed, collection, e))?;
            match collection {
                LOGS => report.logs = cleared,
                HISTORY => report.history = cleared,
                INCIDENTS => report.incidents = cleared,
                MAINTENANCE => report.maintenance = cleared,
                _ => report.material_history = cleared,
            }
            completed.push(collection);
        }

        report.devices = self
            .reset_devices()
            .await
            .map_err(|e| degraded(&completed, SYSTEMS, e))?;
        completed.push(SYSTEMS);

        report.checklists = self
            .reset_checklists()
            .await
            .map_err(|e| degraded(&completed, DETAILS, e))?;

        tracing::info!(
            "KPI reset complete: {} logs, {} history, {} incidents, {} tasks, {} material records; {} devices reset",
            report.logs,
            report.history,
            report.incidents,
            report.maintenance,
            report.material_history,
            report.devices
        );
        Ok(report)
    }
}

fn degraded(completed: &[&str], failed: &str, error: AppError) -> AppError {
    tracing::warn!(
        "KPI reset stopped at {} ({}); already reset: [{}]",
        failed,
        error,
        completed.join(", ")
    );
    let done = if completed.is_empty() {
        "nothing".to_string()
    } else {
        completed.join(", ")
    };
    AppError::Storage(format!(
        "KPI reset incomplete: failed on {} after resetting {}. Run the reset again to finish.",
        failed, done
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        models::{status::Status, user::Role},
        services::test_support::{claims, item, repository, seed_device},
        store::{Document, MockDocumentStore},
    };

    fn user(id: &str, code: &str, name: &str) -> User {
        User {
            id: id.into(),
            code: code.into(),
            name: name.into(),
            role: Role::User,
            password: None,
        }
    }

    fn log(code: Option<&str>, name: &str, at: &str, duration: Option<i64>) -> InspectionLog {
        InspectionLog {
            id: String::new(),
            timestamp: at.into(),
            inspector_name: name.into(),
            inspector_code: code.map(str::to_string),
            system_id: "A1".into(),
            system_name: "Bridge 1".into(),
            result: Status::Ok,
            note: String::new(),
            duration,
        }
    }

    fn fix(found_by: &str, fixed_by: &str, at: &str) -> HistoryItem {
        HistoryItem {
            id: String::new(),
            system_name: "Bridge 1 > Hinge".into(),
            issue_content: "loose".into(),
            timestamp: at.into(),
            resolved_at: at.into(),
            action_note: "tightened".into(),
            inspector_name: Some(found_by.into()),
            resolver_name: fixed_by.into(),
        }
    }

    fn incident(resolved_by: &str, participants: &[&str], at: &str) -> Incident {
        Incident {
            id: String::new(),
            title: "Jam".into(),
            system_name: "Bridge 1".into(),
            description: String::new(),
            status: IncidentStatus::Resolved,
            assigned_to: None,
            reported_by: "ADMIN".into(),
            created_at: at.into(),
            resolved_by: Some(resolved_by.into()),
            resolved_at: Some(at.into()),
            resolution_note: Some("cleared".into()),
            participants: participants.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn task(assignees: &[&str], supervisors: &[&str], completed_at: Option<&str>) -> MaintenanceTask {
        MaintenanceTask {
            id: String::new(),
            title: "Quarterly service".into(),
            description: String::new(),
            deadline: "2024-03-31".into(),
            assignees: assignees.iter().map(|c| c.to_string()).collect(),
            assignee_names: Vec::new(),
            supervisors: supervisors.iter().map(|c| c.to_string()).collect(),
            supervisor_names: Vec::new(),
            assigned_to: None,
            assigned_by_name: "Admin".into(),
            status: if completed_at.is_some() {
                TaskStatus::Completed
            } else {
                TaskStatus::Pending
            },
            completed_at: completed_at.map(str::to_string),
            completed_note: completed_at.map(|_| "done".to_string()),
            created_at: "08:00 01/03/2024".into(),
        }
    }

    fn march() -> MonthFilter {
        "2024-03".parse().unwrap()
    }

    const IN_MARCH: &str = "09:15 05/03/2024";
    const IN_APRIL: &str = "09:15 05/04/2024";

    #[test]
    fn test_score_example() {
        let users = vec![user("u1", "NV001", "An")];
        let logs = vec![
            log(Some("NV001"), "An", IN_MARCH, Some(120)),
            log(Some("NV001"), "An", IN_MARCH, Some(15)),
            log(Some("NV001"), "An", IN_MARCH, Some(45)),
            log(Some("NV001"), "An", IN_APRIL, Some(5)),
        ];
        let history = vec![
            fix("An", "Binh", IN_MARCH),
            fix("Binh", "An", IN_MARCH),
            fix("Chi", "An", IN_MARCH),
        ];
        let incidents = vec![incident("An", &[], IN_MARCH)];

        let cards = compute_scorecards(march(), &users, &logs, &history, &incidents, &[], MatchRules::default());
        let card = &cards[0];
        assert_eq!(card.inspections, 3);
        assert_eq!(card.faults_found, 1);
        assert_eq!(card.fixes, 2);
        assert_eq!(card.incidents, 1);
        assert_eq!(card.negligence_flags, 1);
        assert_eq!(card.score, 9);
    }

    #[test]
    fn test_month_filter_applies_to_every_source() {
        let users = vec![user("u1", "NV001", "An")];
        let cards = compute_scorecards(
            "2024-04".parse().unwrap(),
            &users,
            &[log(Some("NV001"), "An", IN_MARCH, Some(5))],
            &[fix("An", "An", IN_MARCH)],
            &[incident("An", &[], IN_MARCH)],
            &[task(&["NV001"], &[], Some(IN_MARCH))],
            MatchRules::default(),
        );
        assert_eq!(cards[0].score, 0);
    }

    #[test]
    fn test_incidents_and_maintenance_matching() {
        let users = vec![user("u1", "NV001", "An"), user("u2", "NV002", "Binh")];
        let mut legacy = task(&[], &[], Some(IN_MARCH));
        legacy.assigned_to = Some("NV002".into());
        let mut open = incident("An", &["Binh"], IN_MARCH);
        open.status = IncidentStatus::Open;

        let cards = compute_scorecards(
            march(),
            &users,
            &[],
            &[],
            &[incident("Someone", &["An", "Binh"], IN_MARCH), open],
            &[
                task(&["NV001"], &["NV002"], Some(IN_MARCH)),
                task(&["NV001"], &[], None),
                legacy,
            ],
            MatchRules::default(),
        );
        let an = cards.iter().find(|c| c.code == "NV001").unwrap();
        let binh = cards.iter().find(|c| c.code == "NV002").unwrap();
        assert_eq!((an.incidents, an.maintenance_executed, an.maintenance_supervised), (1, 1, 0));
        assert_eq!((binh.incidents, binh.maintenance_executed, binh.maintenance_supervised), (1, 1, 1));
        assert_eq!(an.score, 15);
        assert_eq!(binh.score, 20);
        // Best first
        assert_eq!(cards[0].code, "NV002");
    }

    #[test]
    fn test_ties_keep_roster_order_and_negative_scores() {
        let users = vec![
            user("u1", "NV001", "An"),
            user("u2", "NV002", "Binh"),
            user("u3", "NV003", "Chi"),
        ];
        let logs = vec![
            log(Some("NV003"), "Chi", IN_MARCH, Some(3)),
            log(Some("NV003"), "Chi", IN_MARCH, Some(3)),
        ];
        let cards = compute_scorecards(march(), &users, &logs, &[], &[], &[], MatchRules::default());
        let order: Vec<_> = cards.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(order, vec!["NV001", "NV002", "NV003"]);
        assert_eq!(cards[2].score, -8);
    }

    #[test]
    fn test_legacy_name_matching_flag() {
        let users = vec![user("u1", "NV001", "An")];
        let logs = vec![
            log(None, "An", IN_MARCH, Some(10)),
            log(Some("NV001"), "Renamed", IN_MARCH, None),
        ];
        let with_names = compute_scorecards(march(), &users, &logs, &[], &[], &[], MatchRules::default());
        assert_eq!(with_names[0].inspections, 2);
        assert_eq!(with_names[0].negligence_flags, 1);

        let codes_only = compute_scorecards(
            march(),
            &users,
            &logs,
            &[],
            &[],
            &[],
            MatchRules {
                legacy_name_matching: false,
            },
        );
        assert_eq!(codes_only[0].inspections, 1);
        // Logs without a duration are never flagged
        assert_eq!(codes_only[0].negligence_flags, 0);
    }

    #[test]
    fn test_report_summary() {
        let users = vec![user("u1", "NV001", "An"), user("u2", "NV002", "Binh")];
        let logs = vec![
            log(Some("NV001"), "An", IN_MARCH, Some(90)),
            log(Some("NV002"), "Binh", IN_MARCH, Some(10)),
            log(Some("NV002"), "Binh", IN_MARCH, Some(90)),
        ];
        let cards = compute_scorecards(march(), &users, &logs, &[], &[], &[], MatchRules::default());
        let report = build_report(march(), cards);
        assert_eq!(report.month, "2024-03");
        assert_eq!(report.totals.inspections, 3);
        assert_eq!(report.top_performer.unwrap().code, "NV001");
        assert_eq!(report.negligence_warnings.len(), 1);
        assert_eq!(report.negligence_warnings[0].code, "NV002");
    }

    #[tokio::test]
    async fn test_reset_requires_confirmation_and_admin() {
        let service = KpiService::new(repository(), KpiConfig::default());
        let admin = claims("ADMIN", "Admin", Role::Admin);
        let staff = claims("NV001", "An", Role::User);

        assert!(matches!(
            service.reset_kpi_data("reset please", &admin).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.reset_kpi_data(RESET_CONFIRMATION, &staff).await,
            Err(AppError::Authorization(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let repo = repository();
        let mut pending = item("2", "Lights", Some(Status::Nok), "dim");
        pending.inspector_name = Some("An".into());
        pending.material_request = Some("LED".into());
        seed_device(
            &repo,
            "A1",
            Some(Status::Nok),
            Some(vec![item("1", "Hinge", Some(Status::Ok), ""), pending]),
        )
        .await;
        repo.logs_append(&log(Some("NV001"), "An", IN_MARCH, Some(40)))
            .await
            .unwrap();
        repo.history_append(&fix("An", "Binh", IN_MARCH)).await.unwrap();

        let service = KpiService::new(repo.clone(), KpiConfig::default());
        let admin = claims("ADMIN", "Admin", Role::Admin);

        let report = service.reset_kpi_data("RESET", &admin).await.unwrap();
        assert_eq!(report.logs, 1);
        assert_eq!(report.history, 1);
        assert_eq!(report.devices, 1);
        assert_eq!(report.checklists, 1);

        let device = repo.devices_get_by_id("A1").await.unwrap();
        assert_eq!(device.status, Some(Status::Ok));
        assert_eq!(device.note, "");
        assert_eq!(device.inspector_name, None);
        assert_eq!(device.name, "Device A1");

        let items = repo.checklist_get("A1").await.unwrap().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.status.is_none() && i.note.is_empty()));
        assert_eq!(items[1].content, "Lights");
        assert!(repo.logs_list().await.unwrap().is_empty());

        let again = service.reset_kpi_data("RESET", &admin).await.unwrap();
        assert_eq!(again.logs, 0);
        assert_eq!(again.devices, 1);
        assert_eq!(repo.devices_get_by_id("A1").await.unwrap(), device);
    }

    #[tokio::test]
    async fn test_reset_reports_partial_failure() {
        let committed = Arc::new(Mutex::new(Vec::<String>::new()));
        let seen = committed.clone();

        let mut store = MockDocumentStore::new();
        store.expect_get_all().returning(|_| {
            Ok(vec![Document {
                id: "x".into(),
                data: json!({}),
            }])
        });
        store.expect_commit_batch().returning(move |collection, _| {
            if collection == HISTORY {
                return Err(AppError::Storage("write rejected".into()));
            }
            seen.lock().unwrap().push(collection.to_string());
            Ok(())
        });

        let service = KpiService::new(
            Repository::new(Arc::new(store)),
            KpiConfig::default(),
        );
        let admin = claims("ADMIN", "Admin", Role::Admin);

        match service.reset_kpi_data("RESET", &admin).await {
            Err(AppError::Storage(msg)) => {
                assert!(msg.contains("failed on history"), "{}", msg);
                assert!(msg.contains("logs"), "{}", msg);
            }
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
        // Later stages never ran
        assert_eq!(*committed.lock().unwrap(), vec!["logs".to_string()]);
    }
}
