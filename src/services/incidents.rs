//! Incident reports

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        incident::{CreateIncident, Incident, IncidentStatus, ResolveIncident},
        timestamp,
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct IncidentsService {
    repository: Repository,
}

impl IncidentsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Newest first
    pub async fn list(&self) -> AppResult<Vec<Incident>> {
        let mut incidents = self.repository.incidents_list().await?;
        incidents.sort_by_key(|i| std::cmp::Reverse(timestamp::parse(&i.created_at)));
        Ok(incidents)
    }

    pub async fn create(&self, data: CreateIncident, admin: &UserClaims) -> AppResult<Incident> {
        admin.require_admin()?;
        let data = CreateIncident {
            title: data.title.trim().to_string(),
            system_name: data.system_name.trim().to_string(),
            ..data
        };
        data.validate()?;

        let mut incident = Incident {
            id: String::new(),
            title: data.title,
            system_name: data.system_name,
            description: data.description,
            status: IncidentStatus::Open,
            assigned_to: data.assigned_to.filter(|a| !a.trim().is_empty()),
            reported_by: admin.name.clone(),
            created_at: timestamp::now_display(),
            resolved_by: None,
            resolved_at: None,
            resolution_note: None,
            participants: Vec::new(),
        };
        incident.id = self.repository.incidents_save(&incident).await?;
        tracing::info!("Incident {} opened on {}", incident.id, incident.system_name);
        Ok(incident)
    }

    /// Close an incident; every listed participant shares the credit
    pub async fn resolve(
        &self,
        id: &str,
        data: ResolveIncident,
        resolver: &UserClaims,
    ) -> AppResult<Incident> {
        let note = data.note.trim();
        if note.is_empty() {
            return Err(AppError::Validation("A resolution note is required".to_string()));
        }
        let participants: Vec<String> = data
            .participants
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if participants.is_empty() {
            return Err(AppError::Validation(
                "At least one participant is required".to_string(),
            ));
        }

        let mut incident = self.repository.incidents_get_by_id(id).await?;
        if incident.status == IncidentStatus::Resolved {
            return Err(AppError::Conflict(format!("Incident {} is already resolved", id)));
        }

        incident.status = IncidentStatus::Resolved;
        incident.resolved_by = Some(resolver.name.clone());
        incident.resolved_at = Some(timestamp::now_display());
        incident.resolution_note = Some(note.to_string());
        incident.participants = participants;
        self.repository.incidents_save(&incident).await?;
        Ok(incident)
    }
}
