//! Business logic services

pub mod backup;
pub mod checklist;
pub mod devices;
pub mod incidents;
pub mod kpi;
pub mod maintenance;
pub mod reports;
pub mod users;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub checklist: checklist::ChecklistService,
    pub kpi: kpi::KpiService,
    pub devices: devices::DevicesService,
    pub incidents: incidents::IncidentsService,
    pub maintenance: maintenance::MaintenanceService,
    pub users: users::UsersService,
    pub reports: reports::ReportsService,
    pub backup: backup::BackupService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            checklist: checklist::ChecklistService::new(repository.clone()),
            kpi: kpi::KpiService::new(repository.clone(), config.kpi.clone()),
            devices: devices::DevicesService::new(repository.clone()),
            incidents: incidents::IncidentsService::new(repository.clone()),
            maintenance: maintenance::MaintenanceService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), config.auth.clone()),
            reports: reports::ReportsService::new(repository.clone()),
            backup: backup::BackupService::new(repository.clone()),
            repository,
        }
    }

    /// Seed fixtures into empty collections
    pub async fn seed_defaults(&self) -> AppResult<()> {
        self.devices.seed_defaults().await?;
        self.users.ensure_seed_admin().await?;
        Ok(())
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }
}
