//! Device roster service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        device::{default_categories, default_devices, Category, CreateDevice, Device, DeviceSummary, UpdateDevice},
        status::Status,
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct DevicesService {
    repository: Repository,
}

impl DevicesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Write the fixture roster into empty collections. Existing data is never touched.
    pub async fn seed_defaults(&self) -> AppResult<()> {
        if self.repository.categories_list().await?.is_empty() {
            for category in default_categories() {
                self.repository.categories_save(&category).await?;
            }
            tracing::info!("Seeded default categories");
        }
        if self.repository.devices_list().await?.is_empty() {
            let devices = default_devices();
            for device in &devices {
                self.repository.devices_save(device).await?;
            }
            tracing::info!("Seeded {} default devices", devices.len());
        }
        Ok(())
    }

    pub async fn list(&self) -> AppResult<Vec<Device>> {
        self.repository.devices_list().await
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Device> {
        self.repository.devices_get_by_id(id).await
    }

    pub async fn categories(&self) -> AppResult<Vec<Category>> {
        self.repository.categories_list().await
    }

    async fn ensure_category(&self, category_id: &str) -> AppResult<()> {
        let categories = self.repository.categories_list().await?;
        if categories.iter().any(|c| c.id == category_id) {
            Ok(())
        } else {
            Err(AppError::Validation(format!("Unknown category {}", category_id)))
        }
    }

    pub async fn create(&self, data: CreateDevice, admin: &UserClaims) -> AppResult<Device> {
        admin.require_admin()?;
        data.validate()?;

        let id = data.id.trim().to_uppercase();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::Validation(
                "Device id must contain only letters and digits".to_string(),
            ));
        }
        let name = data.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }
        self.ensure_category(&data.category_id).await?;

        if self.repository.devices_find(&id).await?.is_some() {
            return Err(AppError::Conflict(format!("Device {} already exists", id)));
        }

        let device = Device::new(&id, &data.category_id, name);
        self.repository.devices_save(&device).await?;
        tracing::info!("Device {} created by {}", id, admin.sub);
        Ok(device)
    }

    pub async fn update(&self, id: &str, data: UpdateDevice, admin: &UserClaims) -> AppResult<Device> {
        admin.require_admin()?;
        let mut device = self.repository.devices_get_by_id(id).await?;

        if let Some(name) = data.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::Validation("Name is required".to_string()));
            }
            device.name = name.to_string();
        }
        if let Some(category_id) = data.category_id {
            self.ensure_category(&category_id).await?;
            device.category_id = category_id;
        }

        self.repository.devices_save(&device).await?;
        Ok(device)
    }

    /// Remove a device together with its checklist
    pub async fn delete(&self, id: &str, admin: &UserClaims) -> AppResult<()> {
        admin.require_admin()?;
        if !self.repository.devices_delete(id).await? {
            return Err(AppError::NotFound(format!("Device {} not found", id)));
        }
        self.repository.checklist_delete(id).await?;
        tracing::info!("Device {} deleted by {}", id, admin.sub);
        Ok(())
    }

    pub async fn summary(&self) -> AppResult<DeviceSummary> {
        let devices = self.repository.devices_list().await?;
        let categories = self.repository.categories_list().await?;

        let mut summary = DeviceSummary {
            total: devices.len(),
            ..Default::default()
        };
        for device in &devices {
            match device.status {
                Some(Status::Ok) => summary.ok += 1,
                Some(Status::Nok) => summary.nok += 1,
                Some(Status::Na) => summary.na += 1,
                None => summary.unchecked += 1,
            }
        }
        summary.failed_categories = categories
            .into_iter()
            .filter(|c| {
                devices
                    .iter()
                    .any(|d| d.category_id == c.id && d.status == Some(Status::Nok))
            })
            .collect();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::Role,
        services::test_support::{claims, item, repository, seed_device},
    };

    fn admin() -> UserClaims {
        claims("ADMIN", "Admin", Role::Admin)
    }

    fn create_request(id: &str) -> CreateDevice {
        CreateDevice {
            id: id.into(),
            category_id: "CAT1".into(),
            name: "Bridge 6".into(),
        }
    }

    #[tokio::test]
    async fn test_seed_defaults_only_fills_empty_store() {
        let service = DevicesService::new(repository());
        service.seed_defaults().await.unwrap();
        let devices = service.list().await.unwrap();
        assert_eq!(devices.len(), 25);
        assert_eq!(devices[0].id, "A1");
        assert_eq!(service.categories().await.unwrap().len(), 11);

        service.delete("A1", &admin()).await.unwrap();
        service.seed_defaults().await.unwrap();
        assert_eq!(service.list().await.unwrap().len(), 24);
    }

    #[tokio::test]
    async fn test_create_normalises_and_rejects_duplicates() {
        let service = DevicesService::new(repository());
        service.seed_defaults().await.unwrap();

        let device = service.create(create_request(" a6 "), &admin()).await.unwrap();
        assert_eq!(device.id, "A6");
        assert_eq!(device.status, None);

        assert!(matches!(
            service.create(create_request("A6"), &admin()).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            service.create(create_request("A-7"), &admin()).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service
                .create(create_request("A7"), &claims("NV001", "An", Role::User))
                .await,
            Err(AppError::Authorization(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_checklist() {
        let repo = repository();
        seed_device(
            &repo,
            "B1",
            Some(Status::Ok),
            Some(vec![item("1", "Hinge", Some(Status::Ok), "")]),
        )
        .await;
        let service = DevicesService::new(repo.clone());

        service.delete("B1", &admin()).await.unwrap();
        assert!(repo.checklist_get("B1").await.unwrap().is_none());
        assert!(matches!(
            service.delete("B1", &admin()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let repo = repository();
        let service = DevicesService::new(repo.clone());
        service.seed_defaults().await.unwrap();
        seed_device(&repo, "A1", Some(Status::Nok), None).await;
        seed_device(&repo, "A2", Some(Status::Ok), None).await;
        seed_device(&repo, "A3", Some(Status::Na), None).await;

        let summary = service.summary().await.unwrap();
        assert_eq!(summary.total, 25);
        assert_eq!((summary.ok, summary.nok, summary.na), (1, 1, 1));
        assert_eq!(summary.unchecked, 22);
        assert_eq!(summary.failed_categories.len(), 1);
        assert_eq!(summary.failed_categories[0].id, "CAT1");
    }
}
