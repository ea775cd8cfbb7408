//! Device and category domain methods on Repository

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::device::{natural_cmp, Category, Device},
    store::collections::{CATEGORIES, SYSTEMS},
};

impl Repository {
    /// All devices in natural id order
    pub async fn devices_list(&self) -> AppResult<Vec<Device>> {
        let mut devices: Vec<Device> = self.list(SYSTEMS).await?;
        devices.sort_by(|a, b| natural_cmp(&a.id, &b.id));
        Ok(devices)
    }

    pub async fn devices_find(&self, id: &str) -> AppResult<Option<Device>> {
        self.get(SYSTEMS, id).await
    }

    pub async fn devices_get_by_id(&self, id: &str) -> AppResult<Device> {
        self.devices_find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Device {} not found", id)))
    }

    /// Full replace of a device document
    pub async fn devices_save(&self, device: &Device) -> AppResult<()> {
        self.put(SYSTEMS, Some(&device.id), device, false).await?;
        Ok(())
    }

    pub async fn devices_delete(&self, id: &str) -> AppResult<bool> {
        self.remove(SYSTEMS, id).await
    }

    pub async fn categories_list(&self) -> AppResult<Vec<Category>> {
        let mut categories: Vec<Category> = self.list(CATEGORIES).await?;
        categories.sort_by(|a, b| natural_cmp(&a.id, &b.id));
        Ok(categories)
    }

    pub async fn categories_save(&self, category: &Category) -> AppResult<()> {
        self.put(CATEGORIES, Some(&category.id), category, false).await?;
        Ok(())
    }
}
