//! Checklist documents, one per device id

use super::Repository;
use crate::{
    error::AppResult,
    models::checklist::{Checklist, ChecklistItem},
    store::collections::DETAILS,
};

impl Repository {
    /// Stored items, `None` when the checklist was never saved
    pub async fn checklist_get(&self, device_id: &str) -> AppResult<Option<Vec<ChecklistItem>>> {
        let checklist: Option<Checklist> = self.get(DETAILS, device_id).await?;
        Ok(checklist.map(|c| c.items))
    }

    pub async fn checklist_save(&self, device_id: &str, items: &[ChecklistItem]) -> AppResult<()> {
        let checklist = Checklist {
            items: items.to_vec(),
        };
        self.put(DETAILS, Some(device_id), &checklist, false).await?;
        Ok(())
    }

    pub async fn checklist_delete(&self, device_id: &str) -> AppResult<bool> {
        self.remove(DETAILS, device_id).await
    }

    /// Every stored checklist keyed by device id
    pub async fn checklists_all(&self) -> AppResult<Vec<(String, Vec<ChecklistItem>)>> {
        let documents = self.dump(DETAILS).await?;
        let mut checklists = Vec::with_capacity(documents.len());
        for doc in documents {
            let checklist: Checklist = doc.decode()?;
            checklists.push((doc.id, checklist.items));
        }
        Ok(checklists)
    }
}
