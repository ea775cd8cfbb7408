//! User roster domain methods on Repository

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::user::User,
    store::collections::USERS,
};

impl Repository {
    pub async fn users_list(&self) -> AppResult<Vec<User>> {
        self.list(USERS).await
    }

    pub async fn users_any_exist(&self) -> AppResult<bool> {
        Ok(!self.dump(USERS).await?.is_empty())
    }

    /// Codes are compared exactly
    pub async fn users_get_by_code(&self, code: &str) -> AppResult<Option<User>> {
        let users = self.users_list().await?;
        Ok(users.into_iter().find(|u| u.code == code))
    }

    pub async fn users_get_by_id(&self, id: &str) -> AppResult<User> {
        self.get(USERS, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    pub async fn users_create(&self, user: &User) -> AppResult<String> {
        self.put(USERS, None, user, false).await
    }

    pub async fn users_update_password(&self, id: &str, hash: &str) -> AppResult<()> {
        let patch = serde_json::json!({ "password": hash });
        self.put(USERS, Some(id), &patch, true).await?;
        Ok(())
    }

    pub async fn users_delete(&self, id: &str) -> AppResult<bool> {
        self.remove(USERS, id).await
    }
}
