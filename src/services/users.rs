//! Users service: roster management and code + password login

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        CreateUser, LoginResponse, LoginStatus, Role, User, UserClaims, UserInfo, SEED_ADMIN_CODE,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Create the `ADMIN` account when the roster is empty
    pub async fn ensure_seed_admin(&self) -> AppResult<()> {
        if self.repository.users_any_exist().await? {
            return Ok(());
        }
        tracing::info!("Roster is empty, seeding {} account", SEED_ADMIN_CODE);
        let admin = User {
            id: String::new(),
            code: SEED_ADMIN_CODE.to_string(),
            name: "Administrator".to_string(),
            role: Role::Admin,
            password: None,
        };
        self.repository.users_create(&admin).await?;
        Ok(())
    }

    /// Log in with an employee code. A user without a password sets it by
    /// logging in with one.
    pub async fn login(&self, code: &str, password: Option<&str>) -> AppResult<LoginResponse> {
        self.ensure_seed_admin().await?;

        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::Validation("Employee code is required".to_string()));
        }
        let mut user = self
            .repository
            .users_get_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee code {} does not exist", code)))?;

        let password = password.filter(|p| !p.is_empty());
        match (&user.password, password) {
            (None, None) => return Ok(LoginResponse::pending(LoginStatus::SetupRequired)),
            (None, Some(new_password)) => {
                self.check_length(new_password)?;
                let hash = self.hash_password(new_password)?;
                self.repository.users_update_password(&user.id, &hash).await?;
                user.password = Some(hash);
                tracing::info!("Password set for {}", user.code);
            }
            (Some(_), None) => return Ok(LoginResponse::pending(LoginStatus::PasswordRequired)),
            (Some(_), Some(given)) => {
                if !self.verify_password(&user, given)? {
                    tracing::warn!("Failed login for {}", user.code);
                    return Err(AppError::Authentication("Incorrect password".to_string()));
                }
            }
        }

        let token = self.create_token_for_user(&user)?;
        Ok(LoginResponse {
            status: LoginStatus::Ok,
            user: Some(UserInfo::from(user)),
            token: Some(token),
        })
    }

    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        UserClaims::new(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    fn check_length(&self, password: &str) -> AppResult<()> {
        if password.chars().count() < self.config.min_password_length {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                self.config.min_password_length
            )));
        }
        Ok(())
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        if let Some(ref hash) = user.password {
            let parsed_hash = PasswordHash::new(hash)
                .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
            return Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok());
        }
        Ok(false)
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    async fn get_by_code(&self, code: &str) -> AppResult<User> {
        self.repository
            .users_get_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", code)))
    }

    pub async fn me(&self, claims: &UserClaims) -> AppResult<UserInfo> {
        Ok(self.get_by_code(claims.code()).await?.into())
    }

    pub async fn change_password(
        &self,
        code: &str,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let user = self.get_by_code(code).await?;
        if user.password.is_some() && !self.verify_password(&user, current_password)? {
            return Err(AppError::Authentication(
                "Current password is incorrect".to_string(),
            ));
        }
        self.check_length(new_password)?;

        let hash = self.hash_password(new_password)?;
        self.repository.users_update_password(&user.id, &hash).await?;
        tracing::info!("Password changed for {}", user.code);
        Ok(())
    }

    /// Roster sorted by name
    pub async fn list(&self, admin: &UserClaims) -> AppResult<Vec<UserInfo>> {
        admin.require_admin()?;
        let mut users = self.repository.users_list().await?;
        users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(users.into_iter().map(UserInfo::from).collect())
    }

    pub async fn create(&self, data: CreateUser, admin: &UserClaims) -> AppResult<UserInfo> {
        admin.require_admin()?;
        let data = CreateUser {
            code: data.code.trim().to_string(),
            name: data.name.trim().to_string(),
            ..data
        };
        data.validate()?;

        if self.repository.users_get_by_code(&data.code).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Employee code {} already exists",
                data.code
            )));
        }

        let mut user = User {
            id: String::new(),
            code: data.code,
            name: data.name,
            role: data.role.unwrap_or_default(),
            password: None,
        };
        user.id = self.repository.users_create(&user).await?;
        tracing::info!("User {} added by {}", user.code, admin.sub);
        Ok(user.into())
    }

    pub async fn delete(&self, id: &str, admin: &UserClaims) -> AppResult<()> {
        admin.require_admin()?;
        let user = self.repository.users_get_by_id(id).await?;
        if user.code == admin.code() {
            return Err(AppError::BadRequest("You cannot delete your own account".to_string()));
        }
        self.repository.users_delete(id).await?;
        Ok(())
    }
}
