use crate::{
    auth::{password, AuthError, AuthService, TokenResponse},
    db::DbPool,
    entities::{inventory_audit, user, UserRole},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid username pattern"));

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(
        length(min = 3, max = 50, message = "username must be 3-50 characters"),
        regex(path = "USERNAME_PATTERN", message = "username may only contain letters, digits, '.', '_' and '-'")
    )]
    pub username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "password must be 8-128 characters"))]
    pub password: String,
    /// Defaults to `staff`; ignored by the setup endpoint
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Username or email address
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "current_password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "new_password must be 8-128 characters"))]
    pub new_password: String,
}

/// Account as exposed over the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            role: model.role,
            is_active: model.is_active,
            last_login_at: model.last_login_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: TokenResponse,
    pub user: UserResponse,
}

pub struct UserService {
    db: Arc<DbPool>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db: Arc<DbPool>, auth: Arc<AuthService>) -> Self {
        Self { db, auth }
    }

    /// Creates the first manager account. Only allowed while no users exist.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn setup_first_manager(
        &self,
        request: CreateUserRequest,
    ) -> Result<UserResponse, ServiceError> {
        if user::Entity::find().count(self.db.as_ref()).await? > 0 {
            return Err(ServiceError::Conflict(
                "Setup has already been completed".to_string(),
            ));
        }
        let created = self.insert_user(request, UserRole::Manager).await?;
        info!(user_id = created.id, "Initial manager account created");
        Ok(created)
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserResponse, ServiceError> {
        let role = request.role.unwrap_or_default();
        let created = self.insert_user(request, role).await?;
        info!(user_id = created.id, role = %created.role, "User account created");
        Ok(created)
    }

    async fn insert_user(
        &self,
        request: CreateUserRequest,
        role: UserRole,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        reject_hash_shaped(&request.password)?;
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_lowercase();

        let taken = user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(username.as_str()))
                    .add(user::Column::Email.eq(email.as_str())),
            )
            .count(self.db.as_ref())
            .await?;
        if taken > 0 {
            return Err(ServiceError::Conflict(
                "Username or email is already registered".to_string(),
            ));
        }

        let password_hash = hash_off_thread(request.password).await?;
        let created = user::ActiveModel {
            username: Set(username),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(role),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await?;

        Ok(created.into())
    }

    /// Verifies credentials and issues an access token.
    #[instrument(skip(self, request), fields(login = %request.username))]
    pub async fn authenticate(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        request.validate()?;
        let login = request.username.trim();

        let account = user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(login))
                    .add(user::Column::Email.eq(login.to_lowercase())),
            )
            .one(self.db.as_ref())
            .await?;

        let account = match account {
            Some(account) if password::verify_password(&request.password, &account.password_hash) => {
                account
            }
            _ => {
                warn!("Failed login attempt");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !account.is_active {
            warn!(user_id = account.id, "Login attempt on disabled account");
            return Err(AuthError::AccountDisabled.into());
        }

        let mut active: user::ActiveModel = account.into();
        active.last_login_at = Set(Some(Utc::now()));
        let account = active.update(self.db.as_ref()).await?;

        let token = self.auth.generate_token(&account)?;
        info!(user_id = account.id, "User logged in");

        Ok(LoginResponse {
            token,
            user: account.into(),
        })
    }

    pub async fn get(&self, id: i32) -> Result<UserResponse, ServiceError> {
        Ok(self.find(id).await?.into())
    }

    pub async fn list(&self) -> Result<Vec<UserResponse>, ServiceError> {
        let users = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(self.db.as_ref())
            .await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    /// Updates email, role or active flag. Managers cannot demote or disable
    /// their own account.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdateUserRequest,
        acting_user_id: i32,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        if id == acting_user_id
            && (request.role == Some(UserRole::Staff) || request.is_active == Some(false))
        {
            return Err(ServiceError::ValidationError(
                "You cannot demote or deactivate your own account".to_string(),
            ));
        }

        let existing = self.find(id).await?;
        let mut active: user::ActiveModel = existing.clone().into();

        if let Some(email) = request.email {
            let email = email.trim().to_lowercase();
            if email != existing.email {
                let taken = user::Entity::find()
                    .filter(user::Column::Email.eq(email.as_str()))
                    .filter(user::Column::Id.ne(id))
                    .count(self.db.as_ref())
                    .await?;
                if taken > 0 {
                    return Err(ServiceError::Conflict(
                        "Email is already registered".to_string(),
                    ));
                }
                active.email = Set(email);
            }
        }
        if let Some(role) = request.role {
            active.role = Set(role);
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }

        let updated = active.update(self.db.as_ref()).await?;
        info!(user_id = id, role = %updated.role, is_active = updated.is_active, "User updated");
        Ok(updated.into())
    }

    #[instrument(skip(self, request))]
    pub async fn change_password(
        &self,
        id: i32,
        request: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        request.validate()?;
        reject_hash_shaped(&request.new_password)?;
        let existing = self.find(id).await?;
        if !password::verify_password(&request.current_password, &existing.password_hash) {
            return Err(ServiceError::ValidationError(
                "Current password is incorrect".to_string(),
            ));
        }

        let mut active: user::ActiveModel = existing.into();
        active.password_hash = Set(hash_off_thread(request.new_password).await?);
        active.update(self.db.as_ref()).await?;
        info!(user_id = id, "Password changed");
        Ok(())
    }

    /// Deletes an account that has never touched stock.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32, acting_user_id: i32) -> Result<(), ServiceError> {
        if id == acting_user_id {
            return Err(ServiceError::ValidationError(
                "You cannot delete your own account".to_string(),
            ));
        }
        self.find(id).await?;

        let audits = inventory_audit::Entity::find()
            .filter(inventory_audit::Column::UserId.eq(id))
            .count(self.db.as_ref())
            .await?;
        if audits > 0 {
            return Err(ServiceError::Conflict(format!(
                "User {id} is referenced by {audits} audit entries; deactivate the account instead"
            )));
        }

        user::Entity::delete_by_id(id).exec(self.db.as_ref()).await?;
        info!(user_id = id, "User deleted");
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }
}

/// A plaintext that already parses as a PHC string would otherwise be stored as the hash itself.
fn reject_hash_shaped(plain: &str) -> Result<(), ServiceError> {
    if password::is_hashed(plain) {
        return Err(ServiceError::ValidationError(
            "password must not be a password hash".to_string(),
        ));
    }
    Ok(())
}

/// Argon2 is CPU bound; keep it off the async workers.
async fn hash_off_thread(plain: String) -> Result<String, ServiceError> {
    let hashed = tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| ServiceError::HashError(e.to_string()))??;
    Ok(hashed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_rules() {
        let valid = CreateUserRequest {
            username: "jo.smith".into(),
            email: "jo@example.com".into(),
            password: "s3cure-pass".into(),
            role: None,
        };
        assert!(valid.validate().is_ok());

        let bad_username = CreateUserRequest {
            username: "jo smith".into(),
            ..valid.clone()
        };
        assert!(bad_username.validate().is_err());

        let short_password = CreateUserRequest {
            password: "short".into(),
            ..valid.clone()
        };
        assert!(short_password.validate().is_err());

        let bad_email = CreateUserRequest {
            email: "not-an-email".into(),
            ..valid
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn response_never_carries_password_hash() {
        let now = Utc::now();
        let response = UserResponse::from(user::Model {
            id: 1,
            username: "jo".into(),
            email: "jo@example.com".into(),
            password_hash: "$argon2id$v=19$...".into(),
            role: UserRole::Staff,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        });
        let json = serde_json::to_value(response).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "staff");
    }
}
