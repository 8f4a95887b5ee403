//! User and identity service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use civicwatch_common::{AppError, AppResult, IdGenerator, MediaStore};
use civicwatch_db::{
    entities::{user, user::Role},
    repositories::{ReportRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::warn;
use validator::Validate;

use crate::services::Page;

/// User service for registration, sessions and admin user management.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    report_repo: Option<ReportRepository>,
    media_store: Option<MediaStore>,
    id_gen: IdGenerator,
}

/// Reports fetched per round when clearing a deleted account's media.
const CLEANUP_BATCH: u64 = 100;

/// Input for registering a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Input for logging in.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            report_repo: None,
            media_store: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Attach report access and a media store so deleted accounts also drop
    /// their reports' stored files.
    #[must_use]
    pub fn with_media_cleanup(mut self, report_repo: ReportRepository, store: MediaStore) -> Self {
        self.report_repo = Some(report_repo);
        self.media_store = Some(store);
        self
    }

    /// Register a new user and open a session.
    ///
    /// Returns the created user together with its session token.
    pub async fn register(&self, input: RegisterInput) -> AppResult<(user::Model, String)> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let token = self.id_gen.generate_token();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(Role::User),
            is_active: Set(true),
            token: Set(Some(token.clone())),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.user_repo.create(model).await?;
        Ok((created, token))
    }

    /// Authenticate with email and password, rotating the session token.
    pub async fn login(&self, input: LoginInput) -> AppResult<(user::Model, String)> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        if !user.is_active {
            return Err(AppError::Forbidden("Account is deactivated".to_string()));
        }

        // A fresh token per login invalidates older sessions.
        let token = self.id_gen.generate_token();
        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(token.clone()));
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        let updated = self.user_repo.update(active).await?;

        Ok((updated, token))
    }

    /// Authenticate a user by session token.
    ///
    /// Deactivated accounts hold a token but may not act with it.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.is_active {
            return Err(AppError::Forbidden("Account is deactivated".to_string()));
        }

        Ok(user)
    }

    /// Close a user's session by rotating the token, invalidating the
    /// one that was presented.
    pub async fn logout(&self, user_id: &str) -> AppResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(self.id_gen.generate_token()));
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        self.user_repo.update(active).await?;
        Ok(())
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// List users for the admin panel, optionally filtered by a search term.
    pub async fn list_users(
        &self,
        actor: &user::Model,
        search: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Page<user::Model>> {
        require_admin(actor)?;

        let items = self.user_repo.list(search, limit, offset).await?;
        let total = self.user_repo.count(search).await?;
        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    /// Change a user's role. Admins may not change their own role.
    pub async fn set_role(
        &self,
        actor: &user::Model,
        user_id: &str,
        role: Role,
    ) -> AppResult<user::Model> {
        require_admin(actor)?;
        if actor.id == user_id {
            return Err(AppError::Validation(
                "Cannot change your own role".to_string(),
            ));
        }

        let user = self.user_repo.get_by_id(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.role = Set(role);
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        self.user_repo.update(active).await
    }

    /// Activate or deactivate an account. Admins may not deactivate themselves.
    ///
    /// Deactivation also clears the session token, ending any open session.
    pub async fn set_active(
        &self,
        actor: &user::Model,
        user_id: &str,
        is_active: bool,
    ) -> AppResult<user::Model> {
        require_admin(actor)?;
        if actor.id == user_id {
            return Err(AppError::Validation(
                "Cannot change your own account status".to_string(),
            ));
        }

        let user = self.user_repo.get_by_id(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.is_active = Set(is_active);
        if !is_active {
            active.token = Set(None);
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        self.user_repo.update(active).await
    }

    /// Delete an account. Admins may not delete themselves. The user's
    /// reports and upvotes cascade at the schema level; stored media for
    /// those reports is removed best-effort before the row goes away.
    pub async fn delete_user(&self, actor: &user::Model, user_id: &str) -> AppResult<()> {
        require_admin(actor)?;
        if actor.id == user_id {
            return Err(AppError::Validation(
                "Cannot delete your own account".to_string(),
            ));
        }

        if let (Some(report_repo), Some(store)) = (&self.report_repo, &self.media_store) {
            let mut offset = 0;
            loop {
                let batch = report_repo
                    .find_by_owner(user_id, CLEANUP_BATCH, offset)
                    .await?;
                for report in &batch {
                    for attachment in report.attachments() {
                        let Some(key) = store.key_for_url(&attachment.url) else {
                            continue;
                        };
                        if let Err(e) = store.delete(&key).await {
                            warn!(user_id = %user_id, key = %key, error = %e, "Failed to delete media file");
                        }
                    }
                }
                if (batch.len() as u64) < CLEANUP_BATCH {
                    break;
                }
                offset += CLEANUP_BATCH;
            }
        }

        self.user_repo.delete(user_id).await
    }
}

/// Gate admin-only operations on the actor's role.
fn require_admin(actor: &user::Model) -> AppResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin role required".to_string()))
    }
}

/// Hash a password with Argon2id and a random salt.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored Argon2 hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_user(id: &str, email: &str, is_active: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: hash_password("correct horse").unwrap(),
            role: Role::User,
            is_active,
            token: Some("tok123".to_string()),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service_with(results: Vec<Vec<user::Model>>) -> UserService {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(results)
                .into_connection(),
        );
        UserService::new(UserRepository::new(db))
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password_correct() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(verify_password("test_password_123", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_incorrect() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("test", "invalid_hash").is_err());
    }

    #[test]
    fn test_register_input_rejects_short_password() {
        let input = RegisterInput {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "short".to_string(),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_register_input_rejects_bad_email() {
        let input = RegisterInput {
            name: "Ada".to_string(),
            email: "not-an-email".to_string(),
            password: "long enough password".to_string(),
        };
        assert!(input.validate().is_err());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let existing = create_test_user("u1", "ada@example.com", true);
        let service = service_with(vec![vec![existing]]);

        let result = service
            .register(RegisterInput {
                name: "Ada".to_string(),
                email: "Ada@Example.com".to_string(),
                password: "long enough password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_authenticate_by_token_unknown() {
        let service = service_with(vec![vec![]]);

        let result = service.authenticate_by_token("nope").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authenticate_by_token_deactivated() {
        let user = create_test_user("u1", "ada@example.com", false);
        let service = service_with(vec![vec![user]]);

        let result = service.authenticate_by_token("tok123").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let user = create_test_user("u1", "ada@example.com", true);
        let service = service_with(vec![vec![user]]);

        let result = service
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "wrong".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_deactivated_account() {
        let user = create_test_user("u1", "ada@example.com", false);
        let service = service_with(vec![vec![user]]);

        let result = service
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    fn admin_user(id: &str) -> user::Model {
        let mut user = create_test_user(id, "admin@example.com", true);
        user.role = Role::Admin;
        user
    }

    #[tokio::test]
    async fn test_set_role_rejects_self() {
        let service = service_with(vec![]);
        let admin = admin_user("u1");

        let result = service.set_role(&admin, "u1", Role::User).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_set_active_rejects_self() {
        let service = service_with(vec![]);
        let admin = admin_user("u1");

        let result = service.set_active(&admin, "u1", false).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_user_rejects_self() {
        let service = service_with(vec![]);
        let admin = admin_user("u1");

        let result = service.delete_user(&admin, "u1").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_admin_ops_reject_non_admin() {
        let service = service_with(vec![]);
        let plain = create_test_user("u1", "u1@example.com", true);

        let result = service.set_role(&plain, "u2", Role::Admin).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let result = service.list_users(&plain, None, 20, 0).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
