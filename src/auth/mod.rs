use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::{SaltString, rand_core::OsRng};
use chrono::{Duration, Utc};
use cookie::{Cookie, SameSite};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    domain::{Account, Role, User},
    error::{AppError, Result},
};

pub mod action_code;
pub mod csrf;
pub mod secret_box;
pub mod session;

use session::{Session, SessionStore};
pub use action_code::{ActionCodeStore, ActionMode};
pub use csrf::CsrfService;
pub use secret_box::SecretBox;

pub const SESSION_COOKIE: &str = "session";

pub struct AuthService {
    session_store: SessionStore,
    session_duration_hours: i64,
    admin_email_domain: String,
}

impl AuthService {
    pub fn new(pool: SqlitePool, session_duration_hours: i64, admin_email_domain: String) -> Self {
        Self {
            session_store: SessionStore::new(pool),
            session_duration_hours,
            admin_email_domain: admin_email_domain.trim_start_matches('@').to_lowercase(),
        }
    }

    pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        let argon2 = Argon2::default();

        Ok(argon2.verify_password(password.as_bytes(), &parsed_hash).is_ok())
    }

    pub async fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    pub async fn create_session(&self, user_id: Uuid) -> Result<(Session, String)> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(self.session_duration_hours);

        let session = self.session_store
            .create(user_id, &token, expires_at)
            .await?;

        Ok((session, token))
    }

    pub async fn validate_session(&self, token: &str) -> Result<Option<Session>> {
        self.session_store.find_by_token(token).await
    }

    pub async fn invalidate_session(&self, token: &str) -> Result<()> {
        self.session_store.delete_by_token(token).await
    }

    pub async fn invalidate_user_sessions(&self, user_id: Uuid) -> Result<u64> {
        self.session_store.delete_by_user(user_id).await
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<u64> {
        self.session_store.cleanup_expired().await
    }

    /// Build the identity projection for an account. An explicit role
    /// assignment wins; otherwise accounts on the admin domain are admins.
    pub fn project_user(&self, account: &Account) -> User {
        project_user(account, &self.admin_email_domain)
    }

    pub fn create_session_cookie(&self, token: &str, secure: bool) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token.to_string()))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .secure(secure)
            .max_age(cookie::time::Duration::hours(self.session_duration_hours))
            .build()
    }

    pub fn create_logout_cookie() -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(cookie::time::Duration::seconds(0))
            .build()
    }
}

pub fn resolve_role(account: &Account, admin_email_domain: &str) -> Role {
    if let Some(role) = account.assigned_role {
        return role;
    }
    let suffix = format!("@{}", admin_email_domain);
    if account.email.to_lowercase().ends_with(&suffix) {
        Role::Admin
    } else {
        Role::Client
    }
}

pub fn project_user(account: &Account, admin_email_domain: &str) -> User {
    let name = account
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| email_local_part(&account.email).to_string());

    User {
        id: account.id,
        email: account.email.clone(),
        name,
        avatar: account.avatar_url.clone(),
        role: resolve_role(account, admin_email_domain),
        email_verified: account.email_verified,
    }
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

pub(crate) fn generate_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
