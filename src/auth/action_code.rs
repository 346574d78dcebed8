use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::auth::{generate_token, session::hash_token};
use crate::error::{AppError, Result};

/// What a one-time code authorizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionMode {
    #[serde(rename = "resetPassword")]
    ResetPassword,
    #[serde(rename = "verifyEmail")]
    VerifyEmail,
}

impl ActionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionMode::ResetPassword => "resetPassword",
            ActionMode::VerifyEmail => "verifyEmail",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "resetPassword" => Some(ActionMode::ResetPassword),
            "verifyEmail" => Some(ActionMode::VerifyEmail),
            _ => None,
        }
    }
}

#[derive(FromRow)]
struct ActionCodeRow {
    user_id: String,
    mode: String,
    expires_at: NaiveDateTime,
    consumed_at: Option<NaiveDateTime>,
}

/// Single-use codes delivered by email. Only the SHA-256 of a code is stored.
pub struct ActionCodeStore {
    pool: SqlitePool,
    ttl: Duration,
}

impl ActionCodeStore {
    pub fn new(pool: SqlitePool, ttl_minutes: i64) -> Self {
        Self {
            pool,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Issue a fresh code and return the raw value for the email link.
    pub async fn issue(&self, user_id: Uuid, mode: ActionMode) -> Result<String> {
        let code = generate_token();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO action_codes (code_hash, user_id, mode, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(hash_token(&code))
        .bind(user_id.to_string())
        .bind(mode.as_str())
        .bind((now + self.ttl).naive_utc())
        .bind(now.naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(code)
    }

    /// Check a code without using it up. Returns the owning user.
    pub async fn check(&self, code: &str, mode: ActionMode) -> Result<Uuid> {
        let row = sqlx::query_as::<_, ActionCodeRow>(
            "SELECT user_id, mode, expires_at, consumed_at FROM action_codes WHERE code_hash = ?",
        )
        .bind(hash_token(code))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(invalid_code)?;

        if row.mode != mode.as_str() || row.consumed_at.is_some() {
            return Err(invalid_code());
        }
        if DateTime::<Utc>::from_naive_utc_and_offset(row.expires_at, Utc) <= Utc::now() {
            return Err(AppError::BadRequest(
                "This link has expired. Please request a new one.".to_string(),
            ));
        }

        Uuid::parse_str(&row.user_id).map_err(|e| AppError::Database(e.to_string()))
    }

    /// Validate and mark the code used. A second call with the same code fails.
    pub async fn consume(&self, code: &str, mode: ActionMode) -> Result<Uuid> {
        let user_id = self.check(code, mode).await?;

        // Guard on consumed_at so two racing requests cannot both succeed
        let result = sqlx::query(
            "UPDATE action_codes SET consumed_at = ? WHERE code_hash = ? AND consumed_at IS NULL",
        )
        .bind(Utc::now().naive_utc())
        .bind(hash_token(code))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(invalid_code());
        }

        tracing::debug!(user_id = %user_id, mode = mode.as_str(), "Action code consumed");
        Ok(user_id)
    }

    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM action_codes WHERE expires_at <= ? OR consumed_at IS NOT NULL",
        )
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn invalid_code() -> AppError {
    AppError::BadRequest("This link is invalid or has already been used.".to_string())
}
