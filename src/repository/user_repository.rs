use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Account, CreateAccountRequest, Role},
    error::{AppError, Result},
    repository::UserRepository,
};

#[derive(FromRow)]
struct AccountRow {
    id: String,
    email: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
    email_verified: i64,
    role: Option<String>,
    created_at: NaiveDateTime,
}

const ACCOUNT_SELECT: &str = r#"
    SELECT u.id, u.email, u.display_name, u.avatar_url, u.email_verified,
           r.role, u.created_at
    FROM users u
    LEFT JOIN user_roles r ON r.user_id = u.id
"#;

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_account(row: AccountRow) -> Result<Account> {
        let assigned_role = row
            .role
            .as_deref()
            .map(|r| Role::parse(r).ok_or_else(|| AppError::Database(format!("Invalid role: {}", r))))
            .transpose()?;

        Ok(Account {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            email: row.email,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
            email_verified: row.email_verified != 0,
            assigned_role,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, request: CreateAccountRequest, password_hash: String) -> Result<Account> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, display_name, password_hash, email_verified, created_at, updated_at
            ) VALUES (?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(&password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.message().contains("UNIQUE") => {
                AppError::Conflict("An account with this email already exists".to_string())
            }
            other => AppError::from(other),
        })?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created account".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let sql = format!("{} WHERE u.id = ?", ACCOUNT_SELECT);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_account).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let sql = format!("{} WHERE u.email = ?", ACCOUNT_SELECT);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_account).transpose()
    }

    async fn get_password_hash(&self, email: &str) -> Result<Option<String>> {
        let hash = sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(hash)
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(Utc::now().naive_utc())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Account not found".to_string()));
        }
        Ok(())
    }

    async fn mark_email_verified(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE users SET email_verified = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now().naive_utc())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Account not found".to_string()));
        }
        Ok(())
    }

    async fn assign_role(&self, id: Uuid, role: Role) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role, granted_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                role = excluded.role,
                granted_at = excluded.granted_at
            "#,
        )
        .bind(id.to_string())
        .bind(role.as_str())
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
