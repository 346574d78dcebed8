use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};

use crate::{
    auth::SecretBox,
    domain::{PortfolioSettings, User},
    error::{AppError, Result},
    repository::PortfolioSettingsRepository,
};

/// Well-known key of the single settings record.
const SETTINGS_KEY: &str = "portfolio";

#[derive(FromRow)]
struct SettingsRow {
    netlify_token: String,
    hidden_site_ids: String,
}

pub struct SqlitePortfolioSettingsRepository {
    pool: SqlitePool,
    secret_box: SecretBox,
}

impl SqlitePortfolioSettingsRepository {
    pub fn new(pool: SqlitePool, secret_box: SecretBox) -> Self {
        Self { pool, secret_box }
    }
}

#[async_trait]
impl PortfolioSettingsRepository for SqlitePortfolioSettingsRepository {
    async fn get(&self) -> Result<PortfolioSettings> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT netlify_token, hidden_site_ids FROM portfolio_settings WHERE key = ?",
        )
        .bind(SETTINGS_KEY)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(PortfolioSettings::default());
        };

        let hidden_site_ids: BTreeSet<String> = serde_json::from_str(&row.hidden_site_ids)
            .map_err(|e| AppError::Database(format!("Invalid hidden site list: {}", e)))?;

        Ok(PortfolioSettings {
            netlify_token: self.secret_box.open(&row.netlify_token)?,
            hidden_site_ids,
        })
    }

    async fn save(&self, actor: &User, settings: &PortfolioSettings) -> Result<()> {
        if !actor.is_admin() {
            return Err(AppError::Permission(
                "Only administrators may change portfolio settings".to_string(),
            ));
        }

        let token = self.secret_box.seal(&settings.netlify_token)?;
        let hidden = serde_json::to_string(&settings.hidden_site_ids)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO portfolio_settings (key, netlify_token, hidden_site_ids, updated_by, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                netlify_token = excluded.netlify_token,
                hidden_site_ids = excluded.hidden_site_ids,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(SETTINGS_KEY)
        .bind(token)
        .bind(hidden)
        .bind(actor.id.to_string())
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        tracing::info!(admin = %actor.email, "Portfolio settings updated");
        Ok(())
    }
}
