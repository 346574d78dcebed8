use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        NewProject, PaymentMethod, PaymentStatus, Project, ProjectChanges, ProjectStatus,
    },
    error::{AppError, Result},
    repository::ProjectRepository,
};

const PROJECT_COLUMNS: &str = r#"
    id, user_id, user_email, user_name, contact_email, title, description,
    budget, status, payment_status, is_free_trial, tech_stack,
    payment_method, sender_name, transaction_id, created_at, updated_at
"#;

#[derive(FromRow)]
struct ProjectRow {
    id: String,
    user_id: String,
    user_email: String,
    user_name: Option<String>,
    contact_email: Option<String>,
    title: String,
    description: String,
    budget: f64,
    status: String,
    payment_status: String,
    is_free_trial: i64,
    tech_stack: String,
    payment_method: Option<String>,
    sender_name: Option<String>,
    transaction_id: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteProjectRepository {
    pool: SqlitePool,
}

impl SqliteProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_project(row: ProjectRow) -> Result<Project> {
        let status = ProjectStatus::parse(&row.status)
            .ok_or_else(|| AppError::Database(format!("Invalid project status: {}", row.status)))?;
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            AppError::Database(format!("Invalid payment status: {}", row.payment_status))
        })?;
        let payment_method = row
            .payment_method
            .as_deref()
            .map(|m| {
                PaymentMethod::parse(m)
                    .ok_or_else(|| AppError::Database(format!("Invalid payment method: {}", m)))
            })
            .transpose()?;
        let tech_stack: Vec<String> = serde_json::from_str(&row.tech_stack)
            .map_err(|e| AppError::Database(format!("Invalid tech stack: {}", e)))?;

        Ok(Project {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            user_id: Uuid::parse_str(&row.user_id).map_err(|e| AppError::Database(e.to_string()))?,
            user_email: row.user_email,
            user_name: row.user_name,
            contact_email: row.contact_email,
            title: row.title,
            description: row.description,
            budget: row.budget,
            status,
            payment_status,
            is_free_trial: row.is_free_trial != 0,
            tech_stack,
            payment_method,
            sender_name: row.sender_name,
            transaction_id: row.transaction_id,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    async fn fetch_many(&self, sql: &str, bind: Option<String>) -> Result<Vec<Project>> {
        let mut query = sqlx::query_as::<_, ProjectRow>(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.into_iter().map(Self::row_to_project).collect()
    }
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn create(&self, project: NewProject) -> Result<Project> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let tech_stack = serde_json::to_string(&project.tech_stack)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO projects (
                id, user_id, user_email, user_name, contact_email, title, description,
                budget, status, payment_status, is_free_trial, tech_stack,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(project.user_id.to_string())
        .bind(&project.user_email)
        .bind(&project.user_name)
        .bind(&project.contact_email)
        .bind(&project.title)
        .bind(&project.description)
        .bind(project.budget)
        .bind(project.status.as_str())
        .bind(project.payment_status.as_str())
        .bind(project.is_free_trial as i64)
        .bind(tech_stack)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.message().contains("UNIQUE") => {
                AppError::Conflict("The free trial has already been used".to_string())
            }
            other => AppError::from(other),
        })?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created project".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>> {
        let sql = format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS);
        let row = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_project).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects ORDER BY created_at DESC, rowid DESC",
            PROJECT_COLUMNS
        );
        self.fetch_many(&sql, None).await
    }

    async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
            PROJECT_COLUMNS
        );
        self.fetch_many(&sql, Some(user_id.to_string())).await
    }

    async fn count_by_owner(&self, user_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM projects WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn list_by_payment_status(&self, status: PaymentStatus) -> Result<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects WHERE payment_status = ? ORDER BY created_at DESC, rowid DESC",
            PROJECT_COLUMNS
        );
        self.fetch_many(&sql, Some(status.as_str().to_string())).await
    }

    async fn update(&self, id: Uuid, changes: ProjectChanges) -> Result<Project> {
        if !changes.is_empty() {
            let now = Utc::now().naive_utc();
            let evidence = changes.evidence.as_ref();

            // Evidence fields are only ever overwritten, never cleared
            let result = sqlx::query(
                r#"
                UPDATE projects
                SET status = COALESCE(?, status),
                    payment_status = COALESCE(?, payment_status),
                    payment_method = COALESCE(?, payment_method),
                    sender_name = COALESCE(?, sender_name),
                    transaction_id = COALESCE(?, transaction_id),
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(changes.status.map(|s| s.as_str()))
            .bind(changes.payment_status.map(|s| s.as_str()))
            .bind(evidence.map(|e| e.payment_method.as_str()))
            .bind(evidence.map(|e| e.sender_name.as_str()))
            .bind(evidence.map(|e| e.transaction_id.as_str()))
            .bind(now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::NotFound("Project not found".to_string()));
            }
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
    }
}
