use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod portfolio_settings_repository;
pub mod project_repository;
pub mod user_repository;

pub use portfolio_settings_repository::SqlitePortfolioSettingsRepository;
pub use project_repository::SqliteProjectRepository;
pub use user_repository::SqliteUserRepository;

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, project: NewProject) -> Result<Project>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>>;
    /// Every project, newest first.
    async fn list_all(&self) -> Result<Vec<Project>>;
    /// One owner's projects, newest first.
    async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<Project>>;
    async fn count_by_owner(&self, user_id: Uuid) -> Result<i64>;
    async fn list_by_payment_status(&self, status: PaymentStatus) -> Result<Vec<Project>>;
    /// Partial update. Last write wins; there is no version check.
    async fn update(&self, id: Uuid, changes: ProjectChanges) -> Result<Project>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, request: CreateAccountRequest, password_hash: String) -> Result<Account>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;
    async fn get_password_hash(&self, email: &str) -> Result<Option<String>>;
    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<()>;
    async fn mark_email_verified(&self, id: Uuid) -> Result<()>;
    async fn assign_role(&self, id: Uuid, role: Role) -> Result<()>;
}

/// Access to the single global portfolio settings record. Writes are
/// restricted to administrators here, at the storage boundary.
#[async_trait]
pub trait PortfolioSettingsRepository: Send + Sync {
    /// Defaults (no token, nothing hidden) when the record does not exist yet.
    async fn get(&self) -> Result<PortfolioSettings>;
    async fn save(&self, actor: &User, settings: &PortfolioSettings) -> Result<()>;
}
