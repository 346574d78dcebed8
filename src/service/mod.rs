pub mod identity_service;
pub mod portfolio_service;
pub mod project_service;

use std::sync::Arc;
use sqlx::SqlitePool;
use crate::repository::*;
use crate::config::Settings;
use crate::error::Result;
use crate::integrations::{BudgetEstimator, Mailer, SiteHost};
use crate::auth::{ActionCodeStore, AuthService, CsrfService, SecretBox};
use identity_service::IdentityService;
use portfolio_service::PortfolioService;
use project_service::ProjectService;

/// External collaborators. Production wires the real clients; tests swap in
/// local fakes.
pub struct Integrations {
    pub estimator: Arc<dyn BudgetEstimator>,
    pub site_host: Arc<dyn SiteHost>,
    pub mailer: Arc<dyn Mailer>,
}

pub struct ServiceContext {
    pub project_repo: Arc<dyn ProjectRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub portfolio_repo: Arc<dyn PortfolioSettingsRepository>,
    pub auth_service: Arc<AuthService>,
    pub csrf_service: Arc<CsrfService>,
    pub action_codes: Arc<ActionCodeStore>,
    pub project_service: Arc<ProjectService>,
    pub portfolio_service: Arc<PortfolioService>,
    pub identity_service: Arc<IdentityService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(db_pool: SqlitePool, settings: &Settings, integrations: Integrations) -> Result<Self> {
        let secret = &settings.auth.session_secret;

        let project_repo: Arc<dyn ProjectRepository> =
            Arc::new(SqliteProjectRepository::new(db_pool.clone()));
        let user_repo: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(db_pool.clone()));
        let portfolio_repo: Arc<dyn PortfolioSettingsRepository> = Arc::new(
            SqlitePortfolioSettingsRepository::new(db_pool.clone(), SecretBox::from_secret(secret)),
        );

        let auth_service = Arc::new(AuthService::new(
            db_pool.clone(),
            settings.auth.session_duration_hours,
            settings.auth.admin_email_domain.clone(),
        ));
        let csrf_service = Arc::new(CsrfService::new(secret)?);
        let action_codes = Arc::new(ActionCodeStore::new(
            db_pool.clone(),
            settings.auth.action_code_ttl_minutes,
        ));

        let project_service = Arc::new(ProjectService::new(
            project_repo.clone(),
            integrations.estimator,
        ));
        let portfolio_service = Arc::new(PortfolioService::new(
            portfolio_repo.clone(),
            integrations.site_host,
        ));
        let identity_service = Arc::new(IdentityService::new(
            user_repo.clone(),
            auth_service.clone(),
            action_codes.clone(),
            integrations.mailer,
            settings.server.base_url.clone(),
        ));

        Ok(Self {
            project_repo,
            user_repo,
            portfolio_repo,
            auth_service,
            csrf_service,
            action_codes,
            project_service,
            portfolio_service,
            identity_service,
            db_pool,
        })
    }
}
