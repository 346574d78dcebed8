use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{Project, ProjectStatus},
    error::Result,
    service::portfolio_service::{AdminSite, PortfolioOverview},
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectList {
    pub projects: Vec<Project>,
    pub total: usize,
}

impl From<Vec<Project>> for ProjectList {
    fn from(projects: Vec<Project>) -> Self {
        let total = projects.len();
        Self { projects, total }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ProjectStatus,
}

#[derive(Debug, Deserialize)]
pub struct VerificationDecision {
    pub approved: bool,
}

#[derive(Debug, Deserialize)]
pub struct TokenUpdate {
    #[serde(default)]
    pub token: String,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ProjectList>> {
    let projects = state.service_context.project_service
        .list_all(&current.user, params.search.as_deref())
        .await?;
    Ok(Json(projects.into()))
}

pub async fn pending_payments(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ProjectList>> {
    let projects = state.service_context.project_service
        .pending_verifications(&current.user)
        .await?;
    Ok(Json(projects.into()))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>> {
    let project = state.service_context.project_service
        .get_for(&current.user, id)
        .await?;
    Ok(Json(project))
}

pub async fn set_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Project>> {
    let project = state.service_context.project_service
        .set_status(&current.user, id, update.status)
        .await?;
    Ok(Json(project))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(decision): Json<VerificationDecision>,
) -> Result<Json<Project>> {
    let project = state.service_context.project_service
        .verify_payment(&current.user, id, decision.approved)
        .await?;
    Ok(Json(project))
}

pub async fn portfolio_overview(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<PortfolioOverview>> {
    let overview = state.service_context.portfolio_service
        .overview(&current.user)
        .await?;
    Ok(Json(overview))
}

pub async fn save_token(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(update): Json<TokenUpdate>,
) -> Result<Json<PortfolioOverview>> {
    let overview = state.service_context.portfolio_service
        .save_token(&current.user, &update.token)
        .await?;
    Ok(Json(overview))
}

pub async fn sync_sites(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<AdminSite>>> {
    let sites = state.service_context.portfolio_service
        .sync(&current.user)
        .await?;
    Ok(Json(sites))
}

pub async fn toggle_site(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(site_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let hidden = state.service_context.portfolio_service
        .toggle_site(&current.user, &site_id)
        .await?;
    Ok(Json(json!({ "siteId": site_id, "hidden": hidden })))
}
