use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{PaymentEvidence, Project, SubmitProjectRequest, User},
    error::Result,
    integrations::BudgetSuggestion,
    service::project_service::Eligibility,
};

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub user: User,
    pub eligibility: Eligibility,
    pub projects: Vec<Project>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<DashboardResponse>> {
    let service = &state.service_context.project_service;
    let projects = service.list_own(&current.user).await?;
    let eligibility = service.eligibility(&current.user).await?;

    Ok(Json(DashboardResponse {
        user: current.user,
        eligibility,
        projects,
    }))
}

pub async fn eligibility(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Eligibility>> {
    let eligibility = state.service_context.project_service
        .eligibility(&current.user)
        .await?;
    Ok(Json(eligibility))
}

pub async fn estimate(
    State(state): State<AppState>,
    Json(req): Json<EstimateRequest>,
) -> Result<Json<BudgetSuggestion>> {
    let suggestion = state.service_context.project_service
        .estimate_budget(&req.description)
        .await?;
    Ok(Json(suggestion))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<SubmitProjectRequest>,
) -> Result<(StatusCode, Json<Project>)> {
    let project = state.service_context.project_service
        .submit(&current.user, req)
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>> {
    let project = state.service_context.project_service
        .get_for(&current.user, id)
        .await?;
    Ok(Json(project))
}

pub async fn submit_payment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(evidence): Json<PaymentEvidence>,
) -> Result<Json<Project>> {
    let project = state.service_context.project_service
        .submit_payment(&current.user, id, evidence)
        .await?;
    Ok(Json(project))
}
