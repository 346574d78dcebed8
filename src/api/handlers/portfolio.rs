use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    api::state::AppState,
    error::Result,
    service::portfolio_service::PublicPortfolio,
};

#[derive(Debug, Deserialize)]
pub struct PortfolioParams {
    #[serde(default)]
    pub show_all: bool,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PortfolioParams>,
) -> Result<Json<PublicPortfolio>> {
    let portfolio = state.service_context.portfolio_service
        .public_listing(params.show_all)
        .await?;
    Ok(Json(portfolio))
}
