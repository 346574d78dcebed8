use axum::{http::StatusCode, Json, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "DevFlow API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Project requests, manual payment tracking and portfolio for the DevFlow agency",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "portfolio": "/api/portfolio",
            "auth": "/auth/login",
            "projects": "/api/projects",
            "admin": "/admin/projects"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
