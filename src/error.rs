use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Remediation shown alongside permission failures. Storage access rules are
/// configured independently of request handling, so the fix is usually a role
/// assignment rather than a code change.
const PERMISSION_REMEDIATION: &str =
    "Ask an administrator to grant your account the admin role (user_roles table) and retry.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Missing or insufficient permissions: {0}")]
    Permission(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("External service error: {0}")]
    External(String),
}

impl AppError {
    /// Coarse error category reported to clients so they can pick the right
    /// recovery path (fix the form, ask for access, retry later, go back).
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => "validation",
            AppError::Permission(_) | AppError::Forbidden => "permissions",
            AppError::Unauthorized => "unauthenticated",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::External(_) => "external",
            AppError::Database(_) | AppError::Internal(_) => "internal",
        }
    }

    /// Hint attached to errors the caller can resolve by getting the admin role.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            AppError::Permission(_) => Some(PERMISSION_REMEDIATION),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let category = self.category();
        let remediation = self.remediation();
        let (status, error_message) = match self {
            AppError::Database(ref msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            AppError::Permission(ref msg) => {
                tracing::warn!("Permission denied: {}", msg);
                (StatusCode::FORBIDDEN, msg.as_str())
            }
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, msg.as_str()),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Validation(ref msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.as_str()),
            AppError::External(ref msg) => {
                tracing::error!("External service error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.as_str())
            }
        };

        let body = if let Some(remediation) = remediation {
            json!({
                "error": error_message,
                "category": category,
                "remediation": remediation,
            })
        } else {
            json!({
                "error": error_message,
                "category": category,
            })
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Surface the first field message; forms only ever show one inline error.
        let message = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
            })
            .next()
            .unwrap_or_else(|| "Invalid input".to_string());
        AppError::Validation(message)
    }
}
