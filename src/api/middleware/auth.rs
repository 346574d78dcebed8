use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    api::state::AppState,
    auth::SESSION_COOKIE,
    domain::User,
    error::{AppError, Result},
};

pub const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
}

/// The session behind the current request; CSRF tokens are bound to its id.
#[derive(Clone)]
pub struct SessionInfo {
    pub session_id: String,
}

async fn authenticate(state: &AppState, jar: &CookieJar) -> Result<Option<(User, SessionInfo)>> {
    let Some(session_cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    let ctx = &state.service_context;
    let Some(session) = ctx.auth_service.validate_session(session_cookie.value()).await? else {
        return Ok(None);
    };

    let user = ctx.identity_service.current_user(session.user_id).await?;
    Ok(user.map(|user| (user, SessionInfo { session_id: session.id })))
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let (user, session) = authenticate(&state, &jar)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(CurrentUser { user });
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let (user, session) = authenticate(&state, &jar)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !user.is_admin() {
        tracing::warn!(user = %user.email, path = %request.uri().path(), "Non-admin refused");
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(CurrentUser { user });
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Attach the user when a valid session is present; never rejects.
pub async fn optional_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, &jar).await {
        Ok(Some((user, session))) => {
            request.extensions_mut().insert(CurrentUser { user });
            request.extensions_mut().insert(session);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Session lookup failed: {}", e),
    }

    next.run(request).await
}

/// State-changing requests must echo the session's CSRF token in
/// `X-CSRF-Token`. Runs after one of the auth layers.
pub async fn require_csrf(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return Ok(next.run(request).await);
    }

    let session = request
        .extensions()
        .get::<SessionInfo>()
        .ok_or(AppError::Unauthorized)?;

    let presented = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !state.service_context.csrf_service.verify(&session.session_id, presented) {
        tracing::warn!(path = %request.uri().path(), "CSRF token missing or invalid");
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}
