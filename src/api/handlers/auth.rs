use axum::{
    extract::{Query, RawQuery, State},
    http::StatusCode,
    response::Redirect,
    Extension, Json,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    api::{
        middleware::auth::{CurrentUser, SessionInfo},
        state::AppState,
    },
    auth::{AuthService, SESSION_COOKIE},
    domain::{ConfirmResetRequest, LoginRequest, PasswordResetRequest, SignupRequest, User},
    error::Result,
    service::identity_service::{ActionOutcome, SignedIn},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: User,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ActionParams {
    pub mode: Option<String>,
    #[serde(rename = "oobCode")]
    pub oob_code: Option<String>,
}

fn sign_in(state: &AppState, jar: CookieJar, signed_in: SignedIn) -> (CookieJar, Json<SessionResponse>) {
    let ctx = &state.service_context;
    let cookie = ctx
        .auth_service
        .create_session_cookie(&signed_in.token, state.settings.auth.secure_cookies);
    let csrf_token = ctx.csrf_service.token_for(&signed_in.session.id);

    (
        jar.add(cookie),
        Json(SessionResponse {
            user: signed_in.user,
            csrf_token,
        }),
    )
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>)> {
    let signed_in = state.service_context.identity_service.signup(req).await?;
    let (jar, body) = sign_in(&state, jar, signed_in);
    Ok((StatusCode::CREATED, jar, body))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let signed_in = state.service_context.identity_service.login(req).await?;
    Ok(sign_in(&state, jar, signed_in))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        if let Err(e) = state.service_context.identity_service
            .logout(session_cookie.value())
            .await
        {
            tracing::warn!("Failed to invalidate session on logout: {}", e);
        }
    }

    let jar = jar.add(AuthService::create_logout_cookie());

    Ok((jar, StatusCode::NO_CONTENT))
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<Json<serde_json::Value>> {
    state.service_context.identity_service
        .request_password_reset(req)
        .await?;

    Ok(Json(json!({
        "message": "If an account exists for that address, a reset link is on its way."
    })))
}

/// Landing point for emailed links.
pub async fn action(
    State(state): State<AppState>,
    Query(params): Query<ActionParams>,
) -> Result<Json<ActionOutcome>> {
    let outcome = state.service_context.identity_service
        .check_action(params.mode.as_deref(), params.oob_code.as_deref())
        .await?;

    Ok(Json(outcome))
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(req): Json<ConfirmResetRequest>,
) -> Result<Json<serde_json::Value>> {
    state.service_context.identity_service
        .confirm_password_reset(req)
        .await?;

    Ok(Json(json!({
        "message": "Password updated. Please sign in with your new password."
    })))
}

/// Links from older emails pointed at these paths.
pub async fn legacy_action_redirect(RawQuery(query): RawQuery) -> Redirect {
    match query {
        Some(q) if !q.is_empty() => Redirect::permanent(&format!("/auth/action?{}", q)),
        _ => Redirect::permanent("/auth/action"),
    }
}

/// Session observation: who is signed in, if anyone.
pub async fn me(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
    session: Option<Extension<SessionInfo>>,
) -> Json<serde_json::Value> {
    match (current_user, session) {
        (Some(Extension(current)), Some(Extension(session))) => Json(json!({
            "authenticated": true,
            "user": current.user,
            "csrfToken": state.service_context.csrf_service.token_for(&session.session_id),
        })),
        _ => Json(json!({
            "authenticated": false,
            "user": null,
        })),
    }
}

pub async fn send_verification(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<serde_json::Value>> {
    state.service_context.identity_service
        .send_verification(&current.user)
        .await?;

    Ok(Json(json!({
        "message": format!("Verification email sent to {}", current.user.email)
    })))
}
