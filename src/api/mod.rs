pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Public landing page data
        .route("/api/portfolio", get(handlers::portfolio::list))

        .nest("/auth", auth_routes())
        .route("/reset-password", get(handlers::auth::legacy_action_redirect))
        .route("/verify-email", get(handlers::auth::legacy_action_redirect))

        .route("/api/me", get(handlers::auth::me).route_layer(
            axum::middleware::from_fn_with_state(app_state.clone(), middleware::auth::optional_auth),
        ))
        .nest("/api", client_routes(app_state.clone()))
        .nest("/admin", admin_routes(app_state.clone()))

        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handlers::auth::signup))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/password-reset", post(handlers::auth::request_password_reset))
        .route(
            "/action",
            get(handlers::auth::action).post(handlers::auth::confirm_password_reset),
        )
}

fn client_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me/verification", post(handlers::auth::send_verification))
        .route("/dashboard", get(handlers::projects::dashboard))
        .route("/projects", post(handlers::projects::create))
        .route("/projects/eligibility", get(handlers::projects::eligibility))
        .route("/projects/estimate", post(handlers::projects::estimate))
        .route("/projects/:id", get(handlers::projects::get))
        .route("/projects/:id/payment", post(handlers::projects::submit_payment))
        // CSRF check for state-changing requests (runs after auth)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_csrf,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/projects", get(handlers::admin::list_projects))
        .route("/projects/pending-payments", get(handlers::admin::pending_payments))
        .route("/projects/:id", get(handlers::admin::get_project))
        .route("/projects/:id/status", put(handlers::admin::set_status))
        .route("/projects/:id/payment-verification", post(handlers::admin::verify_payment))
        .route("/portfolio", get(handlers::admin::portfolio_overview))
        .route("/portfolio/token", put(handlers::admin::save_token))
        .route("/portfolio/sites", get(handlers::admin::sync_sites))
        .route("/portfolio/sites/:site_id/toggle", post(handlers::admin::toggle_site))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_csrf,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_admin,
        ))
}
