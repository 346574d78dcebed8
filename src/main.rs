use std::sync::Arc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use devflow::{
    api,
    config::Settings,
    integrations::{mailer, GeminiEstimator, NetlifyClient},
    service::{Integrations, ServiceContext},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devflow=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    if settings.auth.session_secret.is_empty() {
        anyhow::bail!("auth.session_secret must be set (DEVFLOW__AUTH__SESSION_SECRET)");
    }
    if settings.auth.session_secret == Settings::default().auth.session_secret {
        tracing::warn!("Using the built-in session secret; set DEVFLOW__AUTH__SESSION_SECRET in production");
    }

    tracing::info!("Starting DevFlow server on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    if settings.estimator.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        tracing::warn!("No estimator API key configured; budget suggestions will use the fallback");
    }

    let integrations = Integrations {
        estimator: Arc::new(GeminiEstimator::new(&settings.estimator)),
        site_host: Arc::new(NetlifyClient::new(&settings.netlify)),
        mailer: mailer::from_config(&settings.email)?,
    };

    let service_context = Arc::new(ServiceContext::new(db_pool.clone(), &settings, integrations)?);

    // Opportunistic cleanup of stale sessions and used codes
    match service_context.auth_service.cleanup_expired_sessions().await {
        Ok(n) if n > 0 => tracing::info!("Removed {} expired sessions", n),
        Ok(_) => {}
        Err(e) => tracing::warn!("Session cleanup failed: {}", e),
    }
    if let Err(e) = service_context.action_codes.cleanup_expired().await {
        tracing::warn!("Action code cleanup failed: {}", e);
    }

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
