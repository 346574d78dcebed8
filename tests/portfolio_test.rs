mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use devflow::{
    auth::SecretBox,
    domain::{PortfolioSettings, Role, User},
    error::AppError,
    integrations::{NetlifyClient, NetlifyError, SiteHost},
    repository::SqlitePortfolioSettingsRepository,
    service::portfolio_service::PortfolioService,
};

const GOOD_TOKEN: &str = "nfp_good";

fn admin() -> User {
    User {
        id: Uuid::new_v4(),
        email: "ops@devflow.io".to_string(),
        name: "ops".to_string(),
        avatar: None,
        role: Role::Admin,
        email_verified: true,
    }
}

fn client() -> User {
    User {
        role: Role::Client,
        email: "client@example.com".to_string(),
        ..admin()
    }
}

/// Fake Netlify: the good token lists five sites, "nfp_forbidden" gets a 403
/// with a provider message, "nfp_broken" gets a bare 500, anything else 401.
async fn fake_sites(State(hits): State<Arc<AtomicUsize>>, headers: HeaderMap) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match auth {
        "Bearer nfp_good" => {
            let sites: Vec<_> = (1..=5)
                .map(|i| {
                    json!({
                        "id": format!("site-{}", i),
                        "name": format!("client-{}", i),
                        "url": format!("http://client-{}.netlify.app", i),
                        "ssl_url": format!("https://client-{}.netlify.app", i),
                        "screenshot_url": null,
                        "updated_at": "2025-03-01T10:00:00.000Z",
                        "published_deploy": { "screenshot_url": format!("https://cdn/{}.png", i) }
                    })
                })
                .collect();
            (StatusCode::OK, Json(json!(sites))).into_response()
        }
        "Bearer nfp_forbidden" => (
            StatusCode::FORBIDDEN,
            Json(json!({ "code": 403, "message": "Account suspended" })),
        )
            .into_response(),
        "Bearer nfp_broken" => (StatusCode::INTERNAL_SERVER_ERROR, "oops").into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "code": 401, "message": "Access Denied" })))
            .into_response(),
    }
}

async fn fake_netlify() -> (NetlifyClient, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route("/api/v1/sites", get(fake_sites))
        .with_state(hits.clone());
    let base_url = common::spawn_server(router).await;
    (NetlifyClient::with_client(reqwest::Client::new(), base_url), hits)
}

#[tokio::test]
async fn test_netlify_client_error_mapping() {
    let (netlify, hits) = fake_netlify().await;

    let sites = netlify.list_sites(GOOD_TOKEN).await.unwrap();
    assert_eq!(sites.len(), 5);
    assert_eq!(sites[0].preview_image(), Some("https://cdn/1.png"));
    assert_eq!(sites[0].public_url(), "https://client-1.netlify.app");

    let err = netlify.list_sites("nfp_wrong").await.unwrap_err();
    assert!(matches!(err, NetlifyError::InvalidToken));
    assert_eq!(err.to_string(), "Unauthorized: Invalid Netlify Access Token.");

    let err = netlify.list_sites("nfp_forbidden").await.unwrap_err();
    assert_eq!(err.to_string(), "Account suspended");

    let err = netlify.list_sites("nfp_broken").await.unwrap_err();
    assert_eq!(err.to_string(), "Netlify API error: 500 Internal Server Error");

    // No token, no request
    let before = hits.load(Ordering::SeqCst);
    assert!(netlify.list_sites("").await.unwrap().is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), before);
}

#[tokio::test]
async fn test_public_listing_filters_and_slices() -> anyhow::Result<()> {
    let (netlify, _) = fake_netlify().await;
    let test = common::context_with(Arc::new(common::FixedEstimator(None)), Arc::new(netlify)).await;
    let service = &test.ctx.portfolio_service;

    // Nothing configured yet
    let empty = service.public_listing(true).await?;
    assert!(empty.sites.is_empty());
    assert!(empty.error.is_none());

    service.save_token(&admin(), GOOD_TOKEN).await?;
    assert!(service.toggle_site(&admin(), "site-2").await?);

    let preview = service.public_listing(false).await?;
    let ids: Vec<&str> = preview.sites.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["site-1", "site-3", "site-4"]);
    assert_eq!(preview.total, 4);

    let all = service.public_listing(true).await?;
    assert_eq!(all.sites.len(), 4);

    // Toggling again makes the site visible
    assert!(!service.toggle_site(&admin(), "site-2").await?);
    assert_eq!(service.public_listing(true).await?.sites.len(), 5);

    Ok(())
}

#[tokio::test]
async fn test_hosting_errors_do_not_fail_the_page() -> anyhow::Result<()> {
    let (netlify, _) = fake_netlify().await;
    let test = common::context_with(Arc::new(common::FixedEstimator(None)), Arc::new(netlify)).await;
    let service = &test.ctx.portfolio_service;

    service.save_token(&admin(), "nfp_revoked").await?;

    let listing = service.public_listing(false).await?;
    assert!(listing.sites.is_empty());
    assert_eq!(
        listing.error.as_deref(),
        Some("Unauthorized: Invalid Netlify Access Token.")
    );

    // The admin sync surfaces the failure instead
    let sync = service.sync(&admin()).await;
    assert!(matches!(sync, Err(AppError::External(_))));

    Ok(())
}

#[tokio::test]
async fn test_admin_sync_flags_hidden_sites() -> anyhow::Result<()> {
    let (netlify, _) = fake_netlify().await;
    let test = common::context_with(Arc::new(common::FixedEstimator(None)), Arc::new(netlify)).await;
    let service = &test.ctx.portfolio_service;

    service.save_token(&admin(), GOOD_TOKEN).await?;
    service.toggle_site(&admin(), "site-5").await?;

    let sites = service.sync(&admin()).await?;
    assert_eq!(sites.len(), 5);
    let hidden: Vec<&str> = sites
        .iter()
        .filter(|s| s.hidden)
        .map(|s| s.site.id.as_str())
        .collect();
    assert_eq!(hidden, vec!["site-5"]);

    let overview = service.overview(&admin()).await?;
    assert!(overview.has_token);
    assert_eq!(overview.hidden_site_ids, vec!["site-5".to_string()]);

    // Clearing the token empties the public listing
    service.save_token(&admin(), "").await?;
    assert!(service.public_listing(true).await?.sites.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_settings_writes_are_admin_only() -> anyhow::Result<()> {
    let test = common::context().await;
    let repo = &test.ctx.portfolio_repo;

    let settings = PortfolioSettings {
        netlify_token: "nfp_secret".to_string(),
        ..Default::default()
    };
    let refused = repo.save(&client(), &settings).await;
    assert!(matches!(refused, Err(AppError::Permission(_))));
    assert_eq!(repo.get().await?, PortfolioSettings::default());

    assert!(matches!(
        test.ctx.portfolio_service.toggle_site(&client(), "site-1").await,
        Err(AppError::Permission(_))
    ));

    repo.save(&admin(), &settings).await?;
    assert_eq!(repo.get().await?.netlify_token, "nfp_secret");

    // The stored column never holds the plain token
    let stored: String = sqlx::query_scalar("SELECT netlify_token FROM portfolio_settings")
        .fetch_one(&test.pool)
        .await?;
    assert!(stored.starts_with("enc:v1:"));
    assert!(!stored.contains("nfp_secret"));

    Ok(())
}

#[tokio::test]
async fn test_unreadable_settings_do_not_fail_the_page() -> anyhow::Result<()> {
    let test = common::context().await;
    test.ctx.portfolio_service.save_token(&admin(), "nfp_secret").await?;

    // Same rows, but the server secret has since changed
    let rotated = SqlitePortfolioSettingsRepository::new(test.pool.clone(), SecretBox::from_secret("rotated"));
    let service = PortfolioService::new(
        Arc::new(rotated),
        Arc::new(common::StaticSites(vec![common::site("a")])),
    );

    let listing = service.public_listing(true).await?;
    assert!(listing.sites.is_empty());
    assert_eq!(listing.total, 0);
    assert!(listing.error.is_some());

    Ok(())
}
