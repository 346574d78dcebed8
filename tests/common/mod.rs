#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tower::ServiceExt;

use devflow::{
    config::Settings,
    integrations::{
        BudgetEstimator, EstimatorError, MailError, Mailer, NetlifyError, OutgoingEmail,
        RawEstimate, SiteHost,
    },
    domain::Site,
    service::{Integrations, ServiceContext},
};

/// Fresh in-memory database with migrations applied. A single connection
/// keeps every query on the same in-memory database.
pub async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.auth.session_secret = "test-secret".to_string();
    settings.server.base_url = "http://devflow.test".to_string();
    settings
}

/// Keeps every email so tests can follow the links.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    /// When set, every send fails as if the SMTP relay were down.
    pub failing: AtomicBool,
}

impl RecordingMailer {
    pub fn last_code(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let body = &sent.last()?.body;
        let start = body.find("oobCode=")? + "oobCode=".len();
        let code: String = body[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        Some(code)
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Build("relay unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Estimator that always answers with the same budget.
pub struct FixedEstimator(pub Option<f64>);

#[async_trait]
impl BudgetEstimator for FixedEstimator {
    async fn estimate(&self, _description: &str) -> Result<RawEstimate, EstimatorError> {
        Ok(RawEstimate {
            suggested_budget: self.0,
            reasoning: Some("Fixed answer".to_string()),
        })
    }
}

/// Hosting provider with a canned site list.
pub struct StaticSites(pub Vec<Site>);

#[async_trait]
impl SiteHost for StaticSites {
    async fn list_sites(&self, token: &str) -> Result<Vec<Site>, NetlifyError> {
        if token.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.0.clone())
    }
}

pub fn site(id: &str) -> Site {
    Site {
        id: id.to_string(),
        name: format!("{}-site", id),
        url: format!("http://{}.netlify.app", id),
        ssl_url: Some(format!("https://{}.netlify.app", id)),
        screenshot_url: None,
        updated_at: Some("2025-01-01T00:00:00Z".to_string()),
        published_deploy: None,
    }
}

pub struct TestContext {
    pub pool: SqlitePool,
    pub ctx: Arc<ServiceContext>,
    pub mailer: Arc<RecordingMailer>,
    pub settings: Settings,
}

pub async fn context_with(estimator: Arc<dyn BudgetEstimator>, site_host: Arc<dyn SiteHost>) -> TestContext {
    let pool = setup_pool().await;
    let settings = test_settings();
    let mailer = Arc::new(RecordingMailer::default());

    let ctx = ServiceContext::new(
        pool.clone(),
        &settings,
        Integrations {
            estimator,
            site_host,
            mailer: mailer.clone(),
        },
    )
    .unwrap();

    TestContext {
        pool,
        ctx: Arc::new(ctx),
        mailer,
        settings,
    }
}

pub async fn context() -> TestContext {
    context_with(
        Arc::new(FixedEstimator(Some(40.0))),
        Arc::new(StaticSites(vec![site("a"), site("b")])),
    )
    .await
}

pub fn app(test: &TestContext) -> Router {
    devflow::api::create_app(test.ctx.clone(), Arc::new(test.settings.clone()))
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

// ---- request helpers ----

/// Cookie and CSRF token of a signed-in client.
#[derive(Clone)]
pub struct Session {
    pub cookie: String,
    pub csrf: String,
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}

pub fn request(
    method: Method,
    uri: &str,
    session: Option<&Session>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(session) = session {
        builder = builder
            .header(header::COOKIE, session.cookie.clone())
            .header("X-CSRF-Token", session.csrf.clone());
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Pull `session=<token>` out of a `Set-Cookie` header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn sign_up(app: Router, email: &str) -> Session {
    let response = send(
        app,
        request(
            Method::POST,
            "/auth/signup",
            None,
            Some(serde_json::json!({ "email": email, "password": "password123" })),
        ),
    )
    .await;
    assert_eq!(response.status(), 201, "signup for {} failed", email);

    let cookie = session_cookie(&response).expect("session cookie");
    let json = body_json(response).await;
    Session {
        cookie,
        csrf: json["csrfToken"].as_str().unwrap().to_string(),
    }
}
