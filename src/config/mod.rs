use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub netlify: NetlifyConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public origin used to build links in outgoing emails.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Key material for CSRF tokens and for encrypting stored secrets.
    pub session_secret: String,
    pub session_duration_hours: i64,
    /// Accounts on this email domain resolve to the admin role unless
    /// `user_roles` says otherwise.
    pub admin_email_domain: String,
    pub action_code_ttl_minutes: i64,
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EstimatorConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_estimator_base_url")]
    pub base_url: String,
    #[serde(default = "default_estimator_model")]
    pub model: String,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_estimator_base_url(),
            model: default_estimator_model(),
        }
    }
}

fn default_estimator_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_estimator_model() -> String {
    "gemini-3-flash-preview".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetlifyConfig {
    #[serde(default = "default_netlify_base_url")]
    pub base_url: String,
}

impl Default for NetlifyConfig {
    fn default() -> Self {
        Self { base_url: default_netlify_base_url() }
    }
}

fn default_netlify_base_url() -> String {
    "https://api.netlify.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp: None,
            from_address: default_from_address(),
        }
    }
}

fn default_from_address() -> String {
    "DevFlow <no-reply@devflow.io>".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("database.url", "sqlite://devflow.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.session_duration_hours", 24)?
            .set_default("auth.admin_email_domain", "devflow.io")?
            .set_default("auth.action_code_ttl_minutes", 60)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with DEVFLOW__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("DEVFLOW").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://devflow.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                session_secret: "change-me-in-production".to_string(),
                session_duration_hours: 24,
                admin_email_domain: "devflow.io".to_string(),
                action_code_ttl_minutes: 60,
                secure_cookies: false,
            },
            estimator: EstimatorConfig::default(),
            netlify: NetlifyConfig::default(),
            email: EmailConfig::default(),
        }
    }
}
