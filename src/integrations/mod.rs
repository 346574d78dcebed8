use async_trait::async_trait;

use crate::domain::Site;

pub mod gemini;
pub mod mailer;
pub mod netlify;

pub use gemini::{suggest_budget, BudgetSuggestion, EstimatorError, GeminiEstimator, RawEstimate};
pub use mailer::{LogMailer, MailError, OutgoingEmail, SmtpMailer};
pub use netlify::{NetlifyClient, NetlifyError};

/// Produces a raw budget figure from a free-text project description.
/// Answers are untrusted; see [`suggest_budget`].
#[async_trait]
pub trait BudgetEstimator: Send + Sync {
    async fn estimate(&self, description: &str) -> Result<RawEstimate, EstimatorError>;
}

/// Lists the deployed sites behind a hosting account token.
#[async_trait]
pub trait SiteHost: Send + Sync {
    /// An empty token yields an empty list without contacting the provider.
    async fn list_sites(&self, token: &str) -> Result<Vec<Site>, NetlifyError>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}
