//! Client for the Netlify site listing API.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::NetlifyConfig;
use crate::domain::Site;
use crate::integrations::SiteHost;

/// Message shown when Netlify rejects the configured token.
pub const INVALID_TOKEN_MESSAGE: &str = "Unauthorized: Invalid Netlify Access Token.";

#[derive(Debug, thiserror::Error)]
pub enum NetlifyError {
    #[error("{}", INVALID_TOKEN_MESSAGE)]
    InvalidToken,

    /// Netlify returned a non-2xx status other than 401.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Netlify request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct NetlifyClient {
    client: reqwest::Client,
    base_url: String,
}

impl NetlifyClient {
    pub fn new(config: &NetlifyConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config.base_url.clone())
    }

    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Map a non-2xx response to the error the admin sees. The provider's
    /// `message` wins when the body carries one.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, NetlifyError> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(NetlifyError::InvalidToken);
        }
        if !status.is_success() {
            let provider_message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .filter(|m| !m.is_empty());
            let message = provider_message.unwrap_or_else(|| {
                format!(
                    "Netlify API error: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("")
                )
                .trim_end()
                .to_string()
            });
            return Err(NetlifyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl SiteHost for NetlifyClient {
    async fn list_sites(&self, token: &str) -> Result<Vec<Site>, NetlifyError> {
        if token.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(format!("{}/api/v1/sites", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let sites = response.json::<Vec<Site>>().await?;
        tracing::debug!(count = sites.len(), "Fetched Netlify sites");
        Ok(sites)
    }
}
