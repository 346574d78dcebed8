use std::sync::Arc;

use serde::Serialize;

use crate::{
    domain::{portfolio, Site, User},
    error::{AppError, Result},
    integrations::{NetlifyError, SiteHost},
    repository::PortfolioSettingsRepository,
};

/// Landing page listing. Hosting problems never fail the page; they come
/// back as `error` next to an empty list.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PublicPortfolio {
    pub sites: Vec<Site>,
    pub total: usize,
    pub error: Option<String>,
}

/// What the admin panel shows about the stored settings. The token itself
/// is never echoed back.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioOverview {
    pub has_token: bool,
    pub hidden_site_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdminSite {
    #[serde(flatten)]
    pub site: Site,
    pub hidden: bool,
}

pub struct PortfolioService {
    settings: Arc<dyn PortfolioSettingsRepository>,
    host: Arc<dyn SiteHost>,
}

impl PortfolioService {
    pub fn new(settings: Arc<dyn PortfolioSettingsRepository>, host: Arc<dyn SiteHost>) -> Self {
        Self { settings, host }
    }

    pub async fn public_listing(&self, show_all: bool) -> Result<PublicPortfolio> {
        let settings = match self.settings.get().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("Portfolio settings unreadable: {}", e);
                return Ok(PublicPortfolio {
                    sites: Vec::new(),
                    total: 0,
                    error: Some("Portfolio is temporarily unavailable".to_string()),
                });
            }
        };
        if !settings.has_token() {
            return Ok(PublicPortfolio { sites: Vec::new(), total: 0, error: None });
        }

        match self.host.list_sites(&settings.netlify_token).await {
            Ok(sites) => {
                let visible = portfolio::visible_sites(sites, &settings.hidden_site_ids);
                let total = visible.len();
                Ok(PublicPortfolio {
                    sites: portfolio::display_slice(&visible, show_all).to_vec(),
                    total,
                    error: None,
                })
            }
            Err(e) => {
                tracing::error!("Portfolio fetch failed: {}", e);
                Ok(PublicPortfolio {
                    sites: Vec::new(),
                    total: 0,
                    error: Some(e.to_string()),
                })
            }
        }
    }

    pub async fn overview(&self, admin: &User) -> Result<PortfolioOverview> {
        if !admin.is_admin() {
            return Err(AppError::Forbidden);
        }
        let settings = self.settings.get().await?;
        Ok(PortfolioOverview {
            has_token: settings.has_token(),
            hidden_site_ids: settings.hidden_site_ids.into_iter().collect(),
        })
    }

    /// Store a new token. An empty token clears the listing.
    pub async fn save_token(&self, admin: &User, token: &str) -> Result<PortfolioOverview> {
        let mut settings = self.settings.get().await?;
        settings.netlify_token = token.trim().to_string();
        self.settings.save(admin, &settings).await?;

        Ok(PortfolioOverview {
            has_token: settings.has_token(),
            hidden_site_ids: settings.hidden_site_ids.into_iter().collect(),
        })
    }

    /// Flip one site's visibility. Returns whether it is hidden afterwards.
    pub async fn toggle_site(&self, admin: &User, site_id: &str) -> Result<bool> {
        let mut settings = self.settings.get().await?;
        let hidden = settings.toggle_site(site_id);
        self.settings.save(admin, &settings).await?;

        tracing::info!(site_id, hidden, "Portfolio site visibility toggled");
        Ok(hidden)
    }

    /// Full site list for the admin panel; hidden sites are flagged, not removed.
    pub async fn sync(&self, admin: &User) -> Result<Vec<AdminSite>> {
        if !admin.is_admin() {
            return Err(AppError::Forbidden);
        }
        let settings = self.settings.get().await?;

        let sites = self
            .host
            .list_sites(&settings.netlify_token)
            .await
            .map_err(hosting_error)?;

        Ok(sites
            .into_iter()
            .map(|site| {
                let hidden = settings.hidden_site_ids.contains(&site.id);
                AdminSite { site, hidden }
            })
            .collect())
    }
}

fn hosting_error(err: NetlifyError) -> AppError {
    AppError::External(format!("Netlify API Error: {}", err))
}
