use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// How many sites the landing page shows before "show all".
pub const PREVIEW_COUNT: usize = 3;

/// The single global portfolio configuration record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioSettings {
    pub netlify_token: String,
    pub hidden_site_ids: BTreeSet<String>,
}

impl PortfolioSettings {
    pub fn has_token(&self) -> bool {
        !self.netlify_token.is_empty()
    }

    /// Flip a site between hidden and visible. Returns `true` when the site is
    /// hidden afterwards.
    pub fn toggle_site(&mut self, site_id: &str) -> bool {
        if self.hidden_site_ids.remove(site_id) {
            false
        } else {
            self.hidden_site_ids.insert(site_id.to_string());
            true
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishedDeploy {
    #[serde(default)]
    pub screenshot_url: Option<String>,
}

/// A site as returned by the Netlify listing API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Site {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub ssl_url: Option<String>,
    #[serde(default)]
    pub screenshot_url: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub published_deploy: Option<PublishedDeploy>,
}

impl Site {
    /// Best available preview image: the site screenshot, else the latest
    /// published deploy's screenshot.
    pub fn preview_image(&self) -> Option<&str> {
        self.screenshot_url
            .as_deref()
            .or_else(|| {
                self.published_deploy
                    .as_ref()
                    .and_then(|d| d.screenshot_url.as_deref())
            })
            .filter(|url| !url.is_empty())
    }

    pub fn public_url(&self) -> &str {
        self.ssl_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(&self.url)
    }
}

/// Remove every site whose id is in `hidden`, keeping the original order.
pub fn visible_sites(sites: Vec<Site>, hidden: &BTreeSet<String>) -> Vec<Site> {
    sites
        .into_iter()
        .filter(|site| !hidden.contains(&site.id))
        .collect()
}

/// The landing page slice: the first few sites, or everything.
pub fn display_slice(sites: &[Site], show_all: bool) -> &[Site] {
    if show_all {
        sites
    } else {
        &sites[..sites.len().min(PREVIEW_COUNT)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: &str) -> Site {
        Site {
            id: id.to_string(),
            name: format!("site-{}", id),
            url: format!("http://{}.netlify.app", id),
            ssl_url: Some(format!("https://{}.netlify.app", id)),
            screenshot_url: None,
            updated_at: None,
            published_deploy: None,
        }
    }

    fn hidden(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn filter_removes_hidden_ids_and_keeps_order() {
        let sites = vec![site("a"), site("b"), site("c"), site("d")];
        let visible = visible_sites(sites, &hidden(&["b", "zzz"]));
        let ids: Vec<_> = visible.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
    }

    #[test]
    fn filter_is_idempotent() {
        let h = hidden(&["a", "c"]);
        let once = visible_sites(vec![site("a"), site("b"), site("c")], &h);
        let twice = visible_sites(once.clone(), &h);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_hidden_set_keeps_everything() {
        let visible = visible_sites(vec![site("a"), site("b")], &BTreeSet::new());
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn display_slice_shows_three_then_all() {
        let sites: Vec<_> = ["a", "b", "c", "d", "e"].iter().map(|id| site(id)).collect();
        assert_eq!(display_slice(&sites, false).len(), 3);
        assert_eq!(display_slice(&sites, true).len(), 5);
        assert_eq!(display_slice(&sites[..2], false).len(), 2);
    }

    #[test]
    fn toggle_site_flips_visibility() {
        let mut settings = PortfolioSettings::default();
        assert!(settings.toggle_site("a"));
        assert!(settings.hidden_site_ids.contains("a"));
        assert!(!settings.toggle_site("a"));
        assert!(settings.hidden_site_ids.is_empty());
    }

    #[test]
    fn preview_falls_back_to_published_deploy() {
        let mut s = site("a");
        s.published_deploy = Some(PublishedDeploy {
            screenshot_url: Some("https://shots/a.png".to_string()),
        });
        assert_eq!(s.preview_image(), Some("https://shots/a.png"));
        assert_eq!(s.public_url(), "https://a.netlify.app");
    }
}
