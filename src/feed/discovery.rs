/// Feed URL discovery from the HTML index page
use std::collections::HashSet;

use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::error::{FxError, Result};

/// Which links on the index page count as rate feeds
#[derive(Debug, Clone)]
pub struct FeedFilter {
    pub path_fragment: String,
    pub excluded_marker: String,
}

impl FeedFilter {
    pub fn new(path_fragment: impl Into<String>, excluded_marker: impl Into<String>) -> Self {
        FeedFilter {
            path_fragment: path_fragment.into(),
            excluded_marker: excluded_marker.into(),
        }
    }

    pub fn matches(&self, href: &str) -> bool {
        href.contains(&self.path_fragment)
            && (self.excluded_marker.is_empty() || !href.contains(&self.excluded_marker))
    }
}

/// Collect absolute feed URLs from `html`, in page order, without repeats
pub fn discover_feed_urls(html: &str, base_url: &str, filter: &FeedFilter) -> Result<Vec<String>> {
    let base = Url::parse(base_url)
        .map_err(|e| FxError::Discovery(format!("invalid base url '{}': {}", base_url, e)))?;
    let selector = Selector::parse("a[href]")
        .map_err(|e| FxError::Discovery(format!("bad link selector: {}", e)))?;

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for link in document.select(&selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !filter.matches(href) {
            continue;
        }

        match base.join(href.trim()) {
            Ok(url) => {
                let url = url.to_string();
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
            Err(e) => warn!("Ignoring unresolvable feed link '{}': {}", href, e),
        }
    }

    debug!("Discovered {} feed urls", urls.len());
    Ok(urls)
}
