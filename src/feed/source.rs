/// Where index pages and feed documents come from
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, info};

use crate::error::{FxError, Result};
use crate::types::SourceConfig;
use crate::utils::RateLimiter;

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Base URL that relative feed links resolve against
    fn base_url(&self) -> &str;

    async fn index_page(&self) -> Result<String>;

    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Live source over HTTP
pub struct HttpFeedSource {
    client: Client,
    base_url: String,
    index_url: String,
    limiter: RateLimiter,
}

impl HttpFeedSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .user_agent(concat!("fxref/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let index_url = Url::parse(&config.base_url)
            .and_then(|base| base.join(&config.index_path))
            .map_err(|e| {
                FxError::Discovery(format!(
                    "cannot build index url from '{}' + '{}': {}",
                    config.base_url, config.index_path, e
                ))
            })?;

        Ok(HttpFeedSource {
            client,
            base_url: config.base_url.clone(),
            index_url: index_url.to_string(),
            limiter: RateLimiter::per_second(config.requests_per_second),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        self.limiter.acquire().await;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FxError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn index_page(&self) -> Result<String> {
        self.get_text(&self.index_url).await
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        self.get_text(url).await
    }
}

/// Offline source reading `index.html` and `<feed name>.xml` from a directory
pub struct FixtureFeedSource {
    dir: PathBuf,
    base_url: String,
}

impl FixtureFeedSource {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        FixtureFeedSource {
            dir: dir.into(),
            base_url: base_url.into(),
        }
    }

    /// `https://host/rss/fxref-usd.html` -> `<dir>/fxref-usd.xml`
    pub fn path_for(&self, url: &str) -> Result<PathBuf> {
        let last = url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let stem = last.split('.').next().unwrap_or_default();
        if stem.is_empty() {
            return Err(FxError::Discovery(format!("no feed name in url '{}'", url)));
        }
        Ok(self.dir.join(format!("{}.xml", stem)))
    }

    async fn read(&self, path: PathBuf) -> Result<String> {
        debug!("Reading fixture {}", path.display());
        Ok(tokio::fs::read_to_string(&path).await?)
    }
}

#[async_trait]
impl FeedSource for FixtureFeedSource {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn index_page(&self) -> Result<String> {
        self.read(self.dir.join("index.html")).await
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let path = self.path_for(url)?;
        self.read(path).await
    }
}

/// Pick fixtures when configured, the network otherwise
pub fn source_from_config(config: &SourceConfig) -> Result<Arc<dyn FeedSource>> {
    match &config.fixtures_dir {
        Some(dir) => {
            info!("Reading feeds from fixtures in {}", dir);
            Ok(Arc::new(FixtureFeedSource::new(dir.clone(), config.base_url.clone())))
        }
        None => Ok(Arc::new(HttpFeedSource::new(config)?)),
    }
}
