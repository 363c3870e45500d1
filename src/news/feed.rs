use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::Market;
use crate::config::NewsConfig;
use crate::error::PlaygroundError;

/// Raw page of articles as returned by either news endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedPage {
    #[serde(default)]
    pub value: Vec<FeedArticle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedArticle {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub provider: Vec<FeedProvider>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedProvider {
    pub name: String,
}

/// The two news endpoints the playground reads from.
#[async_trait]
pub trait NewsFeed: Send + Sync {
    /// Articles of one category feed.
    async fn category(&self, market: Market, category: &str) -> Result<FeedPage>;

    /// Free-text news search.
    async fn search(&self, market: Market, query: &str, count: usize) -> Result<FeedPage>;
}

/// Bing News v7 client.
#[derive(Clone)]
pub struct BingNewsClient {
    client: reqwest::Client,
    config: NewsConfig,
}

impl BingNewsClient {
    pub fn new(client: reqwest::Client, config: NewsConfig) -> Self {
        Self { client, config }
    }

    fn base_params(market: Market) -> Vec<(&'static str, String)> {
        vec![
            ("textDecorations", "true".to_string()),
            ("textFormat", "HTML".to_string()),
            ("sortBy", "Relevance".to_string()),
            ("freshness", "day".to_string()),
            ("mkt", market.language_tag().to_string()),
        ]
    }

    async fn get(&self, path: &str, params: &[(&'static str, String)]) -> Result<FeedPage> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        let resp = self
            .client
            .get(&url)
            .timeout(self.config.timeout())
            .header("Ocp-Apim-Subscription-Key", api_key)
            .query(params)
            .send()
            .await
            .with_context(|| format!("Failed to call news API at {path}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), body).into());
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse news API response from {path}"))
    }
}

/// Classify a non-success response so the retry policy can tell transient
/// failures apart.
pub fn status_error(status: u16, message: String) -> PlaygroundError {
    match status {
        429 => PlaygroundError::RateLimited,
        s if s >= 500 => PlaygroundError::UpstreamServer { status, message },
        _ => PlaygroundError::Upstream { status, message },
    }
}

#[async_trait]
impl NewsFeed for BingNewsClient {
    async fn category(&self, market: Market, category: &str) -> Result<FeedPage> {
        let mut params = Self::base_params(market);
        params.push(("category", category.to_string()));
        self.get("/news", &params).await
    }

    async fn search(&self, market: Market, query: &str, count: usize) -> Result<FeedPage> {
        let mut params = Self::base_params(market);
        params.push(("count", count.to_string()));
        params.push(("q", query.to_string()));
        self.get("/news/search", &params).await
    }
}
