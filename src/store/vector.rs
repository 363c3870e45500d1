use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::VectorIndex;
use crate::config::VectorSearchConfig;
use crate::models::VectorHit;

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    n_results: usize,
    start_date_time: String,
    end_date_time: String,
}

/// Client for the article similarity-search service.
#[derive(Clone)]
pub struct HttpVectorIndex {
    client: reqwest::Client,
    config: VectorSearchConfig,
}

impl HttpVectorIndex {
    pub fn new(client: reqwest::Client, config: VectorSearchConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn search(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<VectorHit>> {
        let url = format!("{}/search_articles/", self.config.base_url.trim_end_matches('/'));
        let body = SearchRequest {
            query,
            n_results: limit,
            start_date_time: start.to_rfc3339(),
            end_date_time: end.to_rfc3339(),
        };

        let resp = self
            .client
            .post(&url)
            .timeout(self.config.timeout())
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to call vector search service")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Vector search returned {status}: {text}");
        }

        // One result list per query; a single query was sent.
        let mut lists: Vec<Vec<VectorHit>> = resp
            .json()
            .await
            .context("Failed to parse vector search response")?;
        if lists.is_empty() {
            return Ok(Vec::new());
        }
        Ok(lists.swap_remove(0))
    }
}
