use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::ResultCache;
use crate::config::Config;
use crate::error::PlaygroundError;
use crate::llm::openai::OpenAiModel;
use crate::llm::LanguageModel;
use crate::models::NewsRunResponse;
use crate::news::feed::{BingNewsClient, NewsFeed};
use crate::store::postgres::PgStoryStore;
use crate::store::vector::HttpVectorIndex;
use crate::store::{StoryStore, VectorIndex};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub model: Arc<dyn LanguageModel>,
    pub news: Arc<dyn NewsFeed>,
    /// `None` when no story database is configured
    pub stories: Option<Arc<dyn StoryStore>>,
    pub vectors: Arc<dyn VectorIndex>,
    pub news_runs: Arc<ResultCache<NewsRunResponse>>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let model = Arc::new(OpenAiModel::new(http_client.clone(), config.llm.clone()));
        let news = Arc::new(BingNewsClient::new(http_client.clone(), config.news.clone()));
        let vectors = Arc::new(HttpVectorIndex::new(
            http_client.clone(),
            config.vector_search.clone(),
        ));

        let stories: Option<Arc<dyn StoryStore>> = match config.database_url.as_deref() {
            Some(url) => Some(Arc::new(PgStoryStore::connect_lazy(url)?)),
            None => {
                tracing::warn!("DATABASE_URL not set; rank and transform-by-id are unavailable");
                None
            }
        };

        Ok(Self::from_parts(config, http_client, model, news, stories, vectors))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: Config,
        http_client: reqwest::Client,
        model: Arc<dyn LanguageModel>,
        news: Arc<dyn NewsFeed>,
        stories: Option<Arc<dyn StoryStore>>,
        vectors: Arc<dyn VectorIndex>,
    ) -> Self {
        let news_runs = Arc::new(ResultCache::new(config.result_cache_ttl()));
        Self {
            config,
            http_client,
            model,
            news,
            stories,
            vectors,
            news_runs,
        }
    }

    pub fn story_store(&self) -> Result<Arc<dyn StoryStore>, PlaygroundError> {
        self.stories.clone().ok_or(PlaygroundError::StoreUnavailable)
    }
}
