use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Postgres replica holding published stories. Without it the story
    /// store is unavailable and only the news playground works.
    pub database_url: Option<String>,
    /// Language model configuration
    pub llm: LlmConfig,
    /// Category news feed configuration
    pub news: NewsConfig,
    /// External vector-similarity search service
    pub vector_search: VectorSearchConfig,
    /// Per-operation worker caps
    pub workers: WorkerConfig,
    /// How long a cached news run stays retrievable, in seconds
    pub result_cache_ttl_secs: u64,
    /// Refuse rank runs while the replica is refreshing
    pub replication_guard: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the OpenAI-compatible API
    pub base_url: String,
    /// API key sent as a bearer token
    pub api_key: Option<String>,
    /// Model name for structured and logprob completions
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// Timeout applied to every individual model call
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Base URL of the news API (category feed at `/news`, search at `/news/search`)
    pub base_url: String,
    /// Subscription key sent with each request
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Per-story scoring
    pub ranking: usize,
    /// Per-headline relevance classification
    pub relevance: usize,
    /// Per-headline internal story matching
    pub matching: usize,
    /// Per-category headline fetch
    pub category_fetch: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            database_url: None,
            llm: LlmConfig::default(),
            news: NewsConfig::default(),
            vector_search: VectorSearchConfig::default(),
            workers: WorkerConfig::default(),
            result_cache_ttl_secs: 900,
            replication_guard: true,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            chat_model: "gpt-4o-2024-08-06".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.bing.microsoft.com/v7.0".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl Default for VectorSearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            ranking: 10,
            relevance: 10,
            matching: 10,
            category_fetch: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` is the
    /// production entry point; tests pass a map.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = get("PLAYGROUND_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(url) = get("DATABASE_URL") {
            config.database_url = Some(url);
        }

        // LLM
        if let Some(url) = get("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Some(model) = get("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Some(model) = get("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Some(v) = get("LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.llm.timeout_secs = v;
        }

        // News feed
        if let Some(url) = get("NEWS_API_URL") {
            config.news.base_url = url;
        }
        if let Some(key) = get("NEWS_API_KEY") {
            config.news.api_key = Some(key);
        }
        if let Some(v) = get("NEWS_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.news.timeout_secs = v;
        }

        // Vector search
        if let Some(url) = get("VECTOR_SEARCH_URL") {
            config.vector_search.base_url = url;
        }
        if let Some(v) = get("VECTOR_SEARCH_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.vector_search.timeout_secs = v;
        }

        if let Some(v) = get("RESULT_CACHE_TTL_SECS").and_then(|v| v.parse().ok()) {
            config.result_cache_ttl_secs = v;
        }
        if let Some(v) = get("REPLICATION_GUARD").and_then(|v| v.parse().ok()) {
            config.replication_guard = v;
        }

        // Worker caps (zero is clamped to one by the pool)
        if let Some(v) = get("RANKING_WORKERS").and_then(|v| v.parse().ok()) {
            config.workers.ranking = v;
        }
        if let Some(v) = get("RELEVANCE_WORKERS").and_then(|v| v.parse().ok()) {
            config.workers.relevance = v;
        }
        if let Some(v) = get("MATCHING_WORKERS").and_then(|v| v.parse().ok()) {
            config.workers.matching = v;
        }
        if let Some(v) = get("CATEGORY_WORKERS").and_then(|v| v.parse().ok()) {
            config.workers.category_fetch = v;
        }

        config
    }

    pub fn result_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.result_cache_ttl_secs)
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl NewsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl VectorSearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_worker_caps() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.workers.ranking, 10);
        assert_eq!(config.workers.relevance, 10);
        assert_eq!(config.workers.matching, 10);
        assert_eq!(config.workers.category_fetch, 5);
        assert!(config.database_url.is_none());
        assert!(config.replication_guard);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("LLM_CHAT_MODEL", "gpt-4o-mini"),
            ("OPENAI_API_KEY", "sk-test"),
            ("LLM_TIMEOUT_SECS", "15"),
            ("CATEGORY_WORKERS", "2"),
            ("DATABASE_URL", "postgres://replica/stories"),
            ("REPLICATION_GUARD", "false"),
        ]));
        assert!(!config.replication_guard);
        assert_eq!(config.llm.chat_model, "gpt-4o-mini");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.timeout(), Duration::from_secs(15));
        assert_eq!(config.workers.category_fetch, 2);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://replica/stories")
        );
    }

    #[test]
    fn test_unparseable_numbers_keep_defaults() {
        let config = Config::from_lookup(lookup(&[("NEWS_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.news.timeout_secs, 30);
    }
}
