use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A story row as returned by the story store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: String,
    pub title: String,
    pub text: String,
    pub published_at: Option<DateTime<Utc>>,
    pub publication: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "type")]
    pub story_type: Option<String>,
    pub classification: Option<String>,
}

/// Result envelope of the story store queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryPage {
    pub total: usize,
    pub data: Vec<StoryRecord>,
}

impl StoryPage {
    pub fn new(data: Vec<StoryRecord>) -> Self {
        Self {
            total: data.len(),
            data,
        }
    }
}

/// A candidate story for one request, with the transient ranking fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub text: String,
    pub published_at: Option<DateTime<Utc>>,
    pub publication: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "type")]
    pub story_type: Option<String>,
    pub classification: Option<String>,
    /// Vector-search similarity; 0 when the story was not vector-sourced
    pub similarity_score: f64,
    /// 1-based rank assigned at fetch time
    pub position: usize,
}

impl Story {
    pub fn from_record(record: StoryRecord, similarity_score: f64, position: usize) -> Self {
        Self {
            id: record.id,
            title: record.title,
            text: record.text,
            published_at: record.published_at,
            publication: record.publication,
            author: record.author,
            story_type: record.story_type,
            classification: record.classification,
            similarity_score,
            position,
        }
    }
}

/// Output of scoring one story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredStory {
    pub id: String,
    pub title: String,
    pub value: f64,
    pub similarity_score: f64,
    pub position: usize,
    pub publication: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A headline from the external news feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    /// Derived from the description; doubles as the dedup key in a batch
    pub id: String,
    pub title: String,
    pub summary: String,
    pub publication: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevancyScoredHeadline {
    pub headline: Headline,
    /// Calibrated probability in [0, 1]
    pub relevance: f64,
}

/// Best internal story for a headline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryMatch {
    pub story: StoryRecord,
    pub similarity_score: f64,
}

/// One hit from the vector-similarity service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    pub similarity_score: f64,
}

/// One token alternative with its log-probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLogprob {
    pub token: String,
    pub logprob: f64,
}

/// Text pair fed to the transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformItem {
    pub title: String,
    pub text: String,
}

// ─── API request / response types ──────────────────────

/// Rank playground run request
#[derive(Debug, Clone, Deserialize)]
pub struct RankRunRequest {
    pub prompt: String,
    #[serde(default = "default_story_limit")]
    pub story_limit: usize,
    /// How many days back to look for stories
    #[serde(default = "default_days_back")]
    pub days_back: i64,
    #[serde(default)]
    pub is_vector_search: bool,
    pub vector_query: Option<String>,
    #[serde(default = "default_sampling_method")]
    pub sampling_method: String,
    #[serde(default)]
    pub attributes: Vec<String>,
}

fn default_story_limit() -> usize {
    10
}

fn default_days_back() -> i64 {
    1
}

fn default_sampling_method() -> String {
    "top-n".to_string()
}

/// A story reference carried over from a previous run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedStoryRef {
    pub id: String,
    pub position: usize,
    pub similarity_score: f64,
}

/// Re-score previously selected stories, restoring their original order
#[derive(Debug, Clone, Deserialize)]
pub struct RankRerunRequest {
    pub prompt: String,
    pub stories: Vec<SavedStoryRef>,
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankResponse {
    pub scored: Vec<ScoredStory>,
    pub candidates: Vec<Story>,
}

/// News playground run request
#[derive(Debug, Clone, Deserialize)]
pub struct NewsRunRequest {
    pub prompt: String,
    #[serde(default = "default_market")]
    pub market: String,
    #[serde(default)]
    pub use_top_headlines: bool,
    #[serde(default = "default_headline_limit")]
    pub headline_limit: usize,
    /// `match-on-title`, `match-on-summary` or `match-on-both`
    pub story_matching: Option<String>,
    /// Drop near-duplicate headlines above this cosine similarity
    pub dedup_threshold: Option<f32>,
}

fn default_market() -> String {
    "US".to_string()
}

fn default_headline_limit() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedHeadline {
    pub headline: Headline,
    pub relevance: f64,
    /// Present only when story matching was requested; `None` inside means no match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_story: Option<Option<StoryMatch>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsRunResponse {
    pub run_id: Uuid,
    pub headlines: Vec<Headline>,
    pub ranked: Vec<RankedHeadline>,
    pub has_story_matches: bool,
}

/// Reorder the headlines of a cached news run in a single model call
#[derive(Debug, Clone, Deserialize)]
pub struct NewsRerankRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsRerankResponse {
    pub run_id: Uuid,
    pub headlines: Vec<Headline>,
}

/// Transform playground run request
#[derive(Debug, Clone, Deserialize)]
pub struct TransformRequest {
    pub prompt: String,
    /// Internal stories to transform, by id
    #[serde(default)]
    pub story_ids: Vec<String>,
    /// External headlines to transform, as title/text pairs
    #[serde(default)]
    pub headlines: Vec<TransformItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformResponse {
    pub transformation: String,
}
