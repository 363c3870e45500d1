//! Data-access contracts for internal stories and the vector index.
//!
//! [`StoryStore`] and [`VectorIndex`] are the raw backends. The free
//! functions [`fetch_stories`] and [`fetch_stories_by_id`] wrap them with the
//! validation and failure policy every caller relies on: bad arguments are
//! rejected before any backend is touched. A failing backend yields an empty
//! page for recent stories but an error for lookups by id, so callers can
//! tell a missing story from an unreachable store.

pub mod postgres;
pub mod replication;
pub mod stories;
pub mod vector;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::PlaygroundError;
use crate::models::{StoryPage, StoryRecord, VectorHit};

pub const MIN_STORY_LIMIT: i64 = 1;
pub const MAX_STORY_LIMIT: i64 = 100_000;

#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Stories published between `start_date` and today, newest first.
    async fn query_recent(&self, start_date: NaiveDate, limit: i64) -> Result<Vec<StoryRecord>>;

    /// Stories with the given ids. Unknown ids are simply absent.
    async fn query_by_ids(&self, ids: &[Uuid]) -> Result<Vec<StoryRecord>>;
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Best matches for `query` among stories published in `[start, end]`.
    async fn search(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<VectorHit>>;
}

/// Recent stories, excluding segments.
pub async fn fetch_stories(
    store: &dyn StoryStore,
    start_date: NaiveDate,
    limit: i64,
) -> Result<StoryPage, PlaygroundError> {
    if !(MIN_STORY_LIMIT..=MAX_STORY_LIMIT).contains(&limit) {
        return Err(PlaygroundError::LimitOutOfBounds {
            value: limit,
            min: MIN_STORY_LIMIT,
            max: MAX_STORY_LIMIT,
        });
    }

    match store.query_recent(start_date, limit).await {
        Ok(records) => Ok(StoryPage::new(records)),
        Err(e) => {
            tracing::warn!("Story query since {start_date} failed: {e:#}");
            Ok(StoryPage::default())
        }
    }
}

/// Stories by id. Every id must be a syntactically valid UUID; a backend
/// failure is returned as [`PlaygroundError::StoreQuery`].
pub async fn fetch_stories_by_id(
    store: &dyn StoryStore,
    ids: &[String],
) -> Result<StoryPage, PlaygroundError> {
    let parsed = parse_story_ids(ids)?;
    if parsed.is_empty() {
        return Ok(StoryPage::default());
    }

    let records = store
        .query_by_ids(&parsed)
        .await
        .map_err(|e| PlaygroundError::StoreQuery(format!("{} ids: {e:#}", parsed.len())))?;
    Ok(StoryPage::new(records))
}

pub fn parse_story_ids(ids: &[String]) -> Result<Vec<Uuid>, PlaygroundError> {
    ids.iter()
        .map(|id| Uuid::parse_str(id).map_err(|_| PlaygroundError::InvalidStoryIds(id.clone())))
        .collect()
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use parking_lot::Mutex;

    /// In-memory store that records how often it was queried.
    #[derive(Default)]
    pub struct MemoryStore {
        pub records: Vec<StoryRecord>,
        pub fail: bool,
        pub calls: Mutex<usize>,
    }

    impl MemoryStore {
        pub fn with_records(records: Vec<StoryRecord>) -> Self {
            Self {
                records,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl StoryStore for MemoryStore {
        async fn query_recent(
            &self,
            _start_date: NaiveDate,
            limit: i64,
        ) -> Result<Vec<StoryRecord>> {
            *self.calls.lock() += 1;
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(self.records.iter().take(limit as usize).cloned().collect())
        }

        async fn query_by_ids(&self, ids: &[Uuid]) -> Result<Vec<StoryRecord>> {
            *self.calls.lock() += 1;
            if self.fail {
                anyhow::bail!("connection refused");
            }
            let wanted: Vec<String> = ids.iter().map(Uuid::to_string).collect();
            Ok(self
                .records
                .iter()
                .filter(|r| wanted.contains(&r.id))
                .cloned()
                .collect())
        }
    }

    pub fn record(id: &str, title: &str) -> StoryRecord {
        StoryRecord {
            id: id.to_string(),
            title: title.to_string(),
            text: format!("{title} body"),
            published_at: None,
            publication: Some("Daily Ledger".to_string()),
            author: None,
            story_type: None,
            classification: None,
        }
    }
}
