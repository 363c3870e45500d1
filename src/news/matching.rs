use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::PlaygroundError;
use crate::models::{Headline, StoryMatch, StoryRecord};
use crate::pool::{execute_in_pool, Task};
use crate::store::{fetch_stories_by_id, StoryStore, VectorIndex};

const MATCH_WINDOW_DAYS: i64 = 3;
const MATCH_CANDIDATES: usize = 3;

pub const PLACEHOLDER_TEXT: &str =
    "(An internal story was found but does not yet exist in the Playground DB)";

/// Which headline fields are used as the similarity query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryStrategy {
    Title,
    #[default]
    Summary,
    TitleAndSummary,
}

impl FromStr for QueryStrategy {
    type Err = PlaygroundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match-on-title" => Ok(Self::Title),
            "match-on-summary" => Ok(Self::Summary),
            "match-on-both" => Ok(Self::TitleAndSummary),
            other => Err(PlaygroundError::InvalidQueryStrategy(other.to_string())),
        }
    }
}

impl QueryStrategy {
    pub fn query_text(&self, headline: &Headline) -> String {
        match self {
            Self::Title => headline.title.clone(),
            Self::Summary => headline.summary.clone(),
            Self::TitleAndSummary => format!("{}   {}", headline.title, headline.summary),
        }
    }
}

fn placeholder(id: String) -> StoryRecord {
    StoryRecord {
        id,
        title: PLACEHOLDER_TEXT.to_string(),
        text: PLACEHOLDER_TEXT.to_string(),
        published_at: None,
        publication: None,
        author: None,
        story_type: None,
        classification: None,
    }
}

/// Find the internal story closest to `headline` among those published in
/// the three days before `now`.
///
/// `Ok(None)` means the index had nothing in the window. A hit whose story
/// is missing from the store yields a placeholder record. A store that
/// cannot be reached is an error, not a missing story.
pub async fn match_headline(
    index: &dyn VectorIndex,
    store: &dyn StoryStore,
    headline: &Headline,
    strategy: QueryStrategy,
    now: DateTime<Utc>,
) -> Result<Option<StoryMatch>> {
    let query = strategy.query_text(headline);
    let start = now - Duration::days(MATCH_WINDOW_DAYS);

    let hits = index.search(start, now, &query, MATCH_CANDIDATES).await?;
    let Some(best) = hits.into_iter().next() else {
        return Ok(None);
    };

    let page = fetch_stories_by_id(store, std::slice::from_ref(&best.id)).await?;
    let story = match page.data.into_iter().next() {
        Some(story) => story,
        None => {
            tracing::warn!(
                "Story with ID {} exists in vector DB but not in playground DB.",
                best.id
            );
            placeholder(best.id)
        }
    };

    Ok(Some(StoryMatch {
        story,
        similarity_score: best.similarity_score,
    }))
}

/// Match every headline concurrently. The result is parallel to
/// `headlines`; a slot is `None` when nothing matched or the lookup failed.
pub async fn match_headlines(
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn StoryStore>,
    headlines: &[Headline],
    strategy: QueryStrategy,
    max_workers: usize,
) -> Vec<Option<StoryMatch>> {
    let now = Utc::now();
    let tasks: Vec<Task<Option<StoryMatch>>> = headlines
        .iter()
        .cloned()
        .map(|headline| {
            let index = index.clone();
            let store = store.clone();
            Task::new("match_headline", async move {
                match_headline(index.as_ref(), store.as_ref(), &headline, strategy, now).await
            })
        })
        .collect();

    execute_in_pool(tasks, max_workers)
        .await
        .into_iter()
        .map(Option::flatten)
        .collect()
}
