use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::{fetch_stories, fetch_stories_by_id, StoryStore, VectorIndex};
use crate::error::PlaygroundError;
use crate::models::{SavedStoryRef, Story};

/// Upper bound on candidates pulled for a rank run, before sampling.
pub const CANDIDATE_LIMIT: usize = 1_000;

/// Load the candidate pool for a rank run.
///
/// Vector-sourced candidates come back most similar first; recent ones
/// newest first. Positions are assigned 1-based in that order.
pub async fn load_candidates(
    store: &dyn StoryStore,
    index: &dyn VectorIndex,
    since: DateTime<Utc>,
    is_vector_search: bool,
    vector_query: Option<&str>,
) -> Result<Vec<Story>> {
    let scored_records = if is_vector_search {
        let query = vector_query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(PlaygroundError::MissingVectorQuery)?;

        let hits = index.search(since, Utc::now(), query, CANDIDATE_LIMIT).await?;
        let similarity: HashMap<&str, f64> = hits
            .iter()
            .map(|h| (h.id.as_str(), h.similarity_score))
            .collect();
        let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();

        let page = fetch_stories_by_id(store, &ids).await?;
        let mut scored: Vec<_> = page
            .data
            .into_iter()
            .map(|record| {
                let score = similarity.get(record.id.as_str()).copied().unwrap_or(0.0);
                (record, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
    } else {
        let page = fetch_stories(store, since.date_naive(), CANDIDATE_LIMIT as i64).await?;
        page.data.into_iter().map(|record| (record, 0.0)).collect()
    };

    tracing::info!(
        vector_search = is_vector_search,
        "Loaded {} candidate stories",
        scored_records.len()
    );

    Ok(scored_records
        .into_iter()
        .enumerate()
        .map(|(idx, (record, score))| Story::from_record(record, score, idx + 1))
        .collect())
}

/// Re-fetch previously selected stories and restore their saved position
/// and similarity, in position order.
pub async fn load_repeat_stories(
    store: &dyn StoryStore,
    saved: &[SavedStoryRef],
) -> Result<Vec<Story>, PlaygroundError> {
    let ids: Vec<String> = saved.iter().map(|s| s.id.clone()).collect();
    let by_id: HashMap<&str, &SavedStoryRef> = saved.iter().map(|s| (s.id.as_str(), s)).collect();

    let page = fetch_stories_by_id(store, &ids).await?;
    let mut stories: Vec<Story> = page
        .data
        .into_iter()
        .filter_map(|record| {
            let saved = by_id.get(record.id.as_str())?;
            let (score, position) = (saved.similarity_score, saved.position);
            Some(Story::from_record(record, score, position))
        })
        .collect();

    stories.sort_by_key(|s| s.position);
    Ok(stories)
}
