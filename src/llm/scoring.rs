use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::{complete_as, LanguageModel};
use crate::attributes::{story_payload, StoryAttribute};
use crate::models::{ScoredStory, Story};
use crate::pool::{execute_in_pool, Task};

#[derive(Debug, Deserialize, JsonSchema)]
struct SingleStoryValue {
    value: Option<f64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct MultiStoryResponse {
    stories: Vec<BatchStory>,
}

/// A story as echoed back by the batch ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchStory {
    pub id: String,
    pub title: String,
}

/// Score one story with one structured call.
///
/// Only `attributes` are sent to the model. A null value from the model is
/// scored as 0. Transport and parse errors propagate to the caller.
pub async fn score_story(
    model: &dyn LanguageModel,
    story: &Story,
    prompt: &str,
    attributes: &[StoryAttribute],
) -> Result<ScoredStory> {
    let content = serde_json::to_string(&story_payload(story, attributes))?;
    let reply: SingleStoryValue = complete_as(model, prompt, content, None).await?;

    Ok(ScoredStory {
        id: story.id.clone(),
        title: story.title.clone(),
        value: reply.value.unwrap_or(0.0),
        similarity_score: story.similarity_score,
        position: story.position,
        publication: story.publication.clone(),
        published_at: story.published_at,
    })
}

/// Score every story concurrently and return the survivors, best first.
///
/// Stories whose call failed are left out, so the result may be shorter
/// than the input. Equal scores keep their input order.
pub async fn rank_stories(
    model: Arc<dyn LanguageModel>,
    prompt: &str,
    stories: Vec<Story>,
    attributes: &[StoryAttribute],
    max_workers: usize,
) -> Vec<ScoredStory> {
    let prompt: Arc<str> = Arc::from(prompt);
    let attributes: Arc<[StoryAttribute]> = Arc::from(attributes);

    let tasks: Vec<Task<ScoredStory>> = stories
        .into_iter()
        .map(|story| {
            let model = model.clone();
            let prompt = prompt.clone();
            let attributes = attributes.clone();
            Task::new("score_story", async move {
                score_story(model.as_ref(), &story, &prompt, &attributes).await
            })
        })
        .collect();

    let mut scored: Vec<ScoredStory> = execute_in_pool(tasks, max_workers)
        .await
        .into_iter()
        .flatten()
        .collect();

    sort_by_value_desc(&mut scored);
    scored
}

/// Stable descending sort on `value`.
pub fn sort_by_value_desc(scored: &mut [ScoredStory]) {
    scored.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Rank a whole batch of stories in one call.
///
/// Stories are presented to the model under their list index rather than
/// their real id; returned indices are mapped back, and any the model
/// invented are dropped.
pub async fn rank_story_batch(
    model: &dyn LanguageModel,
    stories: &[Story],
    prompt: &str,
) -> Result<Vec<BatchStory>> {
    let lookup: HashMap<String, &str> = stories
        .iter()
        .enumerate()
        .map(|(idx, s)| (idx.to_string(), s.id.as_str()))
        .collect();

    let content: Vec<serde_json::Value> = stories
        .iter()
        .enumerate()
        .map(|(idx, s)| {
            serde_json::json!({
                "id": idx,
                "title": s.title,
                "text": s.text,
            })
        })
        .collect();

    let reply: MultiStoryResponse =
        complete_as(model, prompt, serde_json::to_string(&content)?, None).await?;

    Ok(reply
        .stories
        .into_iter()
        .filter_map(|s| match lookup.get(s.id.trim()) {
            Some(real_id) => Some(BatchStory {
                id: real_id.to_string(),
                title: s.title,
            }),
            None => {
                tracing::warn!("Batch ranker returned unknown story index {}", s.id);
                None
            }
        })
        .collect())
}
