use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Duration, Utc};

use super::{api_error, ApiError};
use crate::attributes::{
    attribute_options, default_attributes, parse_attributes, AttributeOption, StoryAttribute,
};
use crate::error::PlaygroundError;
use crate::llm::scoring::rank_stories;
use crate::models::{RankRerunRequest, RankResponse, RankRunRequest};
use crate::sampling::{sample, SamplingStrategy};
use crate::state::AppState;
use crate::store::replication::ensure_not_replicating;
use crate::store::stories::{load_candidates, load_repeat_stories};

/// GET /api/attributes - Story attributes that can be sent to the model
pub async fn list_attributes() -> Json<Vec<AttributeOption>> {
    Json(attribute_options())
}

/// Longest look-back a rank run may request.
pub const MAX_DAYS_BACK: i64 = 3650;

/// Start of the candidate window, `days_back` days before `now`.
fn window_start(days_back: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>, PlaygroundError> {
    if !(1..=MAX_DAYS_BACK).contains(&days_back) {
        return Err(PlaygroundError::DaysBackOutOfBounds {
            value: days_back,
            min: 1,
            max: MAX_DAYS_BACK,
        });
    }
    Ok(now - Duration::days(days_back))
}

fn guard_replication(state: &AppState) -> Result<(), ApiError> {
    if state.config.replication_guard {
        ensure_not_replicating().map_err(api_error)?;
    }
    Ok(())
}

/// Parsed attribute selection; an empty selection means the defaults.
fn selected_attributes(names: &[String]) -> Result<Vec<StoryAttribute>, PlaygroundError> {
    let parsed = parse_attributes(names)?;
    if parsed.is_empty() {
        Ok(default_attributes())
    } else {
        Ok(parsed)
    }
}

/// POST /api/rank/run - Load candidates, sample, then score each story
pub async fn run(
    State(state): State<AppState>,
    Json(req): Json<RankRunRequest>,
) -> Result<Json<RankResponse>, ApiError> {
    guard_replication(&state)?;
    let attributes = selected_attributes(&req.attributes).map_err(api_error)?;
    let strategy: SamplingStrategy = req.sampling_method.parse().map_err(api_error)?;
    let since = window_start(req.days_back, Utc::now()).map_err(api_error)?;
    let store = state.story_store().map_err(api_error)?;

    tracing::info!(
        vector_query = req.vector_query.as_deref().unwrap_or(""),
        sampling = %req.sampling_method,
        "Run ranking | prompt: {}",
        req.prompt
    );

    let candidates = load_candidates(
        store.as_ref(),
        state.vectors.as_ref(),
        since,
        req.is_vector_search,
        req.vector_query.as_deref(),
    )
    .await
    .map_err(api_error)?;

    let sampled = sample(&candidates, req.story_limit, strategy);
    let scored = rank_stories(
        state.model.clone(),
        &req.prompt,
        sampled,
        &attributes,
        state.config.workers.ranking,
    )
    .await;

    Ok(Json(RankResponse { scored, candidates }))
}

/// POST /api/rank/rerun - Re-score previously selected stories in their
/// original order
pub async fn rerun(
    State(state): State<AppState>,
    Json(req): Json<RankRerunRequest>,
) -> Result<Json<RankResponse>, ApiError> {
    guard_replication(&state)?;
    let attributes = selected_attributes(&req.attributes).map_err(api_error)?;
    let store = state.story_store().map_err(api_error)?;

    let stories = load_repeat_stories(store.as_ref(), &req.stories)
        .await
        .map_err(api_error)?;

    let scored = rank_stories(
        state.model.clone(),
        &req.prompt,
        stories.clone(),
        &attributes,
        state.config.workers.ranking,
    )
    .await;

    Ok(Json(RankResponse {
        scored,
        candidates: stories,
    }))
}
