use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use super::{api_error, ApiError};
use crate::error::PlaygroundError;
use crate::llm::relevance::{rank_headlines_by_relevance, rerank_headlines};
use crate::models::{
    NewsRerankRequest, NewsRerankResponse, NewsRunRequest, NewsRunResponse, RankedHeadline,
};
use crate::news::dedup::dedupe_headlines;
use crate::news::headlines::HeadlineFetcher;
use crate::news::matching::{match_headlines, QueryStrategy};
use crate::news::retry::RetryPolicy;
use crate::news::Market;
use crate::state::AppState;

/// POST /api/news/run - Fetch headlines, optionally dedupe, rank by
/// relevance and optionally match each to an internal story
pub async fn run(
    State(state): State<AppState>,
    Json(req): Json<NewsRunRequest>,
) -> Result<Json<NewsRunResponse>, ApiError> {
    let market: Market = req.market.parse().map_err(api_error)?;
    let strategy = req
        .story_matching
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<QueryStrategy>)
        .transpose()
        .map_err(api_error)?;
    if let Some(threshold) = req.dedup_threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(api_error(PlaygroundError::InvalidThreshold(threshold)));
        }
    }
    let store = match strategy {
        Some(_) => Some(state.story_store().map_err(api_error)?),
        None => None,
    };

    tracing::info!(market = %market, "News ranking | prompt: {}", req.prompt);

    let fetcher = HeadlineFetcher::new(
        state.news.clone(),
        RetryPolicy::default(),
        state.config.workers.category_fetch,
    );
    let mut headlines = fetcher
        .fetch(market, req.use_top_headlines, req.headline_limit)
        .await
        .map_err(api_error)?;

    if let Some(threshold) = req.dedup_threshold {
        headlines = dedupe_headlines(state.model.as_ref(), headlines, threshold)
            .await
            .map_err(api_error)?;
    }

    let scored = rank_headlines_by_relevance(
        state.model.clone(),
        &headlines,
        &req.prompt,
        state.config.workers.relevance,
    )
    .await;

    let matches = match (strategy, store) {
        (Some(strategy), Some(store)) => {
            let ranked: Vec<_> = scored.iter().map(|s| s.headline.clone()).collect();
            Some(
                match_headlines(
                    state.vectors.clone(),
                    store,
                    &ranked,
                    strategy,
                    state.config.workers.matching,
                )
                .await,
            )
        }
        _ => None,
    };

    let has_story_matches = matches.as_ref().is_some_and(|m| !m.is_empty());
    let ranked = match matches {
        Some(matches) => scored
            .into_iter()
            .zip(matches)
            .map(|(s, m)| RankedHeadline {
                headline: s.headline,
                relevance: s.relevance,
                matched_story: Some(m),
            })
            .collect(),
        None => scored
            .into_iter()
            .map(|s| RankedHeadline {
                headline: s.headline,
                relevance: s.relevance,
                matched_story: None,
            })
            .collect(),
    };

    let run_id = Uuid::new_v4();
    let response = NewsRunResponse {
        run_id,
        headlines,
        ranked,
        has_story_matches,
    };
    state.news_runs.insert(run_id, response.clone());

    Ok(Json(response))
}

fn cached_run(state: &AppState, id: Uuid) -> Result<NewsRunResponse, ApiError> {
    state
        .news_runs
        .get(&id)
        .ok_or((StatusCode::NOT_FOUND, format!("News run {id} not found or expired")))
}

/// GET /api/news/runs/{id} - A recent news run, while it is still cached
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NewsRunResponse>, ApiError> {
    cached_run(&state, id).map(Json)
}

/// POST /api/news/runs/{id}/rerank - Let the model reorder a cached run's
/// headlines in one call
pub async fn rerank_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<NewsRerankRequest>,
) -> Result<Json<NewsRerankResponse>, ApiError> {
    let run = cached_run(&state, id)?;

    tracing::info!(run_id = %id, "Reranking {} headlines", run.headlines.len());

    let headlines = rerank_headlines(state.model.as_ref(), &run.headlines, &req.prompt)
        .await
        .map_err(api_error)?;

    Ok(Json(NewsRerankResponse {
        run_id: id,
        headlines,
    }))
}
