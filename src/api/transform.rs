use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::{api_error, ApiError};
use crate::llm::transform::transform_items;
use crate::models::{TransformItem, TransformRequest, TransformResponse};
use crate::state::AppState;
use crate::store::fetch_stories_by_id;

/// POST /api/transform/run - Apply one prompt to a set of stories and/or
/// headlines in a single model call
pub async fn run(
    State(state): State<AppState>,
    Json(req): Json<TransformRequest>,
) -> Result<Json<TransformResponse>, ApiError> {
    let mut items: Vec<TransformItem> = Vec::new();

    if !req.story_ids.is_empty() {
        let store = state.story_store().map_err(api_error)?;
        let page = fetch_stories_by_id(store.as_ref(), &req.story_ids)
            .await
            .map_err(api_error)?;
        items.extend(page.data.iter().map(TransformItem::from));
    }
    items.extend(req.headlines);

    if items.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Nothing to transform".to_string()));
    }

    tracing::info!("Transforming {} items", items.len());

    let transformation = transform_items(state.model.as_ref(), &items, &req.prompt)
        .await
        .map_err(api_error)?;

    Ok(Json(TransformResponse { transformation }))
}
