pub mod news;
pub mod rank;
pub mod transform;

use axum::http::StatusCode;

use crate::error::PlaygroundError;

pub type ApiError = (StatusCode, String);

pub fn status_for(err: &PlaygroundError) -> StatusCode {
    match err {
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        PlaygroundError::Replicating | PlaygroundError::StoreUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map any handler error onto a status code and message.
pub fn api_error(err: impl Into<anyhow::Error>) -> ApiError {
    let err = err.into();
    let status = err
        .downcast_ref::<PlaygroundError>()
        .map(status_for)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::warn!("Request failed: {err:#}");
    }
    (status, format!("{err:#}"))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
