use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use story_playground::api;
use story_playground::config::Config;
use story_playground::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("LLM endpoint: {} ({})", config.llm.base_url, config.llm.chat_model);
    tracing::info!("News endpoint: {}", config.news.base_url);

    let state = AppState::new(config.clone())?;

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/api/attributes", get(api::rank::list_attributes))
        .route("/api/rank/run", post(api::rank::run))
        .route("/api/rank/rerun", post(api::rank::rerun))
        .route("/api/news/run", post(api::news::run))
        .route("/api/news/runs/{id}", get(api::news::get_run))
        .route("/api/news/runs/{id}/rerank", post(api::news::rerank_run))
        .route("/api/transform/run", post(api::transform::run))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
