//! # story-playground
//!
//! A service for experimenting with LLM-driven ranking, scoring and
//! transformation of internal stories and external news headlines.
//!
//! ## Pipelines
//!
//! ```text
//!  rank:       candidates ─► sample ─► score each story (pool) ─► sort desc
//!                (recent | vector search)
//!
//!  news:       categories (pool + retry) ─► id dedup ─► [embedding dedup]
//!                ─► relevance per headline (pool, logprobs) ─► sort desc
//!                ─► [match each to an internal story (pool)]
//!
//!  transform:  stories by id + headlines ─► one model call ─► text
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration with defaults
//! - [`error`] - Validation and upstream error taxonomy
//! - [`models`] - Stories, headlines, scored results, request/response types
//! - [`attributes`] - Registry of story attributes exposed to the model
//! - [`pool`] - Bounded concurrent executor with per-task failure isolation
//! - [`sampling`] - `top-n`, `random` and `repeat` candidate sampling
//! - [`llm`] - Language-model trait, OpenAI-compatible client, scorers and transformer
//! - [`news`] - News feed client, headline normalisation, dedup and story matching
//! - [`store`] - Story store and vector index contracts with their backends
//! - [`cache`] - Short-TTL cache for news runs
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state

pub mod api;
pub mod attributes;
pub mod cache;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod news;
pub mod pool;
pub mod sampling;
pub mod state;
pub mod store;
