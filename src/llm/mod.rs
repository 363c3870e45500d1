//! Language-model access and the scoring / ranking operations built on it.

pub mod embeddings;
pub mod openai;
pub mod relevance;
pub mod schema;
pub mod scoring;
pub mod transform;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::models::TokenLogprob;
use schema::{ResponseSchema, StructuredOutput};

/// Effectively-zero sampling temperature (some providers reject exactly 0).
pub const ZERO_TEMPERATURE: f32 = 0.000_000_001;

/// A structured-completion request: system prompt, serialized user payload
/// and the JSON schema the reply must follow.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub system: String,
    pub user: String,
    pub schema: ResponseSchema,
    pub temperature: Option<f32>,
}

/// A plain completion that also returns per-token log-probabilities.
#[derive(Debug, Clone)]
pub struct LogprobRequest {
    pub prompt: String,
    /// How many alternatives to return per position
    pub top_logprobs: u8,
    pub temperature: f32,
    pub seed: Option<u64>,
}

/// One generated token with its most likely alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPosition {
    pub token: String,
    pub logprob: f64,
    pub top_logprobs: Vec<TokenLogprob>,
}

/// The three model calls the playground relies on.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the raw JSON content of the first choice.
    async fn structured_completion(&self, request: StructuredRequest) -> Result<String>;

    /// Returns the generated tokens, in order, with their top alternatives.
    async fn logprob_completion(&self, request: LogprobRequest) -> Result<Vec<TokenPosition>>;

    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Run a structured completion and deserialize the reply into `T`.
pub async fn complete_as<T: StructuredOutput>(
    model: &dyn LanguageModel,
    system: &str,
    user: String,
    temperature: Option<f32>,
) -> Result<T> {
    let request = StructuredRequest {
        system: system.to_string(),
        user,
        schema: ResponseSchema::of::<T>(),
        temperature,
    };
    let raw = model.structured_completion(request).await?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {} from model reply: {raw}", T::type_name()))
}
