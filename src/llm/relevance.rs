//! Per-headline relevance judgments calibrated from token log-probabilities.
//!
//! The model is asked to end its reply with `true` or `false`. The top
//! alternatives at the final token position are split into an affirmative
//! and a negative mass, and the affirmative share becomes the headline's
//! relevance probability.

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::{complete_as, LanguageModel, LogprobRequest, ZERO_TEMPERATURE};
use crate::models::{Headline, RelevancyScoredHeadline, TokenLogprob};
use crate::pool::{execute_in_pool, Task};

/// Alternatives requested per token position.
pub const TOP_LOGPROBS: u8 = 5;

const SEED: u64 = 42;

fn relevancy_prompt(instruction: &str, headline_json: &str) -> String {
    format!(
        "Is this a relevant headline, according to the below prompt/instruction?\n\
         Output a small list of tags/attributes you could associate with the headline, and nothing else, \
         e.g. the likely topics and subjects of the headline.\n\
         Then with those tags in mind, finally answer either \"true\" or \"false\", and nothing else.\n\
         Your final output should be \"true\" or \"false\".\n\n\
         Headline:\n{headline_json}\n\n\
         Instruction:\n{instruction}\n"
    )
}

fn reranking_prompt(instruction: &str) -> String {
    format!("Rerank these headlines in accordance with the below instruction:\n\n{instruction}\n")
}

pub fn is_truthy_token(token: &str) -> bool {
    let lower = token.to_lowercase();
    lower.contains("true") || lower.contains("yes")
}

pub fn is_falsy_token(token: &str) -> bool {
    let lower = token.to_lowercase();
    lower.contains("false") || lower.contains("no")
}

/// Normalised (true, false) probabilities from scored token alternatives.
///
/// With no recognisable token at all the judgment is maximally uncertain.
pub fn extract_true_false_probs(scored_tokens: &[TokenLogprob]) -> (f64, f64) {
    let true_mass: f64 = scored_tokens
        .iter()
        .filter(|t| is_truthy_token(&t.token))
        .map(|t| t.logprob.exp())
        .sum();
    let false_mass: f64 = scored_tokens
        .iter()
        .filter(|t| is_falsy_token(&t.token))
        .map(|t| t.logprob.exp())
        .sum();

    let total = true_mass + false_mass;
    if total == 0.0 {
        (0.5, 0.5)
    } else {
        (true_mass / total, false_mass / total)
    }
}

/// Judge one headline against `instruction`.
pub async fn score_headline(
    model: &dyn LanguageModel,
    headline: &Headline,
    instruction: &str,
) -> Result<RelevancyScoredHeadline> {
    let headline_json = serde_json::to_string(headline)?;
    let request = LogprobRequest {
        prompt: relevancy_prompt(instruction, &headline_json),
        top_logprobs: TOP_LOGPROBS,
        temperature: ZERO_TEMPERATURE,
        seed: Some(SEED),
    };

    let positions = model.logprob_completion(request).await?;
    let last = positions
        .last()
        .context("Relevance completion returned no tokens")?;
    let (true_prob, _) = extract_true_false_probs(&last.top_logprobs);

    Ok(RelevancyScoredHeadline {
        headline: headline.clone(),
        relevance: true_prob,
    })
}

/// Judge every headline concurrently; most relevant first.
pub async fn rank_headlines_by_relevance(
    model: Arc<dyn LanguageModel>,
    headlines: &[Headline],
    instruction: &str,
    max_workers: usize,
) -> Vec<RelevancyScoredHeadline> {
    let instruction: Arc<str> = Arc::from(instruction);

    let tasks: Vec<Task<RelevancyScoredHeadline>> = headlines
        .iter()
        .cloned()
        .map(|headline| {
            let model = model.clone();
            let instruction = instruction.clone();
            Task::new("score_headline", async move {
                score_headline(model.as_ref(), &headline, &instruction).await
            })
        })
        .collect();

    let mut scored: Vec<RelevancyScoredHeadline> = execute_in_pool(tasks, max_workers)
        .await
        .into_iter()
        .flatten()
        .collect();

    scored.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}

#[derive(Debug, Deserialize, JsonSchema)]
struct HeadlineIdentifier {
    /// The identifier of the originally supplied headline.
    id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct HeadlineReranking {
    /// The list of headline ids reranked according to the provided instruction.
    headlines: Vec<HeadlineIdentifier>,
}

/// Ask the model to reorder all headlines in one call.
///
/// Identifiers the model invents are dropped with a warning, so the output
/// may be shorter than the input.
pub async fn rerank_headlines(
    model: &dyn LanguageModel,
    headlines: &[Headline],
    instruction: &str,
) -> Result<Vec<Headline>> {
    let by_id: HashMap<&str, &Headline> = headlines.iter().map(|h| (h.id.as_str(), h)).collect();

    let reply: HeadlineReranking = complete_as(
        model,
        &reranking_prompt(instruction),
        serde_json::to_string(headlines)?,
        Some(ZERO_TEMPERATURE),
    )
    .await?;

    let mut reranked = Vec::with_capacity(reply.headlines.len());
    for ident in reply.headlines {
        match by_id.get(ident.id.as_str()) {
            Some(h) => reranked.push((*h).clone()),
            None => tracing::warn!(
                "LLM hallucinated a headline identifier: {} (possible ids: {:?})",
                ident.id,
                by_id.keys().collect::<Vec<_>>()
            ),
        }
    }
    Ok(reranked)
}
