use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// Maximum bytes sent per text.
const MAX_EMBED_CHARS: usize = 8_000;

const BATCH_SIZE: usize = 256;

/// Truncate `text` to at most `MAX_EMBED_CHARS`, splitting on a UTF-8 char boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Embed `texts` via an OpenAI-compatible `/v1/embeddings` endpoint.
/// Output order matches input order.
pub async fn embed_batch(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let url = format!("{}/v1/embeddings", config.base_url.trim_end_matches('/'));
    let api_key = config.api_key.as_deref().unwrap_or_default();
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(BATCH_SIZE) {
        let req = EmbedRequest {
            model: &config.embedding_model,
            input: chunk.iter().map(|t| truncate_for_embedding(t)).collect(),
        };

        let resp = client
            .post(&url)
            .timeout(config.timeout())
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&req)
            .send()
            .await
            .context("Failed to call embeddings API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Embeddings API returned {status}: {body}");
        }

        let body: EmbedResponse = resp
            .json()
            .await
            .context("Failed to parse embeddings response")?;

        all_embeddings.extend(ordered_embeddings(body, chunk.len())?);
    }

    Ok(all_embeddings)
}

/// Reorder by the `index` field; the API does not promise response order.
fn ordered_embeddings(body: EmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if body.data.len() != expected {
        anyhow::bail!(
            "Embeddings API returned {} vectors for {} inputs",
            body.data.len(),
            expected
        );
    }
    let mut data = body.data;
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}
