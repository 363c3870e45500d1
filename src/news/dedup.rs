use anyhow::Result;

use crate::error::PlaygroundError;
use crate::llm::LanguageModel;
use crate::models::Headline;

/// Cosine similarity clamped to [-1, 1]. Mismatched, empty or zero vectors
/// score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Full pairwise similarity matrix.
pub fn similarity_matrix(embeddings: &[Vec<f32>]) -> Vec<Vec<f32>> {
    embeddings
        .iter()
        .map(|a| embeddings.iter().map(|b| cosine_similarity(a, b)).collect())
        .collect()
}

/// For each pair `i < j` with similarity above `threshold`, mark `j`.
pub fn excluded_mask(matrix: &[Vec<f32>], threshold: f32) -> Vec<bool> {
    let n = matrix.len();
    let mut excluded = vec![false; n];
    for i in 0..n {
        for j in (i + 1)..n {
            if matrix[i][j] > threshold {
                excluded[j] = true;
            }
        }
    }
    excluded
}

/// Drop headlines whose summary embedding is more similar than `threshold`
/// to an earlier one. Order is preserved.
///
/// All summaries are embedded in one batched request.
pub async fn dedupe_headlines(
    model: &dyn LanguageModel,
    headlines: Vec<Headline>,
    threshold: f32,
) -> Result<Vec<Headline>> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(PlaygroundError::InvalidThreshold(threshold).into());
    }
    if headlines.len() < 2 {
        return Ok(headlines);
    }

    let summaries: Vec<String> = headlines.iter().map(|h| h.summary.clone()).collect();
    let embeddings = model.embed(&summaries).await?;
    if embeddings.len() != headlines.len() {
        anyhow::bail!(
            "Embedding count mismatch: expected {}, got {}",
            headlines.len(),
            embeddings.len()
        );
    }

    let excluded = excluded_mask(&similarity_matrix(&embeddings), threshold);
    let before = headlines.len();
    let kept: Vec<Headline> = headlines
        .into_iter()
        .zip(excluded)
        .filter_map(|(h, skip)| (!skip).then_some(h))
        .collect();

    tracing::info!(threshold, "Deduplicated headlines: {} -> {}", before, kept.len());
    Ok(kept)
}
