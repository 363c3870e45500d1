use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{LanguageModel, LogprobRequest, StructuredRequest, TokenPosition};
use crate::config::LlmConfig;
use crate::models::TokenLogprob;

/// OpenAI-compatible chat + embeddings client.
#[derive(Clone)]
pub struct OpenAiModel {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiModel {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }

    async fn chat(&self, req: &ChatRequest<'_>) -> Result<ChatResponse> {
        let url = format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'));
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        tracing::debug!(model = %req.model, "Chat completion request");

        let resp = self
            .client
            .post(&url)
            .timeout(self.config.timeout())
            .header("Authorization", format!("Bearer {api_key}"))
            .json(req)
            .send()
            .await
            .context("Failed to call chat completions API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Chat completions API returned {status}: {body}");
        }

        resp.json()
            .await
            .context("Failed to parse chat completions response")
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn structured_completion(&self, request: StructuredRequest) -> Result<String> {
        let req = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            seed: None,
            logprobs: None,
            top_logprobs: None,
            response_format: Some(request.schema.response_format()),
        };

        let body = self.chat(&req).await?;
        let message = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .context("Chat completions response had no choices")?;

        if let Some(refusal) = message.refusal {
            anyhow::bail!("Model refused structured request: {refusal}");
        }
        message
            .content
            .context("Chat completions response had no content")
    }

    async fn logprob_completion(&self, request: LogprobRequest) -> Result<Vec<TokenPosition>> {
        let req = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: Some(request.temperature),
            seed: request.seed,
            logprobs: Some(true),
            top_logprobs: Some(request.top_logprobs),
            response_format: None,
        };

        let body = self.chat(&req).await?;
        let logprobs = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.logprobs)
            .context("Chat completions response carried no logprobs")?;

        Ok(logprobs
            .content
            .unwrap_or_default()
            .into_iter()
            .map(|t| TokenPosition {
                token: t.token,
                logprob: t.logprob,
                top_logprobs: t
                    .top_logprobs
                    .into_iter()
                    .map(|alt| TokenLogprob {
                        token: alt.token,
                        logprob: alt.logprob,
                    })
                    .collect(),
            })
            .collect())
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        super::embeddings::embed_batch(&self.client, &self.config, texts).await
    }
}

// ─── Wire types ─────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logprobs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_logprobs: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
    #[serde(default)]
    logprobs: Option<ChoiceLogprobs>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceLogprobs {
    #[serde(default)]
    content: Option<Vec<ContentLogprob>>,
}

#[derive(Deserialize)]
struct ContentLogprob {
    token: String,
    logprob: f64,
    #[serde(default)]
    top_logprobs: Vec<TopLogprob>,
}

#[derive(Deserialize)]
struct TopLogprob {
    token: String,
    logprob: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logprob_response_parses() {
        let raw = r#"{
            "choices": [{
                "message": {"role": "assistant", "content": "politics, election\ntrue"},
                "logprobs": {"content": [
                    {"token": "true", "logprob": -0.1, "top_logprobs": [
                        {"token": "true", "logprob": -0.1},
                        {"token": "false", "logprob": -2.4}
                    ]}
                ]}
            }]
        }"#;
        let body: ChatResponse = serde_json::from_str(raw).unwrap();
        let logprobs = body.choices[0].logprobs.as_ref().unwrap();
        let content = logprobs.content.as_ref().unwrap();
        assert_eq!(content[0].top_logprobs.len(), 2);
        assert_eq!(content[0].top_logprobs[1].token, "false");
    }

    #[test]
    fn test_structured_request_omits_unset_fields() {
        let req = ChatRequest {
            model: "gpt-4o",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: None,
            seed: None,
            logprobs: None,
            top_logprobs: None,
            response_format: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("temperature"));
        assert!(!obj.contains_key("logprobs"));
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
