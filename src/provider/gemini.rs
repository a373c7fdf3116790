//! Gemini `generateContent` client.

use super::sse::data_events;
use super::{
    build_provider_http_client, check_status, map_http_error, ChatMessage, CompletionOptions,
    CompletionResponse, CompletionStream, MessageRole, ModelProviderClient, TokenUsage,
    DEFAULT_GEMINI_BASE_URL,
};
use crate::error::{is_quota_message, ApiError};
use async_trait::async_trait;
use futures::{future, StreamExt};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl ErrorBody {
    fn into_api_error(self) -> ApiError {
        let text = format!("{} {}: {}", self.code, self.status, self.message);
        if self.code == 429 || is_quota_message(&self.status) {
            ApiError::ProviderRateLimit(text)
        } else {
            ApiError::ProviderRequestFailed(text)
        }
    }
}

impl GenerateContentResponse {
    fn parse(data: &str) -> Result<Self, ApiError> {
        let response: Self = serde_json::from_str(data)
            .map_err(|e| ApiError::ProviderError(format!("Failed to parse response: {}", e)))?;
        match response.error {
            Some(error) => Err(error.into_api_error()),
            None => Ok(response),
        }
    }

    fn first_candidate_text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

pub struct GeminiClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(model: String, api_key: String, base_url: Option<String>) -> Result<Self, ApiError> {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string());
        Ok(Self {
            client: build_provider_http_client()?,
            model,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn body(messages: Vec<ChatMessage>, options: CompletionOptions) -> GenerateContentRequest {
        let mut system = Vec::new();
        let mut contents = Vec::new();
        for message in messages {
            let part = Part {
                text: message.content,
            };
            match message.role {
                MessageRole::System => system.push(part),
                MessageRole::User => contents.push(Content {
                    role: Some("user".to_string()),
                    parts: vec![part],
                }),
                MessageRole::Assistant => contents.push(Content {
                    role: Some("model".to_string()),
                    parts: vec![part],
                }),
            }
        }

        GenerateContentRequest {
            contents,
            system_instruction: (!system.is_empty()).then(|| Content {
                role: None,
                parts: system,
            }),
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                top_p: options.top_p,
                stop_sequences: options.stop,
            },
        }
    }

    fn request(&self, method: &str, body: &GenerateContentRequest) -> RequestBuilder {
        let url = format!("{}/models/{}:{}", self.base_url, self.model, method);
        self.client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
    }
}

#[async_trait]
impl ModelProviderClient for GeminiClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        let body = Self::body(messages, options);
        let response = self
            .request("generateContent", &body)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = check_status(response).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::ProviderError(format!("Failed to read response: {}", e)))?;
        let parsed = GenerateContentResponse::parse(&text)?;

        let usage = parsed
            .usage_metadata
            .as_ref()
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: parsed.first_candidate_text(),
            model: parsed
                .model_version
                .clone()
                .unwrap_or_else(|| self.model.clone()),
            usage,
            finish_reason: parsed.candidates.first().and_then(|c| c.finish_reason.clone()),
        })
    }

    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionStream, ApiError> {
        let body = Self::body(messages, options);
        let response = self
            .request("streamGenerateContent?alt=sse", &body)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = check_status(response).await?;

        let bytes = response.bytes_stream().map(|chunk| chunk.map_err(map_http_error));
        let fragments = data_events(bytes).filter_map(|event| {
            future::ready(match event.and_then(|data| GenerateContentResponse::parse(&data)) {
                Ok(chunk) => Some(chunk.first_candidate_text()).filter(|t| !t.is_empty()).map(Ok),
                Err(err) => Some(Err(err)),
            })
        });
        Ok(Box::pin(fragments))
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
