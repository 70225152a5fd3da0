use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

use crate::error::{AiError, Result};
use crate::models::*;
use crate::traits::CompletionProvider;

#[derive(Debug)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1".to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    /// Reads `OPENAI_API_KEY` from the environment.
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var("OPENAI_API_KEY").map_err(|_| AiError::ConfigurationError {
                message: "OPENAI_API_KEY is not set".to_string(),
            })?;
        Ok(Self::new(api_key))
    }

    async fn post(&self, body: &OpenAIRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let error_text = response.text().await.unwrap_or_default();

        Err(match status.as_u16() {
            401 | 403 => AiError::InvalidApiKey {
                provider: "openai".to_string(),
            },
            429 => AiError::RateLimitExceeded { retry_after },
            _ => AiError::ProviderError {
                provider: "openai".to_string(),
                message: format!("OpenAI API error: {}", error_text),
                status_code: Some(status.as_u16()),
                retryable: status.is_server_error(),
            },
        })
    }
}

// The crate's Message type matches the chat-completions wire shape, so
// requests serialize transcripts directly.
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

impl OpenAIRequest {
    fn from_completion(request: CompletionRequest, stream: bool) -> Self {
        Self {
            model: request.model,
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: Some(stream),
            top_p: request.top_p,
            stop: request.stop,
            tools: request.tools,
            tool_choice: request.tool_choice,
            response_format: request.response_format,
        }
    }
}

#[derive(Deserialize)]
struct OpenAIStreamChunk {
    id: String,
    model: String,
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAIStreamChoice {
    index: u32,
    delta: OpenAIDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIDelta {
    role: Option<Role>,
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = OpenAIRequest::from_completion(request, false);
        let response = self.post(&body).await?;
        Ok(response.json().await?)
    }

    async fn complete_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>> {
        let body = OpenAIRequest::from_completion(request, true);
        let response = self.post(&body).await?;

        let stream = response
            .bytes_stream()
            .map(|result| match result {
                Ok(bytes) => parse_openai_sse(&String::from_utf8_lossy(&bytes)),
                Err(e) => Err(AiError::StreamError {
                    message: e.to_string(),
                    retryable: true,
                }),
            })
            .filter_map(|result| async move {
                match result {
                    Ok(Some(chunk)) => Some(Ok(chunk)),
                    Ok(None) => None,
                    Err(e) => Some(Err(e)),
                }
            });

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &'static str {
        "openai"
    }

    fn default_model(&self) -> &'static str {
        "gpt-4o"
    }

    fn available_models(&self) -> Vec<&'static str> {
        vec!["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"]
    }
}

fn parse_openai_sse(data: &str) -> Result<Option<StreamChunk>> {
    for line in data.lines() {
        let Some(json_str) = line.strip_prefix("data: ") else {
            continue;
        };
        if json_str == "[DONE]" {
            return Ok(None);
        }

        if let Ok(chunk) = serde_json::from_str::<OpenAIStreamChunk>(json_str) {
            return Ok(Some(StreamChunk {
                id: chunk.id,
                choices: chunk
                    .choices
                    .into_iter()
                    .map(|c| StreamChoice {
                        index: c.index,
                        delta: Delta {
                            role: c.delta.role,
                            content: c.delta.content,
                            tool_calls: c.delta.tool_calls,
                        },
                        finish_reason: c.finish_reason,
                    })
                    .collect(),
                model: Some(chunk.model),
            }));
        }
    }
    Ok(None)
}
