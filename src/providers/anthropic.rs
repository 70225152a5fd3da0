use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;

use crate::error::{AiError, Result};
use crate::models::*;
use crate::traits::CompletionProvider;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug)]
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://api.anthropic.com".to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    /// Reads `ANTHROPIC_API_KEY` from the environment.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            AiError::ConfigurationError {
                message: "ANTHROPIC_API_KEY is not set".to_string(),
            }
        })?;
        Ok(Self::new(api_key))
    }

    fn build_request(&self, request: CompletionRequest, stream: bool) -> AnthropicRequest {
        let (system, messages) = split_system_messages(request.messages);

        let tools = request.tools.map(|tools| {
            tools
                .into_iter()
                .map(|tool| AnthropicTool {
                    name: tool.function.name,
                    description: tool.function.description.unwrap_or_default(),
                    input_schema: tool.function.parameters,
                })
                .collect()
        });

        let tool_choice = request.tool_choice.map(|tc| match tc {
            ToolChoice::String(s) => match s.as_str() {
                "any" => AnthropicToolChoice::Any,
                _ => AnthropicToolChoice::Auto,
            },
            ToolChoice::Object(obj) => AnthropicToolChoice::Tool {
                name: obj.function.name,
            },
        });

        AnthropicRequest {
            model: request.model,
            messages: messages.into_iter().map(convert_message).collect(),
            max_tokens: request.max_tokens.unwrap_or(1024),
            temperature: request.temperature,
            top_p: request.top_p,
            stop_sequences: request.stop,
            stream: Some(stream),
            system,
            tools,
            tool_choice,
        }
    }

    async fn post(&self, body: &AnthropicRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
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
                provider: "anthropic".to_string(),
            },
            429 => AiError::RateLimitExceeded { retry_after },
            _ => AiError::ProviderError {
                provider: "anthropic".to_string(),
                message: format!("Anthropic API error: {}", error_text),
                status_code: Some(status.as_u16()),
                retryable: status.is_server_error(),
            },
        })
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<AnthropicToolChoice>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicBlock>,
}

/// Content block on the Anthropic wire. Tool calls travel as `tool_use`
/// blocks inside assistant turns; tool results as `tool_use_id`-tagged
/// `tool_result` blocks inside user turns.
#[derive(Serialize)]
#[serde(tag = "type")]
enum AnthropicBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum AnthropicToolChoice {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "tool")]
    Tool { name: String },
}

#[derive(Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<AnthropicContent>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
    id: Option<String>,
    name: Option<String>,
    input: Option<Value>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_request(request, false);
        let response = self.post(&body).await?;
        let anthropic_response: AnthropicResponse = response.json().await?;

        let mut text_parts = Vec::new();
        let mut tool_calls = Vec::new();

        for content in anthropic_response.content {
            match content.content_type.as_str() {
                "text" => {
                    if let Some(text) = content.text {
                        text_parts.push(text);
                    }
                }
                "tool_use" => {
                    if let (Some(id), Some(name), Some(input)) =
                        (content.id, content.name, content.input)
                    {
                        tool_calls.push(ToolCall {
                            id,
                            r#type: ToolType::Function,
                            function: FunctionCall {
                                name,
                                arguments: serde_json::to_string(&input)?,
                            },
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(CompletionResponse {
            id: anthropic_response.id,
            model: anthropic_response.model,
            choices: vec![Choice {
                index: 0,
                message: Message {
                    role: Role::Assistant,
                    content: if text_parts.is_empty() {
                        None
                    } else {
                        Some(text_parts.join(""))
                    },
                    tool_calls: if tool_calls.is_empty() {
                        None
                    } else {
                        Some(tool_calls)
                    },
                    tool_call_id: None,
                },
                finish_reason: anthropic_response.stop_reason,
            }],
            usage: Some(Usage {
                prompt_tokens: anthropic_response.usage.input_tokens,
                completion_tokens: anthropic_response.usage.output_tokens,
                total_tokens: anthropic_response.usage.input_tokens
                    + anthropic_response.usage.output_tokens,
            }),
        })
    }

    async fn complete_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>> {
        let body = self.build_request(request, true);
        let response = self.post(&body).await?;

        let stream = response
            .bytes_stream()
            .map(|result| match result {
                Ok(bytes) => parse_anthropic_sse(&String::from_utf8_lossy(&bytes)),
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
        "anthropic"
    }

    fn default_model(&self) -> &'static str {
        "claude-3-7-sonnet-latest"
    }

    fn available_models(&self) -> Vec<&'static str> {
        vec![
            "claude-3-7-sonnet-latest",
            "claude-3-5-sonnet-20241022",
            "claude-3-5-haiku-20241022",
            "claude-3-opus-20240229",
        ]
    }
}

fn convert_message(msg: Message) -> AnthropicMessage {
    match msg.role {
        Role::Tool => AnthropicMessage {
            role: "user".to_string(),
            content: vec![AnthropicBlock::ToolResult {
                tool_use_id: msg.tool_call_id.unwrap_or_default(),
                content: msg.content.unwrap_or_default(),
            }],
        },
        Role::Assistant => {
            let mut blocks = Vec::new();
            if let Some(text) = msg.content {
                if !text.is_empty() {
                    blocks.push(AnthropicBlock::Text { text });
                }
            }
            for call in msg.tool_calls.unwrap_or_default() {
                blocks.push(AnthropicBlock::ToolUse {
                    id: call.id,
                    name: call.function.name,
                    input: serde_json::from_str(&call.function.arguments)
                        .unwrap_or(Value::Null),
                });
            }
            AnthropicMessage {
                role: "assistant".to_string(),
                content: blocks,
            }
        }
        // System messages are hoisted into the top-level `system` field
        // before conversion; anything left here goes out as user text.
        _ => AnthropicMessage {
            role: "user".to_string(),
            content: vec![AnthropicBlock::Text {
                text: msg.content.unwrap_or_default(),
            }],
        },
    }
}

fn split_system_messages(messages: Vec<Message>) -> (Option<String>, Vec<Message>) {
    let mut system: Option<String> = None;
    let mut rest = Vec::new();

    for message in messages {
        if message.role == Role::System {
            let text = message.content.unwrap_or_default();
            system = Some(match system {
                Some(existing) => format!("{}\n\n{}", existing, text),
                None => text,
            });
        } else {
            rest.push(message);
        }
    }

    (system, rest)
}

fn parse_anthropic_sse(data: &str) -> Result<Option<StreamChunk>> {
    let mut lines = data.lines();
    while let Some(line) = lines.next() {
        let Some(event_type) = line.strip_prefix("event: ") else {
            continue;
        };
        let Some(json_str) = lines.next().and_then(|l| l.strip_prefix("data: ")) else {
            continue;
        };
        let Ok(json) = serde_json::from_str::<Value>(json_str) else {
            continue;
        };

        if event_type == "content_block_delta" {
            if let Some(text) = json
                .get("delta")
                .and_then(|d| d.get("text"))
                .and_then(|t| t.as_str())
            {
                return Ok(Some(StreamChunk {
                    id: "stream".to_string(),
                    choices: vec![StreamChoice {
                        index: 0,
                        delta: Delta {
                            role: None,
                            content: Some(text.to_string()),
                            tool_calls: None,
                        },
                        finish_reason: None,
                    }],
                    model: None,
                }));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_are_hoisted() {
        let messages = vec![
            Message::system("You are terse."),
            Message::user("hi"),
            Message::system("Always answer in English."),
        ];
        let (system, rest) = split_system_messages(messages);
        assert_eq!(
            system.as_deref(),
            Some("You are terse.\n\nAlways answer in English.")
        );
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn tool_results_become_user_blocks() {
        let converted = convert_message(Message::tool_result("toolu_1", "It's always sunny in Chicago!"));
        assert_eq!(converted.role, "user");
        let json = serde_json::to_value(&converted.content).unwrap();
        assert_eq!(json[0]["type"], "tool_result");
        assert_eq!(json[0]["tool_use_id"], "toolu_1");
    }

    #[test]
    fn sse_text_delta_parses() {
        let data = "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"sunny\"}}\n";
        let chunk = parse_anthropic_sse(data).unwrap().unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("sunny"));
    }
}
