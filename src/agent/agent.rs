use futures::stream::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::checkpoint::{CheckpointError, Checkpointer};
use crate::error::{AiError, RetryConfig, RetryExecutor};
use crate::models::*;
use crate::observability::{AgentTracer, MetricsCollector, TokenUsage, TraceStatus};
use crate::traits::CompletionProvider;

use super::tools::{ToolRegistry, ToolResult};

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Provider error: {0}")]
    Provider(#[from] AiError),

    #[error("Tool execution error: {0}")]
    Tool(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Structured response did not match the schema: {0}")]
    StructuredDecode(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// Per-invocation configuration. The thread id keys the conversation in
/// the checkpointer; without a checkpointer it has no effect.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub thread_id: Option<String>,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
        }
    }
}

/// Outcome of one agent invocation.
#[derive(Debug, Clone)]
pub struct AgentReply {
    /// The full transcript after this invocation, as persisted.
    pub messages: Vec<Message>,
    /// Text of the final assistant turn.
    pub final_text: String,
    /// Present when the agent was built with a response schema.
    pub structured_response: Option<Value>,
}

impl AgentReply {
    pub fn structured_as<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let value = self.structured_response.as_ref().ok_or_else(|| {
            AgentError::StructuredDecode("no structured response was produced".to_string())
        })?;
        serde_json::from_value(value.clone())
            .map_err(|e| AgentError::StructuredDecode(e.to_string()))
    }
}

#[derive(Clone)]
pub struct ReactAgentConfig {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub max_iterations: usize,
}

impl Default for ReactAgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: None,
            max_tokens: None,
            top_p: None,
            max_iterations: 10,
        }
    }
}

/// A ReAct agent: loops a chat model against a tool registry until the
/// model answers in plain text, restoring and persisting the transcript
/// through a checkpointer when a thread id is given.
pub struct ReactAgent {
    provider: Arc<dyn CompletionProvider>,
    system_prompt: Option<String>,
    tools: ToolRegistry,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    response_schema: Option<JsonSchema>,
    config: ReactAgentConfig,
    retry: RetryConfig,
    agent_id: String,
    metrics: Option<Arc<MetricsCollector>>,
    tracer: Option<Arc<AgentTracer>>,
}

impl ReactAgent {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        provider: Arc<dyn CompletionProvider>,
        system_prompt: Option<String>,
        tools: ToolRegistry,
        checkpointer: Option<Arc<dyn Checkpointer>>,
        response_schema: Option<JsonSchema>,
        config: ReactAgentConfig,
        retry: RetryConfig,
        metrics: Option<Arc<MetricsCollector>>,
        tracer: Option<Arc<AgentTracer>>,
    ) -> Self {
        Self {
            provider,
            system_prompt,
            tools,
            checkpointer,
            response_schema,
            config,
            retry,
            agent_id: uuid::Uuid::new_v4().to_string(),
            metrics,
            tracer,
        }
    }

    pub fn builder() -> super::ReactAgentBuilder {
        super::ReactAgentBuilder::new()
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Run one invocation: restore the thread, loop completions and tool
    /// calls until a plain text answer, coerce the structured response if
    /// a schema was configured, persist, and reply.
    pub async fn invoke(&self, input: &str, config: &RunConfig) -> Result<AgentReply> {
        let start_time = Instant::now();
        let mut total_tokens = TokenUsage::new();

        let mut span = self
            .tracer
            .as_ref()
            .map(|tracer| tracer.start_span("agent_invoke"));
        if let (Some(span), Some(thread_id)) = (span.as_mut(), config.thread_id.as_deref()) {
            span.set_tag("thread_id", thread_id);
        }

        let mut transcript = self.restore_transcript(config).await?;
        transcript.push(Message::user(input));

        let outcome = self.run_loop(&mut transcript, &mut total_tokens).await;

        let success = outcome.is_ok();
        if let Some(metrics) = &self.metrics {
            metrics.record_request(&self.agent_id, success, start_time.elapsed(), total_tokens);
        }
        if let Some(mut span) = span {
            if !success {
                span.set_status(TraceStatus::Error);
            }
            span.finish();
        }

        let final_text = outcome?;

        // The coercion exchange is not part of the conversation; persist
        // the transcript before asking for the structured restatement.
        self.persist_transcript(config, &transcript).await?;

        let structured_response = match &self.response_schema {
            Some(schema) => Some(self.coerce_structured(&transcript, schema).await?),
            None => None,
        };

        Ok(AgentReply {
            messages: transcript,
            final_text,
            structured_response,
        })
    }

    /// Stream the text of a single completion. Tool calls are not followed.
    pub async fn invoke_stream(
        &self,
        input: &str,
        config: &RunConfig,
    ) -> Result<impl futures::Stream<Item = Result<String>>> {
        let mut transcript = self.restore_transcript(config).await?;
        transcript.push(Message::user(input));

        let mut request = self.build_request(transcript, false);
        request.stream = Some(true);

        let stream = self.provider.complete_stream(request).await?;
        Ok(stream.map(|chunk_result| match chunk_result {
            Ok(chunk) => {
                let mut content = String::new();
                for choice in chunk.choices {
                    if let Some(delta) = choice.delta.content {
                        content.push_str(&delta);
                    }
                }
                Ok(content)
            }
            Err(e) => Err(AgentError::Provider(e)),
        }))
    }

    async fn run_loop(
        &self,
        transcript: &mut Vec<Message>,
        total_tokens: &mut TokenUsage,
    ) -> Result<String> {
        for _ in 0..self.config.max_iterations {
            let request = self.build_request(transcript.clone(), true);
            let response = RetryExecutor::new(self.retry.clone())
                .execute(|| self.provider.complete(request.clone()))
                .await?;

            if let Some(usage) = &response.usage {
                total_tokens.input_tokens += usage.prompt_tokens as u64;
                total_tokens.output_tokens += usage.completion_tokens as u64;
            }

            let choice = response.choices.into_iter().next().ok_or_else(|| {
                AgentError::Provider(AiError::MalformedResponse {
                    message: "no choices in response".to_string(),
                })
            })?;
            let message = choice.message;
            transcript.push(message.clone());

            match message.tool_calls {
                Some(tool_calls) if !tool_calls.is_empty() => {
                    for tool_call in &tool_calls {
                        let result = self.execute_tool(tool_call).await?;
                        transcript.push(Message::tool_result(&tool_call.id, result));
                    }
                }
                _ => {
                    return message.content.ok_or_else(|| {
                        AgentError::Provider(AiError::MalformedResponse {
                            message: "assistant turn had neither text nor tool calls"
                                .to_string(),
                        })
                    });
                }
            }
        }

        Err(AgentError::Config(format!(
            "maximum iterations ({}) reached",
            self.config.max_iterations
        )))
    }

    async fn execute_tool(&self, tool_call: &ToolCall) -> Result<String> {
        let start_time = Instant::now();
        let tool_name = &tool_call.function.name;

        let executor = self
            .tools
            .get_executor(tool_name)
            .ok_or_else(|| AgentError::Tool(format!("tool '{}' not found", tool_name)))?;

        let result = executor
            .execute(&tool_call.function.arguments)
            .await
            .map_err(|e| AgentError::Tool(e.to_string()))?;

        let success = matches!(result, ToolResult::Success(_));
        if let Some(metrics) = &self.metrics {
            metrics.record_tool_execution(
                &self.agent_id,
                tool_name,
                success,
                start_time.elapsed(),
            );
        }

        match result {
            ToolResult::Success(value) => match value {
                Value::String(s) => Ok(s),
                other => serde_json::to_string(&other)
                    .map_err(|e| AgentError::Tool(e.to_string())),
            },
            ToolResult::Error(error) => Err(AgentError::Tool(error)),
        }
    }

    /// One extra completion restating the final answer as JSON matching
    /// the schema. The exchange is not persisted to the thread.
    async fn coerce_structured(
        &self,
        transcript: &[Message],
        schema: &JsonSchema,
    ) -> Result<Value> {
        let instruction = format!(
            "Restate your final answer as a single JSON object matching this schema, \
             with no other text:\n{}",
            serde_json::to_string_pretty(&schema.schema)
                .map_err(|e| AgentError::StructuredDecode(e.to_string()))?
        );

        let mut messages = transcript.to_vec();
        messages.push(Message::user(instruction));

        let mut request = self.build_request(messages, false);
        request.response_format = Some(ResponseFormat {
            r#type: ResponseFormatType::JsonObject,
        });

        let response = RetryExecutor::new(self.retry.clone())
            .execute(|| self.provider.complete(request.clone()))
            .await?;

        let text = response.first_text().ok_or_else(|| {
            AgentError::StructuredDecode("structured restatement had no text".to_string())
        })?;

        parse_json_reply(text).map_err(AgentError::StructuredDecode)
    }

    fn build_request(&self, mut messages: Vec<Message>, with_tools: bool) -> CompletionRequest {
        if let Some(prompt) = &self.system_prompt {
            if !messages.iter().any(|m| m.role == Role::System) {
                messages.insert(0, Message::system(prompt));
            }
        }

        let model = self
            .config
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string());

        let tools = if with_tools && !self.tools.is_empty() {
            Some(self.tools.to_tools())
        } else {
            None
        };
        let tool_choice = tools
            .is_some()
            .then(|| ToolChoice::String("auto".to_string()));

        CompletionRequest {
            model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: Some(false),
            top_p: self.config.top_p,
            stop: None,
            tools,
            tool_choice,
            response_format: None,
        }
    }

    async fn restore_transcript(&self, config: &RunConfig) -> Result<Vec<Message>> {
        if let (Some(checkpointer), Some(thread_id)) =
            (&self.checkpointer, config.thread_id.as_deref())
        {
            if let Some(transcript) = checkpointer.get(thread_id).await? {
                return Ok(transcript);
            }
        }
        Ok(Vec::new())
    }

    async fn persist_transcript(
        &self,
        config: &RunConfig,
        transcript: &[Message],
    ) -> Result<()> {
        if let (Some(checkpointer), Some(thread_id)) =
            (&self.checkpointer, config.thread_id.as_deref())
        {
            checkpointer.put(thread_id, transcript).await?;
        }
        Ok(())
    }
}

/// Parses a JSON object out of a model reply, tolerating code fences.
fn parse_json_reply(text: &str) -> std::result::Result<Value, String> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).map_err(|e| e.to_string())
}
