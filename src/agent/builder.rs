use std::sync::Arc;

use crate::checkpoint::Checkpointer;
use crate::error::RetryConfig;
use crate::models::JsonSchema;
use crate::observability::{AgentTracer, MetricsCollector};
use crate::providers::init_chat_model;
use crate::traits::CompletionProvider;

use super::agent::{AgentError, ReactAgent, ReactAgentConfig, Result};
use super::structured::SchemaProvider;
use super::tools::{ToolExecutor, ToolRegistry};

/// Builder for [`ReactAgent`]. Bundles a model, tools, a checkpointer, and
/// an optional response schema into one invokable agent.
pub struct ReactAgentBuilder {
    provider: Option<Arc<dyn CompletionProvider>>,
    model_spec: Option<String>,
    system_prompt: Option<String>,
    tools: ToolRegistry,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    response_schema: Option<JsonSchema>,
    config: ReactAgentConfig,
    retry: RetryConfig,
    metrics: Option<Arc<MetricsCollector>>,
    tracer: Option<Arc<AgentTracer>>,
}

impl ReactAgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            model_spec: None,
            system_prompt: None,
            tools: ToolRegistry::new(),
            checkpointer: None,
            response_schema: None,
            config: ReactAgentConfig::default(),
            retry: RetryConfig::default(),
            metrics: None,
            tracer: None,
        }
    }

    /// Resolve the provider from a `provider:model` spec at build time,
    /// e.g. `anthropic:claude-3-7-sonnet-latest`.
    pub fn model_spec(mut self, spec: impl Into<String>) -> Self {
        self.model_spec = Some(spec.into());
        self
    }

    /// Use an explicit provider instead of a model spec.
    pub fn provider<P: CompletionProvider + 'static>(mut self, provider: P) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    pub fn provider_arc(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Model name to request, when the provider was given explicitly.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.config.top_p = Some(top_p);
        self
    }

    /// Cap on completion/tool-dispatch rounds per invocation.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn tool<E: ToolExecutor + 'static>(mut self, executor: E) -> Self {
        self.tools.register(executor);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn checkpointer<C: Checkpointer + 'static>(mut self, checkpointer: C) -> Self {
        self.checkpointer = Some(Arc::new(checkpointer));
        self
    }

    pub fn checkpointer_arc(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Coerce each final answer into `T`'s schema.
    pub fn response_format<T: SchemaProvider>(mut self) -> Self {
        self.response_schema = Some(T::schema());
        self
    }

    pub fn response_schema(mut self, schema: JsonSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn tracer(mut self, tracer: Arc<AgentTracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn build(self) -> Result<ReactAgent> {
        let mut config = self.config;

        let provider = match (self.provider, self.model_spec) {
            (Some(provider), None) => provider,
            (None, Some(spec)) => {
                let (provider, model) = init_chat_model(&spec)?;
                if config.model.is_none() {
                    config.model = Some(model);
                }
                provider
            }
            (Some(provider), Some(_)) => {
                // An explicit provider wins; the spec's model half would be
                // ambiguous, so reject the combination outright.
                let _ = provider;
                return Err(AgentError::Config(
                    "give either a provider or a model spec, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(AgentError::Config(
                    "a provider or model spec is required".to_string(),
                ))
            }
        };

        Ok(ReactAgent::new(
            provider,
            self.system_prompt,
            self.tools,
            self.checkpointer,
            self.response_schema,
            config,
            self.retry,
            self.metrics,
            self.tracer,
        ))
    }
}

impl Default for ReactAgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
