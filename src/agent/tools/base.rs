use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Tool, ToolFunction, ToolType};

/// Result of a tool execution.
#[derive(Debug, Clone)]
pub enum ToolResult {
    Success(Value),
    Error(String),
}

/// Trait for implementing tool executors.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute the tool with JSON-encoded arguments.
    async fn execute(&self, arguments: &str) -> Result<ToolResult, Box<dyn std::error::Error>>;

    /// Get the tool definition advertised to the model.
    fn definition(&self) -> ToolFunction;
}

/// Registry for the tools an agent may call.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool under its declared name.
    pub fn register<E: ToolExecutor + 'static>(&mut self, executor: E) {
        let name = executor.definition().name;
        self.tools.insert(name, Arc::new(executor));
    }

    pub fn get_executor(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.tools.get(name).cloned()
    }

    /// Convert to a vector of Tool definitions for API calls.
    pub fn to_tools(&self) -> Vec<Tool> {
        self.tools
            .values()
            .map(|executor| Tool {
                r#type: ToolType::Function,
                function: executor.definition(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapter turning a plain closure into a tool.
pub struct FunctionTool<F> {
    name: String,
    description: String,
    parameters: Value,
    func: F,
}

impl<F> FunctionTool<F>
where
    F: Fn(&str) -> Result<Value, Box<dyn std::error::Error>> + Send + Sync,
{
    pub fn new(name: String, description: String, parameters: Value, func: F) -> Self {
        Self {
            name,
            description,
            parameters,
            func,
        }
    }
}

#[async_trait]
impl<F> ToolExecutor for FunctionTool<F>
where
    F: Fn(&str) -> Result<Value, Box<dyn std::error::Error>> + Send + Sync,
{
    async fn execute(&self, arguments: &str) -> Result<ToolResult, Box<dyn std::error::Error>> {
        match (self.func)(arguments) {
            Ok(result) => Ok(ToolResult::Success(result)),
            Err(e) => Ok(ToolResult::Error(e.to_string())),
        }
    }

    fn definition(&self) -> ToolFunction {
        ToolFunction {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            parameters: self.parameters.clone(),
        }
    }
}
