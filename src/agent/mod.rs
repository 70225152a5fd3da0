pub mod agent;
pub mod builder;
pub mod structured;
pub mod tools;

pub use agent::{AgentError, AgentReply, ReactAgent, ReactAgentConfig, RunConfig};
pub use builder::ReactAgentBuilder;
pub use structured::{SchemaProvider, StructuredOutput};
pub use tools::{FunctionTool, ToolExecutor, ToolRegistry, ToolResult, WeatherTool};
