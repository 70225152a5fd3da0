pub mod metrics;
pub mod tracing;

pub use metrics::{AgentMetrics, MetricsCollector, TokenUsage, ToolMetrics};
pub use tracing::{AgentTracer, TraceEvent, TraceSpan, TraceStatus};
