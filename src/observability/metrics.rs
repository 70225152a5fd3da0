use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Per-agent request and tool counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub agent_id: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_tokens: TokenUsage,
    pub average_response_time: Duration,
    pub tool_usage: HashMap<String, ToolMetrics>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetrics {
    pub tool_name: String,
    pub executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub total_duration: Duration,
}

/// Thread-safe metrics collector shared across agents.
pub struct MetricsCollector {
    metrics: Arc<RwLock<HashMap<String, AgentMetrics>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn record_request(
        &self,
        agent_id: &str,
        success: bool,
        duration: Duration,
        tokens: TokenUsage,
    ) {
        let mut metrics = match self.metrics.write() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        let entry = metrics
            .entry(agent_id.to_string())
            .or_insert_with(|| AgentMetrics {
                agent_id: agent_id.to_string(),
                total_requests: 0,
                successful_requests: 0,
                failed_requests: 0,
                total_tokens: TokenUsage::new(),
                average_response_time: Duration::ZERO,
                tool_usage: HashMap::new(),
                last_updated: Utc::now(),
            });

        // Running average over all requests so far.
        let total_time = entry.average_response_time * entry.total_requests as u32 + duration;
        entry.total_requests += 1;
        entry.average_response_time = total_time / entry.total_requests as u32;

        if success {
            entry.successful_requests += 1;
        } else {
            entry.failed_requests += 1;
        }
        entry.total_tokens.add(&tokens);
        entry.last_updated = Utc::now();
    }

    pub fn record_tool_execution(
        &self,
        agent_id: &str,
        tool_name: &str,
        success: bool,
        duration: Duration,
    ) {
        let mut metrics = match self.metrics.write() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        let Some(agent) = metrics.get_mut(agent_id) else {
            return;
        };

        let tool = agent
            .tool_usage
            .entry(tool_name.to_string())
            .or_insert_with(|| ToolMetrics {
                tool_name: tool_name.to_string(),
                executions: 0,
                successful_executions: 0,
                failed_executions: 0,
                total_duration: Duration::ZERO,
            });

        tool.executions += 1;
        if success {
            tool.successful_executions += 1;
        } else {
            tool.failed_executions += 1;
        }
        tool.total_duration += duration;
    }

    pub fn get_agent_metrics(&self, agent_id: &str) -> Option<AgentMetrics> {
        self.metrics.read().ok()?.get(agent_id).cloned()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
