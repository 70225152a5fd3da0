use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// One finished span in an agent trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub trace_id: String,
    pub span_id: String,
    pub operation_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub status: TraceStatus,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceStatus {
    Ok,
    Error,
}

/// Active span; finishing it records the event on the tracer.
pub struct TraceSpan {
    event: TraceEvent,
    start_instant: Instant,
    tracer: Arc<AgentTracer>,
}

impl TraceSpan {
    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.event.tags.insert(key.into(), value.into());
    }

    pub fn set_status(&mut self, status: TraceStatus) {
        self.event.status = status;
    }

    pub fn finish(mut self) {
        self.event.end_time = Some(Utc::now());
        self.event.duration = Some(self.start_instant.elapsed());
        self.tracer.record(self.event);
    }
}

/// Collects spans per trace id, in memory.
pub struct AgentTracer {
    traces: RwLock<HashMap<String, Vec<TraceEvent>>>,
}

impl AgentTracer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            traces: RwLock::new(HashMap::new()),
        })
    }

    pub fn start_span(self: &Arc<Self>, operation_name: impl Into<String>) -> TraceSpan {
        let trace_id = Uuid::new_v4().to_string();
        TraceSpan {
            event: TraceEvent {
                trace_id,
                span_id: Uuid::new_v4().to_string(),
                operation_name: operation_name.into(),
                start_time: Utc::now(),
                end_time: None,
                duration: None,
                status: TraceStatus::Ok,
                tags: HashMap::new(),
            },
            start_instant: Instant::now(),
            tracer: self.clone(),
        }
    }

    pub fn get_trace(&self, trace_id: &str) -> Option<Vec<TraceEvent>> {
        self.traces.read().ok()?.get(trace_id).cloned()
    }

    pub fn all_spans(&self) -> Vec<TraceEvent> {
        self.traces
            .read()
            .map(|traces| traces.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut traces) = self.traces.write() {
            traces.clear();
        }
    }

    fn record(&self, event: TraceEvent) {
        if let Ok(mut traces) = self.traces.write() {
            traces.entry(event.trace_id.clone()).or_default().push(event);
        }
    }
}
