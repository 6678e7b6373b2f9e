//! Run tracing.
//!
//! Every run builds a trace: a flat list of nested spans covering agent
//! turns, model generations, tool executions, guardrail checks, and
//! handoffs. Structured log events go through the `tracing` crate as they
//! happen; the collected spans are handed to a [`TraceExporter`] when the
//! run finishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::Result;
use crate::usage::Usage;

pub type TraceId = String;
pub type SpanId = String;

pub fn gen_trace_id() -> TraceId {
    Uuid::new_v4().to_string()
}

/// The unit of work a span covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SpanKind {
    /// One agent holding the conversation, from activation to final output
    /// or handoff.
    Agent { agent_name: String },
    /// A single model call.
    Generation {
        model: String,
        prompt_tokens: usize,
        completion_tokens: usize,
    },
    /// A single tool execution.
    Tool {
        tool_name: String,
        arguments: serde_json::Value,
    },
    /// A guardrail check. `stage` is "input" or "output".
    Guardrail {
        guardrail_name: String,
        stage: String,
        tripped: bool,
    },
    /// Control transferred between agents.
    Handoff { from_agent: String, to_agent: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub id: SpanId,
    pub trace_id: TraceId,
    pub parent_id: Option<SpanId>,
    pub kind: SpanKind,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Span {
    fn new(trace_id: TraceId, parent_id: Option<SpanId>, kind: SpanKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trace_id,
            parent_id,
            kind,
            start_time: Utc::now(),
            end_time: None,
            error: None,
        }
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds())
    }
}

/// Collects the spans of one run. Shared behind `Arc<Mutex<..>>` between the
/// runner and its span guards.
pub struct RunTrace {
    trace_id: TraceId,
    current_span_id: Option<SpanId>,
    spans: Vec<Span>,
}

impl RunTrace {
    pub fn new() -> Self {
        let trace_id = gen_trace_id();
        info!(trace_id = %trace_id, "starting trace");
        Self {
            trace_id,
            current_span_id: None,
            spans: Vec::new(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub(crate) fn current_span(&self) -> Option<SpanId> {
        self.current_span_id.clone()
    }

    fn start(&mut self, kind: SpanKind) -> SpanId {
        let span_id = self.start_under(self.current_span_id.clone(), kind);
        self.current_span_id = Some(span_id.clone());
        span_id
    }

    /// Start a span under an explicit parent without making it the current
    /// span. Concurrent siblings use this so their parent does not depend
    /// on start order.
    fn start_under(&mut self, parent_id: Option<SpanId>, kind: SpanKind) -> SpanId {
        let span = Span::new(self.trace_id.clone(), parent_id, kind);
        let span_id = span.id.clone();
        debug!(span_id = %span_id, kind = ?span.kind, "span started");
        self.spans.push(span);
        span_id
    }

    fn end(&mut self, span_id: &str, error: Option<String>) {
        if let Some(span) = self.spans.iter_mut().find(|s| s.id == span_id) {
            span.end_time = Some(Utc::now());
            if let Some(err) = error {
                error!(span_id = %span_id, error = %err, "span failed");
                span.error = Some(err);
            } else if let Some(duration) = span.duration_ms() {
                debug!(span_id = %span_id, duration_ms = duration, "span completed");
            }
            if self.current_span_id.as_deref() == Some(span_id) {
                self.current_span_id = span.parent_id.clone();
            }
        }
    }
}

impl Default for RunTrace {
    fn default() -> Self {
        Self::new()
    }
}

/// Ends its span when consumed. Nested guards produce nested spans because
/// the trace tracks the current active span.
pub struct SpanGuard {
    trace: Arc<Mutex<RunTrace>>,
    span_id: SpanId,
}

impl SpanGuard {
    pub fn enter(trace: Arc<Mutex<RunTrace>>, kind: SpanKind) -> Self {
        let span_id = trace.lock().unwrap().start(kind);
        Self { trace, span_id }
    }

    /// Enter a span as a child of `parent_id` without touching the current
    /// span, so concurrently entered guards all attach to the same parent.
    pub fn enter_under(
        trace: Arc<Mutex<RunTrace>>,
        parent_id: Option<SpanId>,
        kind: SpanKind,
    ) -> Self {
        let span_id = trace.lock().unwrap().start_under(parent_id, kind);
        Self { trace, span_id }
    }

    pub fn complete(self) {
        self.trace.lock().unwrap().end(&self.span_id, None);
    }

    pub fn fail(self, error: impl Into<String>) {
        self.trace.lock().unwrap().end(&self.span_id, Some(error.into()));
    }

    /// Record token usage on a generation span, then complete it.
    pub fn complete_generation(self, usage: &Usage) {
        {
            let mut trace = self.trace.lock().unwrap();
            if let Some(span) = trace.spans.iter_mut().find(|s| s.id == self.span_id) {
                if let SpanKind::Generation {
                    prompt_tokens,
                    completion_tokens,
                    ..
                } = &mut span.kind
                {
                    *prompt_tokens = usage.prompt_tokens;
                    *completion_tokens = usage.completion_tokens;
                }
            }
        }
        self.complete();
    }
}

/// Exports a finished trace to an external system.
pub trait TraceExporter: Send + Sync {
    fn export(&self, trace_id: &str, spans: Vec<Span>) -> Result<()>;
}

/// Prints the trace to stdout. Debugging aid.
pub struct ConsoleExporter;

impl TraceExporter for ConsoleExporter {
    fn export(&self, trace_id: &str, spans: Vec<Span>) -> Result<()> {
        println!("=== trace {trace_id} ===");
        for span in spans {
            println!(
                "  [{:?}] {} -> {} ({}ms)",
                span.kind,
                span.start_time.format("%H:%M:%S%.3f"),
                span.end_time
                    .map(|t| t.format("%H:%M:%S%.3f").to_string())
                    .unwrap_or_else(|| "ongoing".to_string()),
                span.duration_ms().unwrap_or(0)
            );
            if let Some(error) = &span.error {
                println!("    ERROR: {error}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trace_ids_unique() {
        assert_ne!(gen_trace_id(), gen_trace_id());
    }

    #[test]
    fn test_nested_spans_track_parent() {
        let mut trace = RunTrace::new();
        let agent = trace.start(SpanKind::Agent {
            agent_name: "Triage".to_string(),
        });
        let tool = trace.start(SpanKind::Tool {
            tool_name: "lookup".to_string(),
            arguments: json!({}),
        });

        assert_eq!(trace.spans().len(), 2);
        assert_eq!(trace.spans()[1].parent_id, Some(agent.clone()));

        trace.end(&tool, None);
        assert_eq!(trace.current_span_id, Some(agent.clone()));
        trace.end(&agent, None);
        assert_eq!(trace.current_span_id, None);
    }

    #[test]
    fn test_sibling_spans_share_parent() {
        let trace = Arc::new(Mutex::new(RunTrace::new()));
        let agent = SpanGuard::enter(
            trace.clone(),
            SpanKind::Agent {
                agent_name: "Worker".to_string(),
            },
        );
        let parent = trace.lock().unwrap().current_span();

        let first = SpanGuard::enter_under(
            trace.clone(),
            parent.clone(),
            SpanKind::Tool {
                tool_name: "a".to_string(),
                arguments: json!({}),
            },
        );
        let second = SpanGuard::enter_under(
            trace.clone(),
            parent.clone(),
            SpanKind::Tool {
                tool_name: "b".to_string(),
                arguments: json!({}),
            },
        );
        second.complete();
        first.complete();
        agent.complete();

        let trace = trace.lock().unwrap();
        assert_eq!(trace.spans()[1].parent_id, parent);
        assert_eq!(trace.spans()[2].parent_id, parent);
        assert_eq!(trace.current_span_id, None);
    }

    #[test]
    fn test_guard_records_failure() {
        let trace = Arc::new(Mutex::new(RunTrace::new()));
        let guard = SpanGuard::enter(
            trace.clone(),
            SpanKind::Tool {
                tool_name: "fragile".to_string(),
                arguments: json!({}),
            },
        );
        guard.fail("timed out");

        let trace = trace.lock().unwrap();
        assert_eq!(trace.spans()[0].error.as_deref(), Some("timed out"));
        assert!(trace.spans()[0].end_time.is_some());
    }

    #[test]
    fn test_generation_span_records_usage() {
        let trace = Arc::new(Mutex::new(RunTrace::new()));
        let guard = SpanGuard::enter(
            trace.clone(),
            SpanKind::Generation {
                model: "gpt-4o".to_string(),
                prompt_tokens: 0,
                completion_tokens: 0,
            },
        );
        guard.complete_generation(&Usage::new(100, 50));

        let trace = trace.lock().unwrap();
        match &trace.spans()[0].kind {
            SpanKind::Generation {
                prompt_tokens,
                completion_tokens,
                ..
            } => {
                assert_eq!(*prompt_tokens, 100);
                assert_eq!(*completion_tokens, 50);
            }
            other => panic!("expected generation span, got {other:?}"),
        }
    }

    #[test]
    fn test_console_exporter() {
        let mut trace = RunTrace::new();
        let id = trace.start(SpanKind::Handoff {
            from_agent: "Triage".to_string(),
            to_agent: "Spanish agent".to_string(),
        });
        trace.end(&id, None);
        assert!(ConsoleExporter
            .export(trace.trace_id(), trace.spans().to_vec())
            .is_ok());
    }
}
