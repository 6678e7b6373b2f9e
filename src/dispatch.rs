//! Turn dispatch: deciding what a model response means and executing the
//! tool calls it carries.
//!
//! A response resolves to exactly one of three steps: final output, a
//! handoff, or a batch of tool calls. Handoffs take precedence over plain
//! tool calls in the same response; the remaining calls are acknowledged but
//! never executed, since the conversation moves to the target agent.

use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::agent::{Agent, ToolUseBehavior};
use crate::context::RunContext;
use crate::error::{AgentsError, Result};
use crate::handoff::Handoff;
use crate::items::{Message, ModelResponse, RunItem, ToolCall};
use crate::trace::{RunTrace, SpanGuard, SpanKind};

/// What the run loop does next, derived from one model response.
pub(crate) enum NextStep<C: Send + Sync + 'static> {
    /// The model produced final content; the value is already validated
    /// against the agent's output schema when one is set.
    Final(Value),
    /// The model called a handoff tool. Any other calls in the same response
    /// are skipped.
    Handoff {
        handoff: Handoff<C>,
        call: ToolCall,
        skipped: Vec<ToolCall>,
    },
    /// Ordinary tool calls to execute this turn.
    Tools(Vec<ToolCall>),
}

// Manual impl: `Handoff` holds non-`Debug` trait objects, so the derive
// doesn't apply.
impl<C: Send + Sync + 'static> std::fmt::Debug for NextStep<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NextStep::Final(v) => f.debug_tuple("Final").field(v).finish(),
            NextStep::Handoff { call, skipped, .. } => f
                .debug_struct("Handoff")
                .field("call", call)
                .field("skipped", skipped)
                .finish_non_exhaustive(),
            NextStep::Tools(calls) => f.debug_tuple("Tools").field(calls).finish(),
        }
    }
}

/// Classify a model response into its next step.
///
/// A call naming neither a tool nor a handoff of the active agent is a model
/// fault and aborts the run, as is a response carrying neither content nor
/// calls, or final content that fails the agent's output schema.
pub(crate) fn classify<C: Send + Sync + 'static>(
    agent: &Agent<C>,
    response: &ModelResponse,
) -> Result<NextStep<C>> {
    if response.has_tool_calls() {
        // First handoff call wins; everything else in the response is
        // skipped.
        for (idx, call) in response.tool_calls.iter().enumerate() {
            if let Some(handoff) = agent.find_handoff(&call.name) {
                let skipped = response
                    .tool_calls
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != idx)
                    .map(|(_, c)| c.clone())
                    .collect();
                return Ok(NextStep::Handoff {
                    handoff: handoff.clone(),
                    call: call.clone(),
                    skipped,
                });
            }
        }

        for call in &response.tool_calls {
            if agent.find_tool(&call.name).is_none() {
                return Err(AgentsError::model_behavior(format!(
                    "model called unknown tool '{}' on agent '{}'",
                    call.name,
                    agent.name()
                )));
            }
        }

        return Ok(NextStep::Tools(response.tool_calls.clone()));
    }

    if let Some(content) = response.content.as_deref().filter(|c| !c.is_empty()) {
        let output = match agent.output_schema() {
            Some(_) => serde_json::from_str(content).map_err(|e| {
                AgentsError::model_behavior(format!("final output is not valid JSON: {e}"))
            })?,
            None => Value::String(content.to_string()),
        };
        return Ok(NextStep::Final(output));
    }

    Err(AgentsError::model_behavior(
        "model response carried neither content nor tool calls",
    ))
}

/// Result of executing one turn's tool calls.
#[derive(Debug)]
pub(crate) struct DispatchOutcome {
    /// Generated items, call then output, in request order.
    pub items: Vec<RunItem>,
    /// Tool messages for the conversation, one per executed call.
    pub messages: Vec<Message>,
    /// Set when a tool ended the run, either through `is_final` or the
    /// agent's stop-on-first-tool behavior.
    pub final_output: Option<Value>,
}

struct PerCall {
    call_item: RunItem,
    output_item: RunItem,
    message: Message,
    final_output: Option<Value>,
}

/// Execute tool calls, up to `max_concurrency` at a time. Results are
/// appended in request order regardless of completion order.
pub(crate) async fn execute_tool_calls<C: Send + Sync + 'static>(
    agent: &Agent<C>,
    ctx: &RunContext<C>,
    mut calls: Vec<ToolCall>,
    max_concurrency: usize,
    trace: Option<&Arc<std::sync::Mutex<RunTrace>>>,
) -> Result<DispatchOutcome> {
    let stop_on_first = agent.tool_use_behavior() == ToolUseBehavior::StopOnFirstTool;
    if stop_on_first {
        calls.truncate(1);
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    // All of this turn's tool spans share one parent; letting each span
    // become "current" would parent concurrent siblings to each other.
    let parent_span = trace.and_then(|t| t.lock().unwrap().current_span());
    let futures = calls.into_iter().map(|call| {
        let semaphore = semaphore.clone();
        let parent_span = parent_span.clone();
        async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|e| AgentsError::Other(e.to_string()))?;
            let span = trace.map(|t| {
                SpanGuard::enter_under(
                    t.clone(),
                    parent_span.clone(),
                    SpanKind::Tool {
                        tool_name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                )
            });
            let result = run_one(agent, ctx, call, stop_on_first).await;
            if let Some(span) = span {
                match &result {
                    Ok(_) => span.complete(),
                    Err(err) => span.fail(err.to_string()),
                }
            }
            result
        }
    });

    let mut outcome = DispatchOutcome {
        items: Vec::new(),
        messages: Vec::new(),
        final_output: None,
    };
    for result in join_all(futures).await {
        let per_call = result?;
        outcome.items.push(per_call.call_item);
        outcome.items.push(per_call.output_item);
        outcome.messages.push(per_call.message);
        if outcome.final_output.is_none() {
            outcome.final_output = per_call.final_output;
        }
    }
    Ok(outcome)
}

async fn run_one<C: Send + Sync + 'static>(
    agent: &Agent<C>,
    ctx: &RunContext<C>,
    call: ToolCall,
    stop_on_first: bool,
) -> Result<PerCall> {
    // Presence was checked during classification.
    let tool = agent.find_tool(&call.name).ok_or_else(|| {
        AgentsError::model_behavior(format!("model called unknown tool '{}'", call.name))
    })?;

    let call_item = RunItem::tool_call(&call);

    // Hosted tools run on the provider's side; the dispatcher only records
    // their appearance and acknowledges the call id.
    if tool.is_hosted() {
        debug!(tool = %call.name, call_id = %call.id, "hosted tool call recorded");
        let note = json!({"status": "executed by the model provider"});
        return Ok(PerCall {
            output_item: RunItem::tool_output(&call.id, note.clone(), None),
            message: Message::tool(note.to_string(), &call.id),
            call_item,
            final_output: None,
        });
    }

    debug!(tool = %call.name, call_id = %call.id, "dispatching tool call");

    match tool.execute(ctx, call.arguments.clone()).await {
        Ok(result) => {
            let content = match &result.output {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let final_output = if result.is_final || stop_on_first {
                Some(result.output.clone())
            } else {
                None
            };
            Ok(PerCall {
                output_item: RunItem::tool_output(&call.id, result.output, None),
                message: Message::tool(content, &call.id),
                call_item,
                final_output,
            })
        }
        // A model fault surfaced by the tool (bad arguments) is terminal no
        // matter the failure policy.
        Err(err @ AgentsError::ModelBehaviorError { .. }) => Err(err),
        Err(err) => match tool.failure_policy() {
            crate::tool::ToolFailurePolicy::Raise => Err(AgentsError::ToolExecution {
                tool: call.name.clone(),
                message: err.to_string(),
            }),
            crate::tool::ToolFailurePolicy::ReportToModel => {
                warn!(tool = %call.name, error = %err, "tool failed; reporting to model");
                let error_text = err.to_string();
                let payload = json!({"error": error_text});
                Ok(PerCall {
                    output_item: RunItem::tool_output(&call.id, payload.clone(), Some(error_text)),
                    message: Message::tool(payload.to_string(), &call.id),
                    call_item,
                    final_output: None,
                })
            }
        },
    }
}
