//! The run loop.
//!
//! [`Runner`] drives an agent until it produces a final output or the run
//! aborts. One turn is one model call plus whatever that call asked for:
//! executing tool calls, or resolving a handoff and switching the active
//! agent. Turns are counted across handoffs against a single budget.
//!
//! Input guardrails run once, before the first model call, against the
//! starting agent. Output guardrails run once, against the agent that
//! produced the final output. A forced tool choice is reset to auto after
//! the turn it forced, so the model is not trapped calling tools forever.

use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::agent::{Agent, ToolChoice};
use crate::context::RunContext;
use crate::dispatch::{self, NextStep};
use crate::error::{AgentsError, Result};
use crate::guardrail::{GuardrailEvaluator, GuardrailResult};
use crate::handoff::HandoffInputData;
use crate::items::{Message, Role, RunItem};
use crate::memory::Session;
use crate::model::{ModelProvider, ModelRequest};
use crate::result::RunResult;
use crate::tool::ToolSchema;
use crate::trace::{RunTrace, SpanGuard, SpanKind, TraceExporter};
use crate::usage::UsageStats;

pub const DEFAULT_MAX_TURNS: usize = 10;
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// What a run starts from: a plain user utterance, or a pre-built message
/// list (typically [`RunResult::to_input_list`] from an earlier run).
#[derive(Debug, Clone)]
pub enum RunInput {
    Text(String),
    Messages(Vec<Message>),
}

impl RunInput {
    fn into_messages(self) -> Vec<Message> {
        match self {
            RunInput::Text(text) => vec![Message::user(text)],
            RunInput::Messages(messages) => messages,
        }
    }
}

impl From<String> for RunInput {
    fn from(text: String) -> Self {
        RunInput::Text(text)
    }
}

impl From<&str> for RunInput {
    fn from(text: &str) -> Self {
        RunInput::Text(text.to_string())
    }
}

impl From<Vec<Message>> for RunInput {
    fn from(messages: Vec<Message>) -> Self {
        RunInput::Messages(messages)
    }
}

/// Per-run settings. The context travels here; everything else is optional.
pub struct RunConfig<C: Send + Sync + 'static = ()> {
    pub context: RunContext<C>,
    /// Turn budget across the whole run, handoffs included. `None` removes
    /// the budget entirely.
    pub max_turns: Option<usize>,
    /// Upper bound on tools executing concurrently within one turn.
    pub max_concurrency: usize,
    /// Overrides every agent's model for this run.
    pub model_override: Option<String>,
    pub session: Option<Arc<dyn Session>>,
    pub trace_exporter: Option<Arc<dyn TraceExporter>>,
}

impl<C: Send + Sync + 'static> RunConfig<C> {
    pub fn new(context: RunContext<C>) -> Self {
        Self {
            context,
            max_turns: Some(DEFAULT_MAX_TURNS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            model_override: None,
            session: None,
            trace_exporter: None,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn with_unlimited_turns(mut self) -> Self {
        self.max_turns = None;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    pub fn with_session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_trace_exporter(mut self, exporter: Arc<dyn TraceExporter>) -> Self {
        self.trace_exporter = Some(exporter);
        self
    }
}

impl Default for RunConfig<()> {
    fn default() -> Self {
        Self::new(RunContext::default())
    }
}

impl<C: Send + Sync + 'static> Clone for RunConfig<C> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            max_turns: self.max_turns,
            max_concurrency: self.max_concurrency,
            model_override: self.model_override.clone(),
            session: self.session.clone(),
            trace_exporter: self.trace_exporter.clone(),
        }
    }
}

/// Events emitted during a streamed run, in generation order.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// An item was generated.
    RunItem(RunItem),
    /// A handoff switched the active agent.
    AgentUpdated { agent_name: String },
    /// The run finished; carries the full result. Always the last event on
    /// success.
    RunCompleted(Box<RunResult>),
    /// The run failed. Always the last event on failure.
    Error { message: String },
}

/// Receiving side of a streamed run. The run itself executes on a spawned
/// task; dropping the stream does not cancel it, but nobody will hear it.
pub struct RunStream {
    receiver: mpsc::UnboundedReceiver<StreamEvent>,
}

impl RunStream {
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }

    /// Drain the stream into a vector. Test helper, mostly.
    pub async fn collect_events(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.receiver.recv().await {
            events.push(event);
        }
        events
    }

    /// Adapt into a [`tokio_stream`] wrapper for combinator-heavy consumers.
    pub fn into_stream(self) -> tokio_stream::wrappers::UnboundedReceiverStream<StreamEvent> {
        tokio_stream::wrappers::UnboundedReceiverStream::new(self.receiver)
    }
}

impl futures::Stream for RunStream {
    type Item = StreamEvent;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<StreamEvent>> {
        self.receiver.poll_recv(cx)
    }
}

fn emit(events: Option<&mpsc::UnboundedSender<StreamEvent>>, event: StreamEvent) {
    if let Some(tx) = events {
        // A dropped receiver just means nobody is listening anymore.
        let _ = tx.send(event);
    }
}

pub struct Runner;

impl Runner {
    /// Run an agent to completion.
    pub async fn run<C: Send + Sync + 'static>(
        provider: Arc<dyn ModelProvider>,
        agent: Arc<Agent<C>>,
        input: impl Into<RunInput>,
        config: RunConfig<C>,
    ) -> Result<RunResult> {
        Self::run_inner(provider, agent, input.into(), config, None).await
    }

    /// Blocking variant for synchronous callers. Builds a current-thread
    /// runtime; do not call from inside an async context.
    pub fn run_sync<C: Send + Sync + 'static>(
        provider: Arc<dyn ModelProvider>,
        agent: Arc<Agent<C>>,
        input: impl Into<RunInput>,
        config: RunConfig<C>,
    ) -> Result<RunResult> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(Self::run(provider, agent, input, config))
    }

    /// Run on a spawned task, emitting [`StreamEvent`]s as the run
    /// progresses. The producer never blocks on the consumer.
    pub fn run_stream<C: Send + Sync + 'static>(
        provider: Arc<dyn ModelProvider>,
        agent: Arc<Agent<C>>,
        input: impl Into<RunInput>,
        config: RunConfig<C>,
    ) -> RunStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let input = input.into();
        tokio::spawn(async move {
            let _ = Self::run_inner(provider, agent, input, config, Some(tx)).await;
        });
        RunStream { receiver: rx }
    }

    async fn run_inner<C: Send + Sync + 'static>(
        provider: Arc<dyn ModelProvider>,
        agent: Arc<Agent<C>>,
        input: RunInput,
        config: RunConfig<C>,
        events: Option<mpsc::UnboundedSender<StreamEvent>>,
    ) -> Result<RunResult> {
        let trace = Arc::new(Mutex::new(RunTrace::new()));
        let outcome =
            Self::run_loop(provider, agent, input, &config, &trace, events.as_ref()).await;

        if let Some(exporter) = &config.trace_exporter {
            let (trace_id, spans) = {
                let t = trace.lock().unwrap();
                (t.trace_id().to_string(), t.spans().to_vec())
            };
            if let Err(e) = exporter.export(&trace_id, spans) {
                warn!(error = %e, "trace export failed");
            }
        }

        match &outcome {
            Ok(result) => emit(
                events.as_ref(),
                StreamEvent::RunCompleted(Box::new(result.clone())),
            ),
            Err(e) => emit(
                events.as_ref(),
                StreamEvent::Error {
                    message: e.to_string(),
                },
            ),
        }
        outcome
    }

    async fn run_loop<C: Send + Sync + 'static>(
        provider: Arc<dyn ModelProvider>,
        mut agent: Arc<Agent<C>>,
        input: RunInput,
        config: &RunConfig<C>,
        trace: &Arc<Mutex<RunTrace>>,
        events: Option<&mpsc::UnboundedSender<StreamEvent>>,
    ) -> Result<RunResult> {
        let ctx = config.context.clone();
        let new_input = input.into_messages();
        // What input guardrails see: the latest user utterance.
        let guarded_text = new_input
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let mut original_input = match &config.session {
            Some(session) => session.get_messages(None).await?,
            None => Vec::new(),
        };
        original_input.extend(new_input.iter().cloned());

        // Input guardrails belong to the starting agent and run before any
        // model call.
        let mut input_guardrail_results = Vec::new();
        for guard in agent.input_guardrails() {
            let span = SpanGuard::enter(
                trace.clone(),
                SpanKind::Guardrail {
                    guardrail_name: guard.name().to_string(),
                    stage: "input".to_string(),
                    tripped: false,
                },
            );
            match GuardrailEvaluator::check_input(
                std::slice::from_ref(guard),
                &ctx,
                &agent,
                &guarded_text,
            )
            .await
            {
                Ok(mut results) => {
                    span.complete();
                    input_guardrail_results.append(&mut results);
                }
                Err(e) => {
                    span.fail(e.to_string());
                    return Err(e);
                }
            }
        }

        // The system message is not part of the conversation; it is resolved
        // from the active agent's instructions before each model call.
        let mut conversation = original_input.clone();

        let mut items: Vec<RunItem> = Vec::new();
        let mut usage = UsageStats::new();
        let mut tool_choice = agent.settings().tool_choice.clone();
        let mut agent_span = Some(SpanGuard::enter(
            trace.clone(),
            SpanKind::Agent {
                agent_name: agent.name().to_string(),
            },
        ));

        info!(agent = %agent.name(), "run started");
        let mut turn: usize = 0;

        loop {
            turn += 1;
            if let Some(max) = config.max_turns {
                if turn > max {
                    warn!(max_turns = max, "turn budget exhausted");
                    return Err(AgentsError::MaxTurnsExceeded { max_turns: max });
                }
            }

            let mut tool_schemas: Vec<ToolSchema> = agent
                .tools()
                .iter()
                .map(|t| ToolSchema::from_tool(t.as_ref()))
                .collect();
            for handoff in agent.handoffs() {
                if handoff.is_enabled() {
                    tool_schemas.push(handoff.tool_schema());
                }
            }

            let model = config
                .model_override
                .clone()
                .unwrap_or_else(|| agent.model().to_string());
            let system = Message::system(agent.resolve_instructions(&ctx).await);
            let mut messages = Vec::with_capacity(conversation.len() + 1);
            messages.push(system);
            messages.extend(conversation.iter().cloned());

            let request = ModelRequest {
                model: model.clone(),
                messages,
                tools: tool_schemas,
                tool_choice: tool_choice.clone(),
                output_schema: agent.output_schema().cloned(),
                temperature: agent.settings().temperature,
                max_tokens: agent.settings().max_tokens,
            };

            let gen_span = SpanGuard::enter(
                trace.clone(),
                SpanKind::Generation {
                    model,
                    prompt_tokens: 0,
                    completion_tokens: 0,
                },
            );
            let response = match provider.complete(request).await {
                Ok((response, turn_usage)) => {
                    usage.record(agent.name(), turn_usage.clone());
                    gen_span.complete_generation(&turn_usage);
                    response
                }
                Err(e) => {
                    gen_span.fail(e.to_string());
                    return Err(e);
                }
            };

            if let Some(reasoning) = &response.reasoning {
                let item = RunItem::reasoning(reasoning);
                emit(events, StreamEvent::RunItem(item.clone()));
                items.push(item);
            }

            match dispatch::classify(&agent, &response)? {
                NextStep::Final(final_output) => {
                    if let Some(content) = response.content.as_deref().filter(|c| !c.is_empty()) {
                        let item = RunItem::message(Role::Assistant, content);
                        emit(events, StreamEvent::RunItem(item.clone()));
                        items.push(item);
                        conversation.push(Message::assistant(content));
                    }
                    return Self::finalize(
                        &agent,
                        &ctx,
                        trace,
                        config,
                        final_output,
                        items,
                        original_input,
                        new_input,
                        usage,
                        input_guardrail_results,
                        agent_span,
                    )
                    .await;
                }

                NextStep::Handoff {
                    handoff,
                    call,
                    skipped,
                } => {
                    conversation.push(Message::assistant_with_tool_calls(
                        response.content.clone().unwrap_or_default(),
                        response.tool_calls.clone(),
                    ));
                    let item = RunItem::handoff_call(&call);
                    emit(events, StreamEvent::RunItem(item.clone()));
                    items.push(item);

                    // Every call id in the response needs a tool message
                    // before the next model call.
                    conversation.push(Message::tool(
                        format!("Transferring to {}", handoff.agent().name()),
                        &call.id,
                    ));
                    for skipped_call in &skipped {
                        conversation.push(Message::tool(
                            "Skipped: control was transferred",
                            &skipped_call.id,
                        ));
                    }

                    handoff.invoke(&ctx, call.arguments.clone()).await?;

                    let from = agent.name().to_string();
                    let to = handoff.agent().name().to_string();
                    info!(from = %from, to = %to, "handoff");
                    SpanGuard::enter(
                        trace.clone(),
                        SpanKind::Handoff {
                            from_agent: from.clone(),
                            to_agent: to.clone(),
                        },
                    )
                    .complete();

                    let item = RunItem::handoff_output(&from, &to);
                    emit(events, StreamEvent::RunItem(item.clone()));
                    items.push(item);

                    let filtered = handoff.filter_input(HandoffInputData {
                        history: conversation,
                    });

                    agent = handoff.agent().clone();
                    conversation = filtered.history;
                    tool_choice = agent.settings().tool_choice.clone();

                    if let Some(span) = agent_span.take() {
                        span.complete();
                    }
                    agent_span = Some(SpanGuard::enter(
                        trace.clone(),
                        SpanKind::Agent {
                            agent_name: agent.name().to_string(),
                        },
                    ));
                    emit(
                        events,
                        StreamEvent::AgentUpdated {
                            agent_name: to.clone(),
                        },
                    );
                }

                NextStep::Tools(calls) => {
                    conversation.push(Message::assistant_with_tool_calls(
                        response.content.clone().unwrap_or_default(),
                        calls.clone(),
                    ));
                    if let Some(content) = response.content.as_deref().filter(|c| !c.is_empty()) {
                        let item = RunItem::message(Role::Assistant, content);
                        emit(events, StreamEvent::RunItem(item.clone()));
                        items.push(item);
                    }

                    let outcome = dispatch::execute_tool_calls(
                        &agent,
                        &ctx,
                        calls,
                        config.max_concurrency,
                        Some(trace),
                    )
                    .await?;

                    for item in outcome.items {
                        emit(events, StreamEvent::RunItem(item.clone()));
                        items.push(item);
                    }
                    conversation.extend(outcome.messages);

                    if let Some(final_output) = outcome.final_output {
                        return Self::finalize(
                            &agent,
                            &ctx,
                            trace,
                            config,
                            final_output,
                            items,
                            original_input,
                            new_input,
                            usage,
                            input_guardrail_results,
                            agent_span,
                        )
                        .await;
                    }

                    // A forced choice holds for exactly one turn; leaving it
                    // in place would force tool calls forever.
                    if tool_choice.is_forced() && agent.resets_tool_choice() {
                        tool_choice = ToolChoice::Auto;
                    }
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn finalize<C: Send + Sync + 'static>(
        agent: &Arc<Agent<C>>,
        ctx: &RunContext<C>,
        trace: &Arc<Mutex<RunTrace>>,
        config: &RunConfig<C>,
        final_output: Value,
        items: Vec<RunItem>,
        original_input: Vec<Message>,
        new_input: Vec<Message>,
        usage: UsageStats,
        input_guardrail_results: Vec<GuardrailResult>,
        mut agent_span: Option<SpanGuard>,
    ) -> Result<RunResult> {
        // Output guardrails belong to whichever agent finished the run.
        let mut output_guardrail_results = Vec::new();
        for guard in agent.output_guardrails() {
            let span = SpanGuard::enter(
                trace.clone(),
                SpanKind::Guardrail {
                    guardrail_name: guard.name().to_string(),
                    stage: "output".to_string(),
                    tripped: false,
                },
            );
            match GuardrailEvaluator::check_output(
                std::slice::from_ref(guard),
                ctx,
                agent,
                &final_output,
            )
            .await
            {
                Ok(mut results) => {
                    span.complete();
                    output_guardrail_results.append(&mut results);
                }
                Err(e) => {
                    span.fail(e.to_string());
                    return Err(e);
                }
            }
        }

        if let Some(session) = &config.session {
            // Persist the conversational content only; tool traffic is
            // turn-local and its call ids mean nothing to a later run.
            let mut delta = new_input;
            delta.extend(
                crate::items::ItemHelpers::to_messages(&items)
                    .into_iter()
                    .filter(|m| m.role != Role::Tool && m.tool_calls.is_none()),
            );
            session.add_messages(delta).await?;
        }

        if let Some(span) = agent_span.take() {
            span.complete();
        }
        info!(agent = %agent.name(), "run finished");

        Ok(RunResult {
            final_output,
            items,
            last_agent: agent.name().to_string(),
            original_input,
            usage,
            input_guardrail_results,
            output_guardrail_results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScriptedProvider;
    use crate::tool::{FunctionTool, ToolResult};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn provider(p: ScriptedProvider) -> Arc<ScriptedProvider> {
        Arc::new(p)
    }

    #[tokio::test]
    async fn test_single_turn_run() {
        let p = provider(ScriptedProvider::new().with_message("Paris"));
        let agent = Arc::new(Agent::simple(
            "Assistant",
            "Answer concisely.",
        ));

        let result = Runner::run(
            p.clone(),
            agent,
            "What is the capital of France?",
            RunConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(result.final_output_text(), "Paris");
        assert_eq!(result.last_agent, "Assistant");
        assert_eq!(p.call_count(), 1);

        // The model saw the instructions and the user message, in order.
        let request = &p.requests()[0];
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, "Answer concisely.");
        assert_eq!(request.messages[1].content, "What is the capital of France?");
    }

    #[tokio::test]
    async fn test_tool_loop_then_final() {
        let p = provider(
            ScriptedProvider::new()
                .with_tool_call("echo", json!({"input": "hi"}))
                .with_message("echoed"),
        );
        let agent = Arc::new(
            Agent::simple("Worker", "Use tools.")
                .with_tool(Arc::new(FunctionTool::simple("echo", "Echo", |s| s))),
        );

        let result = Runner::run(p.clone(), agent, "go", RunConfig::default())
            .await
            .unwrap();

        assert_eq!(result.final_output_text(), "echoed");
        assert_eq!(p.call_count(), 2);

        // Items: tool call, tool output, final message.
        assert!(matches!(result.items[0], RunItem::ToolCall(_)));
        assert!(matches!(result.items[1], RunItem::ToolOutput(_)));
        assert!(matches!(result.items[2], RunItem::Message(_)));

        // The second request carried the tool exchange.
        let second = &p.requests()[1];
        assert!(second.messages.iter().any(|m| m.role == Role::Tool));
    }

    #[tokio::test]
    async fn test_max_turns_exceeded() {
        let p = provider(
            ScriptedProvider::new()
                .with_tool_call("echo", json!({"input": "a"}))
                .with_tool_call("echo", json!({"input": "b"}))
                .with_tool_call("echo", json!({"input": "c"})),
        );
        let agent = Arc::new(
            Agent::simple("Worker", "Loop forever.")
                .with_tool(Arc::new(FunctionTool::simple("echo", "Echo", |s| s))),
        );

        let err = Runner::run(
            p.clone(),
            agent,
            "go",
            RunConfig::default().with_max_turns(2),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AgentsError::MaxTurnsExceeded { max_turns: 2 }));
        assert_eq!(p.call_count(), 2);
    }

    #[tokio::test]
    async fn test_handoff_switches_agent() {
        let p = provider(
            ScriptedProvider::new()
                .with_tool_call("transfer_to_spanish_agent", json!({}))
                .with_message("¡Hola!"),
        );
        let spanish = Arc::new(Agent::simple("Spanish agent", "Responde en español."));
        let triage = Arc::new(Agent::simple("Triage", "Route requests.").with_handoff_to(spanish));

        let result = Runner::run(p.clone(), triage, "Hola", RunConfig::default())
            .await
            .unwrap();

        assert_eq!(result.last_agent, "Spanish agent");
        assert_eq!(result.final_output_text(), "¡Hola!");
        assert!(result
            .items
            .iter()
            .any(|i| matches!(i, RunItem::HandoffOutput(_))));

        // The second request runs under the target agent's instructions.
        let second = &p.requests()[1];
        assert_eq!(second.messages[0].content, "Responde en español.");
    }

    #[tokio::test]
    async fn test_tool_choice_resets_after_forced_turn() {
        let p = provider(
            ScriptedProvider::new()
                .with_tool_call("echo", json!({"input": "x"}))
                .with_message("done"),
        );
        let agent = Arc::new(
            Agent::simple("Worker", "Use tools.")
                .with_tool(Arc::new(FunctionTool::simple("echo", "Echo", |s| s)))
                .with_tool_choice(ToolChoice::Required),
        );

        Runner::run(p.clone(), agent, "go", RunConfig::default())
            .await
            .unwrap();

        let requests = p.requests();
        assert_eq!(requests[0].tool_choice, ToolChoice::Required);
        assert_eq!(requests[1].tool_choice, ToolChoice::Auto);
    }

    #[tokio::test]
    async fn test_stop_on_first_tool_skips_final_model_call() {
        let p = provider(ScriptedProvider::new().with_tool_call("answer", json!({})));
        let agent = Arc::new(
            Agent::simple("Worker", "x")
                .with_tool(Arc::new(FunctionTool::new(
                    "answer",
                    "Answer directly",
                    json!({"type": "object", "properties": {}}),
                    |_ctx, _args| async move { Ok(ToolResult::new(json!("tool says hi"))) },
                )))
                .with_tool_use_behavior(crate::agent::ToolUseBehavior::StopOnFirstTool),
        );

        let result = Runner::run(p.clone(), agent, "go", RunConfig::default())
            .await
            .unwrap();

        assert_eq!(result.final_output, json!("tool says hi"));
        assert_eq!(p.call_count(), 1);
    }

    #[tokio::test]
    async fn test_session_feeds_next_run() {
        let session: Arc<dyn Session> = Arc::new(crate::memory::InMemorySession::new("s1"));
        let agent = Arc::new(Agent::simple("Assistant", "Be brief."));

        let p1 = provider(ScriptedProvider::new().with_message("Paris"));
        Runner::run(
            p1,
            agent.clone(),
            "Capital of France?",
            RunConfig::default().with_session(session.clone()),
        )
        .await
        .unwrap();

        let p2 = provider(ScriptedProvider::new().with_message("About 2 million"));
        Runner::run(
            p2.clone(),
            agent,
            "Population?",
            RunConfig::default().with_session(session),
        )
        .await
        .unwrap();

        // The second run saw the first exchange before the new question.
        let request = &p2.requests()[0];
        let contents: Vec<&str> = request.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["Be brief.", "Capital of France?", "Paris", "Population?"]
        );
    }

    #[tokio::test]
    async fn test_run_stream_event_order() {
        let p = provider(ScriptedProvider::new().with_message("hi"));
        let agent = Arc::new(Agent::simple("Assistant", "x"));

        let events = Runner::run_stream(p, agent, "hello", RunConfig::default())
            .collect_events()
            .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], StreamEvent::RunItem(RunItem::Message(_))));
        match &events[1] {
            StreamEvent::RunCompleted(result) => {
                assert_eq!(result.final_output_text(), "hi")
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_stream_error_event() {
        let p = provider(ScriptedProvider::new().with_tool_call("missing", json!({})));
        let agent = Arc::new(Agent::simple("Assistant", "x"));

        let events = Runner::run_stream(p, agent, "hello", RunConfig::default())
            .collect_events()
            .await;

        match events.last().unwrap() {
            StreamEvent::Error { message } => assert!(message.contains("missing")),
            other => panic!("expected error event, got {other:?}"),
        }
    }
}
