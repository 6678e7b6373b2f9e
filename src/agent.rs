//! Agent definition: a named bundle of instructions, tools, handoff targets,
//! guardrails, and model settings.
//!
//! Agents are immutable once built and shared behind `Arc`; the runner never
//! mutates one. The generic parameter is the run context type, which ties an
//! agent to the tools and guardrails that share its context at compile time.

use futures::future::BoxFuture;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::context::RunContext;
use crate::guardrail::{InputGuardrail, OutputGuardrail};
use crate::handoff::Handoff;
use crate::tool::Tool;

pub const DEFAULT_MODEL: &str = "gpt-4o";

type DynamicInstructions<C> = dyn Fn(RunContext<C>) -> BoxFuture<'static, String> + Send + Sync;

/// System-prompt instructions: a fixed string, or a function of the run
/// context resolved freshly before every model call.
pub enum Instructions<C: Send + Sync + 'static = ()> {
    Static(String),
    Dynamic(Arc<DynamicInstructions<C>>),
}

impl<C: Send + Sync + 'static> Clone for Instructions<C> {
    fn clone(&self) -> Self {
        match self {
            Instructions::Static(s) => Instructions::Static(s.clone()),
            Instructions::Dynamic(f) => Instructions::Dynamic(f.clone()),
        }
    }
}

impl<C: Send + Sync + 'static> std::fmt::Debug for Instructions<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instructions::Static(s) => f.debug_tuple("Static").field(s).finish(),
            Instructions::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// How the model is steered toward (or away from) tool use on a turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model decides. The default.
    #[default]
    Auto,
    /// Model must call some tool this turn.
    Required,
    /// Model must not call tools this turn.
    None,
    /// Model must call this specific tool.
    Specific(String),
}

impl ToolChoice {
    /// A forced choice keeps producing tool calls forever if left in place;
    /// the runner resets these to `Auto` after one turn.
    pub fn is_forced(&self) -> bool {
        matches!(self, ToolChoice::Required | ToolChoice::Specific(_))
    }
}

/// What the runner does after executing tool calls on a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolUseBehavior {
    /// Feed tool outputs back to the model and continue the loop. The
    /// default.
    #[default]
    RunLlmAgain,
    /// End the run with the first tool's output as the final output, without
    /// another model call.
    StopOnFirstTool,
}

/// Knobs forwarded to the model provider on each request.
#[derive(Debug, Clone, Default)]
pub struct ModelSettings {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tool_choice: ToolChoice,
}

pub struct Agent<C: Send + Sync + 'static = ()> {
    name: String,
    instructions: Instructions<C>,
    /// Extra context appended to the auto-generated handoff tool description
    /// when another agent lists this one as a handoff target.
    handoff_description: Option<String>,
    model: String,
    settings: ModelSettings,
    tools: Vec<Arc<dyn Tool<C>>>,
    handoffs: Vec<Handoff<C>>,
    input_guardrails: Vec<Arc<dyn InputGuardrail<C>>>,
    output_guardrails: Vec<Arc<dyn OutputGuardrail<C>>>,
    /// JSON schema the final output must conform to, when structured output
    /// is requested.
    output_schema: Option<Value>,
    tool_use_behavior: ToolUseBehavior,
    reset_tool_choice: bool,
}

impl<C: Send + Sync + 'static> Agent<C> {
    /// Minimal agent: a name and instructions, default model, no tools.
    pub fn simple(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Instructions::Static(instructions.into()),
            handoff_description: None,
            model: DEFAULT_MODEL.to_string(),
            settings: ModelSettings::default(),
            tools: Vec::new(),
            handoffs: Vec::new(),
            input_guardrails: Vec::new(),
            output_guardrails: Vec::new(),
            output_schema: None,
            tool_use_behavior: ToolUseBehavior::default(),
            reset_tool_choice: true,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replace the static instructions with a function of the run context,
    /// evaluated before every model call.
    pub fn with_instructions_fn<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RunContext<C>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = String> + Send + 'static,
    {
        self.instructions = Instructions::Dynamic(Arc::new(move |ctx| Box::pin(f(ctx))));
        self
    }

    pub fn with_handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = Some(description.into());
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool<C>>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool<C>>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn with_handoff(mut self, handoff: Handoff<C>) -> Self {
        self.handoffs.push(handoff);
        self
    }

    /// Shorthand for a default-configured handoff to `agent`.
    pub fn with_handoff_to(self, agent: Arc<Agent<C>>) -> Self {
        self.with_handoff(Handoff::new(agent))
    }

    pub fn with_input_guardrail(mut self, guardrail: Arc<dyn InputGuardrail<C>>) -> Self {
        self.input_guardrails.push(guardrail);
        self
    }

    pub fn with_output_guardrail(mut self, guardrail: Arc<dyn OutputGuardrail<C>>) -> Self {
        self.output_guardrails.push(guardrail);
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.settings.tool_choice = tool_choice;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.settings.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.settings.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_tool_use_behavior(mut self, behavior: ToolUseBehavior) -> Self {
        self.tool_use_behavior = behavior;
        self
    }

    /// Disable the automatic reset of a forced tool choice after one turn.
    /// Leaving a forced choice in place loops until the turn budget runs out
    /// unless a tool ends the run.
    pub fn with_reset_tool_choice(mut self, reset: bool) -> Self {
        self.reset_tool_choice = reset;
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Structured output conforming to `T`'s derived JSON schema.
    pub fn with_output_type<T: JsonSchema>(self) -> Self {
        let schema = serde_json::to_value(schema_for!(T).schema)
            .unwrap_or_else(|_| Value::Object(Default::default()));
        self.with_output_schema(schema)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &Instructions<C> {
        &self.instructions
    }

    /// Produce the system prompt for the next model call. Static instructions
    /// are returned as-is; dynamic ones re-run against the current context.
    pub async fn resolve_instructions(&self, ctx: &RunContext<C>) -> String {
        match &self.instructions {
            Instructions::Static(s) => s.clone(),
            Instructions::Dynamic(f) => f(ctx.clone()).await,
        }
    }

    pub fn handoff_description(&self) -> Option<&str> {
        self.handoff_description.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn tools(&self) -> &[Arc<dyn Tool<C>>] {
        &self.tools
    }

    pub fn handoffs(&self) -> &[Handoff<C>] {
        &self.handoffs
    }

    pub fn input_guardrails(&self) -> &[Arc<dyn InputGuardrail<C>>] {
        &self.input_guardrails
    }

    pub fn output_guardrails(&self) -> &[Arc<dyn OutputGuardrail<C>>] {
        &self.output_guardrails
    }

    pub fn output_schema(&self) -> Option<&Value> {
        self.output_schema.as_ref()
    }

    pub fn tool_use_behavior(&self) -> ToolUseBehavior {
        self.tool_use_behavior
    }

    pub fn resets_tool_choice(&self) -> bool {
        self.reset_tool_choice
    }

    pub fn find_tool(&self, name: &str) -> Option<&Arc<dyn Tool<C>>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Look up an enabled handoff by its tool name.
    pub fn find_handoff(&self, tool_name: &str) -> Option<&Handoff<C>> {
        self.handoffs
            .iter()
            .find(|h| h.is_enabled() && h.tool_name() == tool_name)
    }

}

impl<C: Send + Sync + 'static> Clone for Agent<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            instructions: self.instructions.clone(),
            handoff_description: self.handoff_description.clone(),
            model: self.model.clone(),
            settings: self.settings.clone(),
            tools: self.tools.clone(),
            handoffs: self.handoffs.clone(),
            input_guardrails: self.input_guardrails.clone(),
            output_guardrails: self.output_guardrails.clone(),
            output_schema: self.output_schema.clone(),
            tool_use_behavior: self.tool_use_behavior,
            reset_tool_choice: self.reset_tool_choice,
        }
    }
}

impl<C: Send + Sync + 'static> std::fmt::Debug for Agent<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("tools", &self.tools.len())
            .field("handoffs", &self.handoffs.len())
            .finish()
    }
}
