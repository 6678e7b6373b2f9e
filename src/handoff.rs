//! Handoffs: transferring a run from one agent to another.
//!
//! A handoff is surfaced to the model as an ordinary tool named
//! `transfer_to_<agent_name>`. When the model calls it, the runner switches
//! the active agent and continues the loop with a (possibly filtered) copy of
//! the conversation so far. The callback, if any, runs for side effects at
//! the moment of transfer; it never alters the conversation.

use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::agent::Agent;
use crate::context::RunContext;
use crate::error::{AgentsError, Result};
use crate::items::{Message, Role};
use crate::tool::ToolSchema;

/// The conversation snapshot handed to an input filter before the target
/// agent takes over.
#[derive(Debug, Clone)]
pub struct HandoffInputData {
    /// Non-system messages accumulated so far: the original input plus
    /// everything generated during the run. The system message is rebuilt
    /// from the target agent's instructions after filtering.
    pub history: Vec<Message>,
}

/// Rewrites the conversation the target agent will see. The default is
/// pass-through.
pub type InputFilter = Arc<dyn Fn(HandoffInputData) -> HandoffInputData + Send + Sync>;

/// Drops tool traffic from the history: tool outputs are removed and
/// assistant messages lose their tool call requests. Assistant messages that
/// carried only tool calls disappear entirely.
pub fn remove_all_tools(mut data: HandoffInputData) -> HandoffInputData {
    data.history.retain(|m| m.role != Role::Tool);
    data.history.retain_mut(|m| {
        if m.role == Role::Assistant {
            m.tool_calls = None;
            !m.content.is_empty()
        } else {
            true
        }
    });
    data
}

type HandoffCallback<C> =
    dyn Fn(RunContext<C>, Option<Value>) -> BoxFuture<'static, Result<()>> + Send + Sync;

/// A transfer target wired onto an agent.
pub struct Handoff<C: Send + Sync + 'static = ()> {
    agent: Arc<Agent<C>>,
    tool_name_override: Option<String>,
    tool_description_override: Option<String>,
    input_schema: Option<Value>,
    input_filter: Option<InputFilter>,
    on_handoff: Option<Arc<HandoffCallback<C>>>,
    enabled: bool,
}

impl<C: Send + Sync + 'static> Handoff<C> {
    pub fn new(agent: Arc<Agent<C>>) -> Self {
        Self {
            agent,
            tool_name_override: None,
            tool_description_override: None,
            input_schema: None,
            input_filter: None,
            on_handoff: None,
            enabled: true,
        }
    }

    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name_override = Some(name.into());
        self
    }

    pub fn with_tool_description(mut self, description: impl Into<String>) -> Self {
        self.tool_description_override = Some(description.into());
        self
    }

    /// Require the model to pass arguments matching this JSON schema.
    /// Arguments that fail to parse as JSON abort the run as a model fault.
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub fn with_input_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(HandoffInputData) -> HandoffInputData + Send + Sync + 'static,
    {
        self.input_filter = Some(Arc::new(filter));
        self
    }

    /// Side-effect callback invoked at the moment of transfer, before the
    /// target agent's first model call.
    pub fn on_handoff<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RunContext<C>, Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.on_handoff = Some(Arc::new(move |ctx, input| Box::pin(f(ctx, input))));
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn agent(&self) -> &Arc<Agent<C>> {
        &self.agent
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The tool name the model sees: `transfer_to_<name>`, with the agent
    /// name lowercased and whitespace collapsed to underscores.
    pub fn tool_name(&self) -> String {
        match &self.tool_name_override {
            Some(name) => name.clone(),
            None => format!("transfer_to_{}", normalize_agent_name(self.agent.name())),
        }
    }

    pub fn tool_description(&self) -> String {
        match &self.tool_description_override {
            Some(desc) => desc.clone(),
            None => format!(
                "Handoff to the {} agent to handle the request. {}",
                self.agent.name(),
                self.agent.handoff_description().unwrap_or_default()
            )
            .trim_end()
            .to_string(),
        }
    }

    pub fn tool_schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.tool_name(),
            description: self.tool_description(),
            parameters: self
                .input_schema
                .clone()
                .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
        }
    }

    /// Validate the model-supplied arguments and run the transfer callback.
    /// Returns the parsed input, if a schema required one.
    pub async fn invoke(&self, ctx: &RunContext<C>, arguments: Value) -> Result<Option<Value>> {
        let input = match &self.input_schema {
            Some(schema) => {
                if let Err(reason) = validate_input(schema, &arguments) {
                    return Err(AgentsError::model_behavior(format!(
                        "handoff '{}' received invalid input: {reason}",
                        self.tool_name()
                    )));
                }
                Some(arguments)
            }
            None => None,
        };

        if let Some(callback) = &self.on_handoff {
            callback(ctx.clone(), input.clone()).await?;
        }

        debug!(target_agent = %self.agent.name(), "handoff invoked");
        Ok(input)
    }

    /// Apply the input filter to the conversation the target agent inherits.
    pub fn filter_input(&self, data: HandoffInputData) -> HandoffInputData {
        match &self.input_filter {
            Some(filter) => filter(data),
            None => data,
        }
    }
}

impl<C: Send + Sync + 'static> Clone for Handoff<C> {
    fn clone(&self) -> Self {
        Self {
            agent: self.agent.clone(),
            tool_name_override: self.tool_name_override.clone(),
            tool_description_override: self.tool_description_override.clone(),
            input_schema: self.input_schema.clone(),
            input_filter: self.input_filter.clone(),
            on_handoff: self.on_handoff.clone(),
            enabled: self.enabled,
        }
    }
}

impl<C: Send + Sync + 'static> std::fmt::Debug for Handoff<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handoff")
            .field("agent", &self.agent.name())
            .field("tool_name", &self.tool_name())
            .field("enabled", &self.enabled)
            .finish()
    }
}

fn normalize_agent_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Check model-supplied handoff arguments against the declared input schema:
/// object-ness, required properties, and primitive property types.
fn validate_input(schema: &Value, arguments: &Value) -> std::result::Result<(), String> {
    let object = match arguments.as_object() {
        Some(object) => object,
        None => return Err(format!("expected a JSON object argument, got: {arguments}")),
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(key) {
                return Err(format!("missing required property '{key}'"));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, property) in properties {
            if let (Some(value), Some(expected)) =
                (object.get(key), property.get("type").and_then(Value::as_str))
            {
                if !type_matches(expected, value) {
                    return Err(format!("property '{key}' is not of type {expected}"));
                }
            }
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "integer" => value.as_i64().is_some() || value.as_u64().is_some(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}
