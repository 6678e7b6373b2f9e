//! Tool definitions and the agent-as-tool adapter.
//!
//! Everything an agent can expose to the model implements [`Tool`]. Three
//! families exist:
//!
//! - [`FunctionTool`]: local async functions, built raw (explicit JSON
//!   schema), simple (string in, string out, empty schema), or typed
//!   (arguments derived from a [`schemars::JsonSchema`] type).
//! - [`HostedTool`]: provider-executed tools (web search, file search). The
//!   crate ships their declaration on requests and never executes them.
//! - [`AgentTool`]: a nested agent run behind a tool call, with its own turn
//!   budget and an optional output extractor.

use async_trait::async_trait;
use futures::future::BoxFuture;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::context::RunContext;
use crate::error::{AgentsError, Result};

/// What the dispatcher does when a tool's execution fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolFailurePolicy {
    /// Feed the error text back to the model as the tool output and keep the
    /// run going. The default.
    #[default]
    ReportToModel,
    /// Abort the run with the tool error.
    Raise,
}

/// Output of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Payload handed back to the model as the tool message.
    pub output: Value,
    /// When true the run ends with this output as the final result, skipping
    /// any further model calls.
    #[serde(default)]
    pub is_final: bool,
}

impl ToolResult {
    pub fn new(output: Value) -> Self {
        Self {
            output,
            is_final: false,
        }
    }

    pub fn final_output(output: Value) -> Self {
        Self {
            output,
            is_final: true,
        }
    }
}

/// A callable the model can invoke by name with JSON arguments.
#[async_trait]
pub trait Tool<C: Send + Sync + 'static = ()>: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the arguments object.
    fn parameters_schema(&self) -> Value;

    fn failure_policy(&self) -> ToolFailurePolicy {
        ToolFailurePolicy::ReportToModel
    }

    /// Hosted tools are declared on requests but executed by the provider;
    /// the dispatcher never calls `execute` on them.
    fn is_hosted(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &RunContext<C>, arguments: Value) -> Result<ToolResult>;
}

/// Declaration of a tool as sent to the model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSchema {
    pub fn from_tool<C: Send + Sync + 'static>(tool: &dyn Tool<C>) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters_schema(),
        }
    }
}

type ToolFn<C> =
    dyn Fn(RunContext<C>, Value) -> BoxFuture<'static, Result<ToolResult>> + Send + Sync;

/// A local async function exposed as a tool.
pub struct FunctionTool<C: Send + Sync + 'static = ()> {
    name: String,
    description: String,
    parameters: Value,
    failure_policy: ToolFailurePolicy,
    f: Arc<ToolFn<C>>,
}

impl<C: Send + Sync + 'static> FunctionTool<C> {
    /// Raw constructor: the caller supplies the argument schema and handles
    /// the JSON arguments itself.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        f: F,
    ) -> Self
    where
        F: Fn(RunContext<C>, Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<ToolResult>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            failure_policy: ToolFailurePolicy::default(),
            f: Arc::new(move |ctx, args| Box::pin(f(ctx, args))),
        }
    }

    /// String-in, string-out tool with an empty argument schema. Handy for
    /// tools whose behavior does not depend on arguments.
    pub fn simple<F>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new(
            name,
            description,
            json!({"type": "object", "properties": {}}),
            move |_ctx, args: Value| {
                let f = f.clone();
                async move {
                    let input = args
                        .get("input")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    Ok(ToolResult::new(Value::String(f(input))))
                }
            },
        )
    }

    /// Typed constructor: the argument schema is derived from `A` and the
    /// model's arguments are deserialized before the closure runs. Arguments
    /// that fail to deserialize are a model fault, not a tool failure, and
    /// abort the run.
    pub fn typed<A, F, Fut>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(RunContext<C>, A) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<ToolResult>> + Send + 'static,
    {
        let name = name.into();
        let schema = serde_json::to_value(schema_for!(A).schema).unwrap_or_else(|_| json!({}));
        let tool_name = name.clone();
        let f = Arc::new(f);
        Self::new(name, description, schema, move |ctx, args: Value| {
            let f = f.clone();
            let tool_name = tool_name.clone();
            async move {
                let parsed: A = serde_json::from_value(args).map_err(|e| {
                    AgentsError::model_behavior(format!(
                        "invalid arguments for tool '{tool_name}': {e}"
                    ))
                })?;
                f(ctx, parsed).await
            }
        })
    }

    pub fn with_failure_policy(mut self, policy: ToolFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> Tool<C> for FunctionTool<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.parameters.clone()
    }

    fn failure_policy(&self) -> ToolFailurePolicy {
        self.failure_policy
    }

    async fn execute(&self, ctx: &RunContext<C>, arguments: Value) -> Result<ToolResult> {
        debug!(tool = %self.name, "executing function tool");
        (self.f)(ctx.clone(), arguments).await
    }
}

/// A tool executed by the model provider rather than this process. The
/// config payload is passed through to the provider verbatim.
pub struct HostedTool {
    name: String,
    description: String,
    config: Value,
}

impl HostedTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, config: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            config,
        }
    }

    pub fn config(&self) -> &Value {
        &self.config
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> Tool<C> for HostedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.config.clone()
    }

    fn is_hosted(&self) -> bool {
        true
    }

    async fn execute(&self, _ctx: &RunContext<C>, _arguments: Value) -> Result<ToolResult> {
        Err(AgentsError::user(format!(
            "hosted tool '{}' is executed by the model provider, not locally",
            self.name
        )))
    }
}

type OutputExtractor = dyn Fn(&crate::result::RunResult) -> Value + Send + Sync;

/// An agent exposed as a tool: the call runs the inner agent to completion
/// on its own turn budget and hands its final output back to the caller as
/// the tool output. The calling agent keeps the conversation; nothing hands
/// off.
pub struct AgentTool<C: Send + Sync + 'static = ()> {
    agent: Arc<crate::agent::Agent<C>>,
    provider: Arc<dyn crate::model::ModelProvider>,
    name: String,
    description: String,
    max_turns: Option<usize>,
    output_extractor: Option<Arc<OutputExtractor>>,
}

impl<C: Send + Sync + 'static> AgentTool<C> {
    pub fn new(
        agent: Arc<crate::agent::Agent<C>>,
        provider: Arc<dyn crate::model::ModelProvider>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            provider,
            name: name.into(),
            description: description.into(),
            max_turns: None,
            output_extractor: None,
        }
    }

    /// Turn budget for the nested run. Defaults to the runner's default.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    /// Derive the tool output from the nested run result instead of using
    /// its final output verbatim.
    pub fn with_output_extractor<F>(mut self, f: F) -> Self
    where
        F: Fn(&crate::result::RunResult) -> Value + Send + Sync + 'static,
    {
        self.output_extractor = Some(Arc::new(f));
        self
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> Tool<C> for AgentTool<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "The request to send to the agent"
                }
            },
            "required": ["input"]
        })
    }

    async fn execute(&self, ctx: &RunContext<C>, arguments: Value) -> Result<ToolResult> {
        let input = arguments
            .get("input")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AgentsError::model_behavior(format!(
                    "tool '{}' requires a string 'input' argument",
                    self.name
                ))
            })?
            .to_string();

        let mut config = crate::runner::RunConfig::new(ctx.clone());
        if let Some(max_turns) = self.max_turns {
            config = config.with_max_turns(max_turns);
        }

        debug!(agent = %self.agent.name(), tool = %self.name, "nested agent run");
        let result = crate::runner::Runner::run(
            self.provider.clone(),
            self.agent.clone(),
            input,
            config,
        )
        .await?;

        let output = match &self.output_extractor {
            Some(extract) => extract(&result),
            None => result.final_output.clone(),
        };
        Ok(ToolResult::new(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct AddArgs {
        a: i64,
        b: i64,
    }

    #[tokio::test]
    async fn test_typed_tool_executes() {
        let tool: FunctionTool = FunctionTool::typed(
            "add",
            "Add two integers",
            |_ctx, args: AddArgs| async move { Ok(ToolResult::new(json!(args.a + args.b))) },
        );

        assert_eq!(tool.name(), "add");
        let schema = tool.parameters_schema();
        assert!(schema["properties"]["a"].is_object());

        let ctx = RunContext::default();
        let result = tool.execute(&ctx, json!({"a": 2, "b": 3})).await.unwrap();
        assert_eq!(result.output, json!(5));
        assert!(!result.is_final);
    }

    #[tokio::test]
    async fn test_typed_tool_bad_args_is_model_fault() {
        let tool: FunctionTool = FunctionTool::typed(
            "add",
            "Add two integers",
            |_ctx, args: AddArgs| async move { Ok(ToolResult::new(json!(args.a + args.b))) },
        );

        let ctx = RunContext::default();
        let err = tool
            .execute(&ctx, json!({"a": "two", "b": 3}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentsError::ModelBehaviorError { .. }));
    }

    #[tokio::test]
    async fn test_simple_tool() {
        let tool: FunctionTool = FunctionTool::simple("echo", "Echo input", |s| format!("got {s}"));
        let ctx = RunContext::default();
        let result = tool
            .execute(&ctx, json!({"input": "hi"}))
            .await
            .unwrap();
        assert_eq!(result.output, json!("got hi"));
    }

    #[tokio::test]
    async fn test_hosted_tool_refuses_local_execution() {
        let tool = HostedTool::new("web_search", "Search the web", json!({"type": "web_search"}));
        assert!(Tool::<()>::is_hosted(&tool));
        let ctx = RunContext::default();
        let err = Tool::<()>::execute(&tool, &ctx, json!({})).await.unwrap_err();
        assert!(matches!(err, AgentsError::UserError { .. }));
    }

    #[tokio::test]
    async fn test_agent_tool_runs_nested_agent() {
        let provider = Arc::new(crate::model::ScriptedProvider::new().with_message("42"));
        let inner = Arc::new(crate::agent::Agent::simple("Counter", "Count things."));
        let tool = AgentTool::new(inner, provider, "ask_counter", "Ask the counter");

        let ctx = RunContext::default();
        let result = tool
            .execute(&ctx, json!({"input": "how many?"}))
            .await
            .unwrap();
        assert_eq!(result.output, json!("42"));
    }

    #[tokio::test]
    async fn test_agent_tool_requires_input() {
        let provider = Arc::new(crate::model::ScriptedProvider::new());
        let inner = Arc::new(crate::agent::Agent::simple("Counter", "x"));
        let tool = AgentTool::new(inner, provider, "ask_counter", "Ask");

        let ctx = RunContext::default();
        let err = tool.execute(&ctx, json!({})).await.unwrap_err();
        assert!(matches!(err, AgentsError::ModelBehaviorError { .. }));
    }

    #[test]
    fn test_tool_schema_from_tool() {
        let tool: FunctionTool =
            FunctionTool::simple("echo", "Echo input", |s| s);
        let schema = ToolSchema::from_tool(&tool);
        assert_eq!(schema.name, "echo");
        assert_eq!(schema.parameters["type"], "object");
    }
}
