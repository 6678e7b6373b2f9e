//! # agentrun
//!
//! A multi-agent run loop for OpenAI models: agents with tools, handoffs
//! between agents, input/output guardrails, and a typed run context shared
//! across everything a run touches.
//!
//! ## Core Concepts
//!
//! - **Agent**: instructions, tools, handoff targets, and model settings,
//!   bundled under a name.
//! - **Runner**: drives the turn loop until an agent produces final output,
//!   a guardrail trips, or the turn budget runs out.
//! - **Handoff**: a tool-shaped transfer of the conversation to another
//!   agent; the target agent continues the same run.
//! - **Guardrails**: checks on the run's input (starting agent) and final
//!   output (finishing agent) that can abort the run.
//!
//! ## Getting Started
//!
//! Set your OpenAI API key in the `OPENAI_API_KEY` environment variable.
//!
//! ```rust,no_run
//! use agentrun::{Agent, FunctionTool, OpenAIProvider, RunConfig, Runner, ToolResult};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Deserialize, JsonSchema)]
//! struct AddArgs {
//!     a: f64,
//!     b: f64,
//! }
//!
//! # async fn example() -> agentrun::Result<()> {
//! let add = FunctionTool::typed("add", "Add two numbers", |_ctx, args: AddArgs| async move {
//!     Ok(ToolResult::new(serde_json::json!(args.a + args.b)))
//! });
//!
//! let agent = Arc::new(
//!     Agent::simple("Math assistant", "You are a helpful math assistant.")
//!         .with_tool(Arc::new(add)),
//! );
//!
//! let result = Runner::run(
//!     Arc::new(OpenAIProvider::new()),
//!     agent,
//!     "What is 2 + 2?",
//!     RunConfig::default(),
//! )
//! .await?;
//! println!("{}", result.final_output_text());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod context;
pub mod error;
pub mod guardrail;
pub mod handoff;
pub mod items;
pub mod memory;
pub mod model;
pub mod result;
pub mod runner;
pub mod tool;
pub mod trace;
pub mod usage;

mod dispatch;

// Public re-exports for convenience
pub use agent::{Agent, Instructions, ModelSettings, ToolChoice, ToolUseBehavior, DEFAULT_MODEL};
pub use context::RunContext;
pub use error::{AgentsError, Result};
pub use guardrail::{
    input_guardrail, output_guardrail, GuardrailResult, InputGuardrail, OutputGuardrail,
};
pub use handoff::{remove_all_tools, Handoff, HandoffInputData};
pub use items::{ItemHelpers, Message, ModelResponse, Role, RunItem, ToolCall};
pub use memory::{InMemorySession, Session};
pub use model::{ModelProvider, ModelRequest, OpenAIProvider, ScriptedProvider};
pub use result::RunResult;
pub use runner::{RunConfig, RunInput, RunStream, Runner, StreamEvent, DEFAULT_MAX_TURNS};
pub use tool::{
    AgentTool, FunctionTool, HostedTool, Tool, ToolFailurePolicy, ToolResult, ToolSchema,
};
pub use trace::{ConsoleExporter, Span, SpanKind, TraceExporter};
pub use usage::{Usage, UsageStats};

// Re-export async-openai client types for custom provider configuration
pub use async_openai::{config::OpenAIConfig, Client};
