//! Error types for the run loop.
//!
//! Four categories matter to callers: turn-budget exhaustion and guardrail
//! tripwires are recoverable run-level conditions; model contract violations
//! and integrator misconfiguration are not. Everything unwinds the run loop;
//! nothing is swallowed.

use thiserror::Error;

use crate::guardrail::GuardrailResult;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AgentsError>;

/// Error type for agent runs.
#[derive(Debug, Error)]
pub enum AgentsError {
    /// The run used up its turn budget. Recoverable: rerun with a larger
    /// budget or a different agent, this is not a defect.
    #[error("maximum turns exceeded: {max_turns}")]
    MaxTurnsExceeded { max_turns: usize },

    /// An input guardrail tripped before the first model call. Carries the
    /// triggering result for inspection.
    #[error("input guardrail '{guardrail}' tripped")]
    InputGuardrailTripwire {
        guardrail: String,
        result: GuardrailResult,
    },

    /// An output guardrail tripped on the final candidate output.
    #[error("output guardrail '{guardrail}' tripped")]
    OutputGuardrailTripwire {
        guardrail: String,
        result: GuardrailResult,
    },

    /// The model produced output inconsistent with the declared contract:
    /// invalid JSON for a declared output schema, a call to a nonexistent
    /// tool, or handoff arguments that fail validation. Not retried here.
    #[error("model behavior error: {message}")]
    ModelBehaviorError { message: String },

    /// Integrator misconfiguration (invalid agent graph, misuse of the API).
    /// A programming error surfaced at runtime.
    #[error("user error: {message}")]
    UserError { message: String },

    /// A tool ran and failed, and its failure policy asked for the error to
    /// propagate instead of being reported back to the model.
    #[error("tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// Error from the OpenAI API.
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session storage error.
    #[error("session error: {0}")]
    Session(String),

    /// Other errors.
    #[error("{0}")]
    Other(String),
}

impl AgentsError {
    /// Whether this is one of the intentionally-recoverable abort paths
    /// (turn budget, guardrail tripwires) as opposed to a hard failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AgentsError::MaxTurnsExceeded { .. }
                | AgentsError::InputGuardrailTripwire { .. }
                | AgentsError::OutputGuardrailTripwire { .. }
        )
    }

    pub(crate) fn model_behavior(message: impl Into<String>) -> Self {
        AgentsError::ModelBehaviorError {
            message: message.into(),
        }
    }

    pub(crate) fn user(message: impl Into<String>) -> Self {
        AgentsError::UserError {
            message: message.into(),
        }
    }
}
