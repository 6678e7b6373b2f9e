//! Conversation messages, model responses, and run items.
//!
//! `RunItem` is the append-only record of everything a run generated, in
//! causal order: assistant messages, tool calls and their outputs, handoff
//! calls and the resulting agent switches, and reasoning traces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the conversation sent to (or echoed from) the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Structured response from the model: final content, tool call requests, or
/// both, plus an optional reasoning trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub id: String,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ModelResponse {
    pub fn new_message(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: Some(content.into()),
            reasoning: None,
            tool_calls: vec![],
            finish_reason: Some("stop".to_string()),
            created_at: Utc::now(),
        }
    }

    pub fn new_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: None,
            reasoning: None,
            tool_calls,
            finish_reason: Some("tool_calls".to_string()),
            created_at: Utc::now(),
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// A single generated item in a run. Items are append-only; ordering reflects
/// the causal sequence of generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunItem {
    Message(MessageItem),
    ToolCall(ToolCallItem),
    ToolOutput(ToolOutputItem),
    HandoffCall(HandoffCallItem),
    HandoffOutput(HandoffOutputItem),
    Reasoning(ReasoningItem),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageItem {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallItem {
    pub id: String,
    pub tool_name: String,
    pub arguments: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutputItem {
    pub id: String,
    pub tool_call_id: String,
    pub output: Value,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The model asked to transfer the run to another agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffCallItem {
    pub id: String,
    pub tool_name: String,
    pub arguments: Value,
    pub created_at: DateTime<Utc>,
}

/// A handoff was resolved and the current agent switched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffOutputItem {
    pub id: String,
    pub from_agent: String,
    pub to_agent: String,
    pub created_at: DateTime<Utc>,
}

/// A reasoning trace emitted alongside a model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningItem {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl RunItem {
    pub(crate) fn message(role: Role, content: impl Into<String>) -> Self {
        RunItem::Message(MessageItem {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        })
    }

    pub(crate) fn tool_call(call: &ToolCall) -> Self {
        RunItem::ToolCall(ToolCallItem {
            id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            created_at: Utc::now(),
        })
    }

    pub(crate) fn tool_output(tool_call_id: &str, output: Value, error: Option<String>) -> Self {
        RunItem::ToolOutput(ToolOutputItem {
            id: Uuid::new_v4().to_string(),
            tool_call_id: tool_call_id.to_string(),
            output,
            error,
            created_at: Utc::now(),
        })
    }

    pub(crate) fn handoff_call(call: &ToolCall) -> Self {
        RunItem::HandoffCall(HandoffCallItem {
            id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            created_at: Utc::now(),
        })
    }

    pub(crate) fn handoff_output(from_agent: &str, to_agent: &str) -> Self {
        RunItem::HandoffOutput(HandoffOutputItem {
            id: Uuid::new_v4().to_string(),
            from_agent: from_agent.to_string(),
            to_agent: to_agent.to_string(),
            created_at: Utc::now(),
        })
    }

    pub(crate) fn reasoning(content: impl Into<String>) -> Self {
        RunItem::Reasoning(ReasoningItem {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            created_at: Utc::now(),
        })
    }
}

/// Helper functions for working with items.
pub struct ItemHelpers;

impl ItemHelpers {
    /// Project run items back into conversation messages. Handoff records and
    /// reasoning traces are bookkeeping, not conversation content. Each tool
    /// call is re-emitted as an assistant message declaring it, so the tool
    /// message that follows refers to a known call id.
    pub fn to_messages(items: &[RunItem]) -> Vec<Message> {
        let mut messages = Vec::new();

        for item in items {
            match item {
                RunItem::Message(msg) => {
                    messages.push(Message {
                        role: msg.role,
                        content: msg.content.clone(),
                        tool_call_id: None,
                        tool_calls: None,
                    });
                }
                RunItem::ToolCall(call) => {
                    messages.push(Message::assistant_with_tool_calls(
                        "",
                        vec![ToolCall {
                            id: call.id.clone(),
                            name: call.tool_name.clone(),
                            arguments: call.arguments.clone(),
                        }],
                    ));
                }
                RunItem::ToolOutput(output) => {
                    let content = if let Some(error) = &output.error {
                        format!("Error: {}", error)
                    } else {
                        output.output.to_string()
                    };
                    messages.push(Message::tool(content, &output.tool_call_id));
                }
                _ => {}
            }
        }

        messages
    }
}
