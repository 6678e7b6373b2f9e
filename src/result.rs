//! The outcome of a completed run.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentsError, Result};
use crate::guardrail::GuardrailResult;
use crate::items::{ItemHelpers, Message, RunItem};
use crate::usage::UsageStats;

/// Everything a finished run produced. Returned only on success; failed runs
/// surface as errors instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// The final output: a plain string value, or structured JSON when the
    /// final agent requested it.
    pub final_output: Value,
    /// Every item generated during the run, in causal order.
    pub items: Vec<RunItem>,
    /// Name of the agent that produced the final output. After handoffs this
    /// is the last agent in the chain, not the starting one.
    pub last_agent: String,
    /// The conversation input the run started from.
    pub original_input: Vec<Message>,
    pub usage: UsageStats,
    /// Results of the starting agent's input guardrails, all passing.
    pub input_guardrail_results: Vec<GuardrailResult>,
    /// Results of the final agent's output guardrails, all passing.
    pub output_guardrail_results: Vec<GuardrailResult>,
}

impl RunResult {
    /// The final output as text. Structured outputs are rendered as compact
    /// JSON.
    pub fn final_output_text(&self) -> String {
        match &self.final_output {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Deserialize a structured final output into `T`.
    pub fn final_output_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.final_output.clone()).map_err(AgentsError::from)
    }

    /// The conversation ready to seed a follow-up run: the original input
    /// followed by every message generated during this run.
    pub fn to_input_list(&self) -> Vec<Message> {
        let mut messages = self.original_input.clone();
        messages.extend(ItemHelpers::to_messages(&self.items));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Role;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn result_with(items: Vec<RunItem>) -> RunResult {
        RunResult {
            final_output: json!("done"),
            items,
            last_agent: "Assistant".to_string(),
            original_input: vec![Message::user("question")],
            usage: UsageStats::new(),
            input_guardrail_results: vec![],
            output_guardrail_results: vec![],
        }
    }

    #[test]
    fn test_to_input_list_prefixes_original_input() {
        let result = result_with(vec![RunItem::message(Role::Assistant, "done")]);
        let list = result.to_input_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].content, "question");
        assert_eq!(list[0].role, Role::User);
        assert_eq!(list[1].content, "done");
        assert_eq!(list[1].role, Role::Assistant);
    }

    #[test]
    fn test_final_output_text() {
        let mut result = result_with(vec![]);
        assert_eq!(result.final_output_text(), "done");

        result.final_output = json!({"ok": true});
        assert_eq!(result.final_output_text(), r#"{"ok":true}"#);
    }

    #[test]
    fn test_final_output_as() {
        #[derive(serde::Deserialize)]
        struct Verdict {
            ok: bool,
        }
        let mut result = result_with(vec![]);
        result.final_output = json!({"ok": true});
        let verdict: Verdict = result.final_output_as().unwrap();
        assert!(verdict.ok);
    }
}
