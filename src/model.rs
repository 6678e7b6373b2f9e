//! Model providers.
//!
//! The runner talks to models through [`ModelProvider`], a single-request
//! interface over [`ModelRequest`]. Requests carry plain tool declarations
//! rather than executable tools, so providers stay independent of the run
//! context type. [`OpenAIProvider`] wraps the async-openai chat completions
//! API; [`ScriptedProvider`] replays a queue of canned responses and records
//! every request it receives, for tests.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionNamedToolChoice, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolChoiceOption,
        ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionName, FunctionObjectArgs,
        ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::trace;

use crate::agent::ToolChoice;
use crate::error::{AgentsError, Result};
use crate::items::{Message, ModelResponse, Role, ToolCall};
use crate::tool::ToolSchema;
use crate::usage::Usage;

/// One model call, fully assembled by the runner.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
    pub tool_choice: ToolChoice,
    /// JSON schema constraining the response content, when the active agent
    /// requests structured output.
    pub output_schema: Option<Value>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn complete(&self, request: ModelRequest) -> Result<(ModelResponse, Usage)>;
}

/// OpenAI chat completions provider.
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Client configured from the environment (`OPENAI_API_KEY`).
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }

    fn convert_message(msg: &Message) -> Result<ChatCompletionRequestMessage> {
        let converted = match msg.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(msg.content.clone())
                .build()
                .map_err(AgentsError::from)?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(msg.content.clone())
                .build()
                .map_err(AgentsError::from)?
                .into(),
            Role::Assistant => {
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                builder.content(msg.content.clone());
                if let Some(tool_calls) = &msg.tool_calls {
                    let converted: Vec<_> = tool_calls
                        .iter()
                        .map(|tc| async_openai::types::ChatCompletionMessageToolCall {
                            id: tc.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: async_openai::types::FunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.to_string(),
                            },
                        })
                        .collect();
                    builder.tool_calls(converted);
                }
                builder.build().map_err(AgentsError::from)?.into()
            }
            Role::Tool => ChatCompletionRequestToolMessageArgs::default()
                .content(msg.content.clone())
                .tool_call_id(msg.tool_call_id.clone().unwrap_or_default())
                .build()
                .map_err(AgentsError::from)?
                .into(),
        };
        Ok(converted)
    }

    fn convert_tools(tools: &[ToolSchema]) -> Result<Vec<ChatCompletionTool>> {
        tools
            .iter()
            .map(|tool| {
                Ok(ChatCompletionToolArgs::default()
                    .r#type(ChatCompletionToolType::Function)
                    .function(
                        FunctionObjectArgs::default()
                            .name(&tool.name)
                            .description(&tool.description)
                            .parameters(tool.parameters.clone())
                            .build()
                            .map_err(AgentsError::from)?,
                    )
                    .build()
                    .map_err(AgentsError::from)?)
            })
            .collect()
    }

    fn convert_tool_choice(choice: &ToolChoice) -> ChatCompletionToolChoiceOption {
        match choice {
            ToolChoice::Auto => ChatCompletionToolChoiceOption::Auto,
            ToolChoice::Required => ChatCompletionToolChoiceOption::Required,
            ToolChoice::None => ChatCompletionToolChoiceOption::None,
            ToolChoice::Specific(name) => {
                ChatCompletionToolChoiceOption::Named(ChatCompletionNamedToolChoice {
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionName { name: name.clone() },
                })
            }
        }
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    async fn complete(&self, request: ModelRequest) -> Result<(ModelResponse, Usage)> {
        let messages: Vec<ChatCompletionRequestMessage> = request
            .messages
            .iter()
            .map(Self::convert_message)
            .collect::<Result<_>>()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&request.model).messages(messages);

        if !request.tools.is_empty() {
            builder.tools(Self::convert_tools(&request.tools)?);
            builder.tool_choice(Self::convert_tool_choice(&request.tool_choice));
        }

        if let Some(schema) = &request.output_schema {
            builder.response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: "final_output".to_string(),
                    description: None,
                    schema: Some(schema.clone()),
                    strict: Some(true),
                },
            });
        }

        if let Some(temp) = request.temperature {
            builder.temperature(temp);
        }
        if let Some(max) = request.max_tokens {
            builder.max_tokens(max);
        }

        trace!(model = %request.model, messages = request.messages.len(), "model request");
        let response = self.client.chat().create(builder.build()?).await?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| AgentsError::ModelBehaviorError {
                message: "model returned no choices".to_string(),
            })?;

        let tool_calls = choice
            .message
            .tool_calls
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|tc| {
                Ok(ToolCall {
                    id: tc.id.clone(),
                    name: tc.function.name.clone(),
                    arguments: serde_json::from_str(&tc.function.arguments).map_err(|e| {
                        AgentsError::ModelBehaviorError {
                            message: format!(
                                "tool call '{}' carried malformed JSON arguments: {e}",
                                tc.function.name
                            ),
                        }
                    })?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let model_response = ModelResponse {
            id: response.id.clone(),
            content: choice.message.content.clone(),
            reasoning: None,
            tool_calls,
            finish_reason: choice.finish_reason.as_ref().map(|r| format!("{r:?}")),
            created_at: chrono::Utc::now(),
        };

        let usage = response
            .usage
            .map(|u| Usage::new(u.prompt_tokens as usize, u.completion_tokens as usize))
            .unwrap_or_else(Usage::empty);

        Ok((model_response, usage))
    }
}

/// Test provider: replays a queue of canned responses and records every
/// request. When the queue runs dry it answers with a plain "OK" message, so
/// loop-shaped tests can over-run their script without panicking.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<Vec<ModelResponse>>,
    requests: Mutex<Vec<ModelRequest>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: ModelResponse) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn with_message(self, content: impl Into<String>) -> Self {
        self.with_response(ModelResponse::new_message(content))
    }

    pub fn with_tool_call(self, tool_name: impl Into<String>, args: Value) -> Self {
        self.with_response(ModelResponse::new_tool_calls(vec![ToolCall {
            id: uuid::Uuid::new_v4().to_string(),
            name: tool_name.into(),
            arguments: args,
        }]))
    }

    /// Number of completed model calls.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of every request received, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn complete(&self, request: ModelRequest) -> Result<(ModelResponse, Usage)> {
        self.requests.lock().unwrap().push(request);
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut responses = self.responses.lock().unwrap();
        let response = if responses.is_empty() {
            ModelResponse::new_message("OK")
        } else {
            responses.remove(0)
        };
        Ok((response, Usage::new(10, 5)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn request(messages: Vec<Message>) -> ModelRequest {
        ModelRequest {
            model: "gpt-4o".to_string(),
            messages,
            tools: vec![],
            tool_choice: ToolChoice::Auto,
            output_schema: None,
            temperature: None,
            max_tokens: None,
        }
    }

    #[test]
    fn test_message_conversion_roundtrips_roles() {
        for msg in [
            Message::system("rules"),
            Message::user("hello"),
            Message::assistant("hi"),
            Message::tool("result", "call_1"),
        ] {
            OpenAIProvider::convert_message(&msg).unwrap();
        }
    }

    #[test]
    fn test_tool_conversion() {
        let tools = vec![ToolSchema {
            name: "add".to_string(),
            description: "Add numbers".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let converted = OpenAIProvider::convert_tools(&tools).unwrap();
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].function.name, "add");
    }

    #[test]
    fn test_tool_choice_conversion() {
        assert!(matches!(
            OpenAIProvider::convert_tool_choice(&ToolChoice::Required),
            ChatCompletionToolChoiceOption::Required
        ));
        assert!(matches!(
            OpenAIProvider::convert_tool_choice(&ToolChoice::Specific("add".to_string())),
            ChatCompletionToolChoiceOption::Named(_)
        ));
    }

    #[tokio::test]
    async fn test_scripted_provider_queue_and_capture() {
        let provider = ScriptedProvider::new()
            .with_message("first")
            .with_tool_call("add", json!({"a": 1, "b": 2}));

        let (r1, usage) = provider.complete(request(vec![Message::user("q1")])).await.unwrap();
        assert_eq!(r1.content.as_deref(), Some("first"));
        assert_eq!(usage.total_tokens, 15);

        let (r2, _) = provider.complete(request(vec![Message::user("q2")])).await.unwrap();
        assert_eq!(r2.tool_calls[0].name, "add");

        // Exhausted queue falls back to a plain message.
        let (r3, _) = provider.complete(request(vec![])).await.unwrap();
        assert_eq!(r3.content.as_deref(), Some("OK"));

        assert_eq!(provider.call_count(), 3);
        let captured = provider.requests();
        assert_eq!(captured.len(), 3);
        assert_eq!(captured[0].messages[0].content, "q1");
    }
}
