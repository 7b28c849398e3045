// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

/// Message role, mirroring the OpenAI chat-completion wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single tool call requested by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub function: FunctionCall,
}

/// The function name and stringified JSON arguments of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON text. Left unparsed here — the AI Loop parses it and fails
    /// the whole turn as `tool_args_invalid` on malformed JSON.
    pub arguments: String,
}

/// A single message in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    /// Present only on `role: tool` messages; links back to the assistant
    /// tool call that produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: Role::System, content: Some(text.into()), tool_calls: None, tool_call_id: None }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: Some(text.into()), tool_calls: None, tool_call_id: None }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: Some(text.into()), tool_calls: None, tool_call_id: None }
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self { role: Role::Assistant, content: None, tool_calls: Some(calls), tool_call_id: None }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|v| !v.is_empty())
    }

    pub fn as_text(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Coarse token estimate (~4 chars/token) used for context-window
    /// accounting. Not a tokenizer — good enough to trigger budgeting
    /// decisions without depending on a model-specific vocabulary.
    pub fn approx_tokens(&self) -> usize {
        let text_len = self.content.as_deref().unwrap_or_default().len();
        let calls_len: usize = self
            .tool_calls
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|c| c.function.name.len() + c.function.arguments.len())
            .sum();
        (text_len + calls_len).div_ceil(4)
    }
}

/// The JSON-Schema projection of a tool, as sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A chat-completion request, non-streaming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
    pub tool_choice: String,
}

/// The assistant response to a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub message: Message,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl CompletionResponse {
    pub fn is_stop(&self) -> bool {
        self.finish_reason.as_deref() == Some("stop")
    }
}
