// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::provider::ModelProvider;
use crate::types::{CompletionRequest, CompletionResponse, Message};

/// Echoes the last user message back as plain text with `finish_reason: stop`.
/// Useful as the default provider in tests that don't care about model output.
#[derive(Debug, Default)]
pub struct MockProvider;

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find_map(|m| m.as_text().map(|t| t.to_string()))
            .unwrap_or_default();
        Ok(CompletionResponse {
            message: Message::assistant(format!("echo: {last_user}")),
            finish_reason: Some("stop".to_string()),
        })
    }
}

/// Returns a fixed queue of responses, one per call, and records the last
/// request it was given. Lets the AI Loop's state-machine transitions be
/// driven deterministically in tests.
pub struct ScriptedMockProvider {
    responses: Mutex<Vec<CompletionResponse>>,
    last_request: Arc<Mutex<Option<CompletionRequest>>>,
}

impl ScriptedMockProvider {
    pub fn new(mut responses: Vec<CompletionResponse>) -> Self {
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedMockProvider {
    fn name(&self) -> &str {
        "scripted-mock"
    }

    async fn complete(&self, request: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        *self.last_request.lock().unwrap() = Some(request);
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| anyhow::anyhow!("scripted provider exhausted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_provider_echoes_last_user_message() {
        let provider = MockProvider;
        let req = CompletionRequest {
            model: "x".into(),
            temperature: 0.0,
            messages: vec![Message::user("hello")],
            tools: vec![],
            tool_choice: "auto".into(),
        };
        let resp = provider.complete(req).await.unwrap();
        assert_eq!(resp.message.as_text(), Some("echo: hello"));
        assert!(resp.is_stop());
    }

    #[tokio::test]
    async fn scripted_provider_pops_in_order_and_records_request() {
        let provider = ScriptedMockProvider::new(vec![
            CompletionResponse { message: Message::assistant("first"), finish_reason: Some("stop".into()) },
            CompletionResponse { message: Message::assistant("second"), finish_reason: Some("stop".into()) },
        ]);
        let req = CompletionRequest {
            model: "x".into(),
            temperature: 0.0,
            messages: vec![Message::user("hi")],
            tools: vec![],
            tool_choice: "auto".into(),
        };
        let r1 = provider.complete(req.clone()).await.unwrap();
        assert_eq!(r1.message.as_text(), Some("first"));
        let r2 = provider.complete(req).await.unwrap();
        assert_eq!(r2.message.as_text(), Some("second"));
        assert!(provider.last_request().is_some());
    }

    #[tokio::test]
    async fn scripted_provider_errors_when_exhausted() {
        let provider = ScriptedMockProvider::new(vec![]);
        let req = CompletionRequest {
            model: "x".into(),
            temperature: 0.0,
            messages: vec![],
            tools: vec![],
            tool_choice: "auto".into(),
        };
        assert!(provider.complete(req).await.is_err());
    }
}
