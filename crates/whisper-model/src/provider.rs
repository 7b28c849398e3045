// SPDX-License-Identifier: MIT
use async_trait::async_trait;

use crate::types::{CompletionRequest, CompletionResponse};

/// A chat-completion endpoint. The AI Interaction Loop is the only caller;
/// everything beyond request/response shape is external.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> anyhow::Result<CompletionResponse>;
}
