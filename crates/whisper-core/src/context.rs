// SPDX-License-Identifier: MIT
use whisper_model::Message;

/// The Context Store: an ordered, per-task message history.
/// No deduplication or compression happens here — callers own window policy.
#[derive(Debug, Default)]
pub struct Context {
    messages: Vec<Message>,
    token_count: usize,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: Message) {
        self.token_count += message.approx_tokens();
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.token_count = 0;
    }

    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, whisper_model::Role::Assistant))
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }
}
