// SPDX-License-Identifier: MIT
use whisper_tools::ToolCall;

/// Lifecycle events emitted by the AI Interaction Loop. The Session Monitor
/// subscribes to these to build its per-session metrics.
#[derive(Debug, Clone)]
pub enum AiLoopEvent {
    AiLoopStarted { session_id: String },
    AiRequestPrepared { session_id: String },
    AiResponseReceived { session_id: String, elapsed_ms: u64 },
    ToolExecutionStart { session_id: String, call: ToolCall },
    ToolExecutionEnd { session_id: String, call_id: String, tool_name: String, is_error: bool },
    AiLoopErrorOccurred { session_id: String, kind: String, message: String },
    AiLoopStopped { session_id: String, reason: String },
}

impl AiLoopEvent {
    pub fn session_id(&self) -> &str {
        match self {
            AiLoopEvent::AiLoopStarted { session_id }
            | AiLoopEvent::AiRequestPrepared { session_id }
            | AiLoopEvent::AiResponseReceived { session_id, .. }
            | AiLoopEvent::ToolExecutionStart { session_id, .. }
            | AiLoopEvent::ToolExecutionEnd { session_id, .. }
            | AiLoopEvent::AiLoopErrorOccurred { session_id, .. }
            | AiLoopEvent::AiLoopStopped { session_id, .. } => session_id,
        }
    }
}
