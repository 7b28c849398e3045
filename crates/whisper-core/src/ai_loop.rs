// SPDX-License-Identifier: MIT
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Notify};
use tracing::warn;
use uuid::Uuid;

use whisper_model::{CompletionRequest, FunctionCall, Message, ModelProvider, ToolCallRequest};
use whisper_tools::{ToolCall, ToolRegistry};

use crate::context::Context;
use crate::events::AiLoopEvent;

/// Terminal outcome of one AI Interaction Loop run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    Stopped { final_text: String },
    Failed { kind: &'static str, message: String },
    Cancelled,
}

/// External control signals a caller can use to pause/resume or stop a
/// running loop from any state.
#[derive(Clone)]
pub struct LoopControl {
    paused: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
    resume: Arc<Notify>,
}

impl LoopControl {
    pub fn new() -> Self {
        Self { paused: Arc::new(AtomicBool::new(false)), stopping: Arc::new(AtomicBool::new(false)), resume: Arc::new(Notify::new()) }
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.resume.notify_waiters();
    }

    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.resume.notify_waiters();
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    async fn wait_if_paused(&self) {
        while self.paused.load(Ordering::SeqCst) && !self.stopping.load(Ordering::SeqCst) {
            self.resume.notified().await;
        }
    }
}

impl Default for LoopControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one task from initial prompt to termination: send, execute tool
/// calls, repeat until `stop`, a fatal error, or cancellation.
pub struct AiLoop {
    session_id: String,
    model: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    system_preamble: String,
    model_name: String,
    temperature: f32,
    max_consecutive_tool_calls: usize,
    events: mpsc::Sender<AiLoopEvent>,
}

impl AiLoop {
    pub fn new(
        model: Arc<dyn ModelProvider>,
        tools: Arc<ToolRegistry>,
        system_preamble: impl Into<String>,
        model_name: impl Into<String>,
        temperature: f32,
        max_consecutive_tool_calls: usize,
        events: mpsc::Sender<AiLoopEvent>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            model,
            tools,
            system_preamble: system_preamble.into(),
            model_name: model_name.into(),
            temperature,
            max_consecutive_tool_calls,
            events,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Build the fixed preamble plus every registered tool's usage
    /// instructions.
    fn system_prompt(&self) -> String {
        let mut prompt = self.system_preamble.clone();
        for schema in self.tools.schemas() {
            prompt.push_str(&format!("\n\n## {}\n{}", schema.name, schema.description));
        }
        prompt
    }

    async fn emit(&self, event: AiLoopEvent) {
        let _ = self.events.send(event).await;
    }

    /// Run the loop to completion for a single initial prompt.
    pub async fn run(&self, initial_prompt: &str, control: &LoopControl) -> LoopOutcome {
        let mut ctx = Context::new();
        ctx.add(Message::system(self.system_prompt()));
        ctx.add(Message::user(initial_prompt));

        self.emit(AiLoopEvent::AiLoopStarted { session_id: self.session_id.clone() }).await;

        let mut consecutive_tool_calls = 0usize;

        loop {
            control.wait_if_paused().await;
            if control.is_stopping() {
                self.emit(AiLoopEvent::AiLoopStopped {
                    session_id: self.session_id.clone(),
                    reason: "stop_requested".into(),
                })
                .await;
                return LoopOutcome::Cancelled;
            }

            let request = CompletionRequest {
                model: self.model_name.clone(),
                temperature: self.temperature,
                messages: ctx.history().to_vec(),
                tools: self.tools.schemas().into_iter().map(|s| whisper_model::ToolSchema {
                    name: s.name,
                    description: s.description,
                    parameters: s.parameters,
                }).collect(),
                tool_choice: "auto".to_string(),
            };
            self.emit(AiLoopEvent::AiRequestPrepared { session_id: self.session_id.clone() }).await;

            let started = Instant::now();
            let response = match self.model.complete(request).await {
                Ok(r) => r,
                Err(e) => {
                    self.emit(AiLoopEvent::AiLoopErrorOccurred {
                        session_id: self.session_id.clone(),
                        kind: "llm_call_failure".into(),
                        message: e.to_string(),
                    })
                    .await;
                    return LoopOutcome::Failed { kind: "llm_call_failure", message: e.to_string() };
                }
            };
            self.emit(AiLoopEvent::AiResponseReceived {
                session_id: self.session_id.clone(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            })
            .await;

            ctx.add(response.message.clone());

            if response.message.has_tool_calls() {
                consecutive_tool_calls += 1;
                if consecutive_tool_calls > self.max_consecutive_tool_calls {
                    self.emit(AiLoopEvent::AiLoopErrorOccurred {
                        session_id: self.session_id.clone(),
                        kind: "tool_loop_limit".into(),
                        message: format!("exceeded {} consecutive tool-only turns", self.max_consecutive_tool_calls),
                    })
                    .await;
                    return LoopOutcome::Failed {
                        kind: "tool_loop_limit",
                        message: "consecutive tool-call limit exceeded".to_string(),
                    };
                }

                let calls = response.message.tool_calls.clone().unwrap_or_default();
                match self.execute_tool_calls(&calls).await {
                    Ok(results) => {
                        for (call_id, content) in results {
                            ctx.add(Message::tool_result(call_id, content));
                        }
                    }
                    Err((kind, message)) => {
                        self.emit(AiLoopEvent::AiLoopErrorOccurred {
                            session_id: self.session_id.clone(),
                            kind: kind.to_string(),
                            message: message.clone(),
                        })
                        .await;
                        return LoopOutcome::Failed { kind, message };
                    }
                }
                continue;
            }

            let has_content = response.message.as_text().map(|t| !t.is_empty()).unwrap_or(false);
            if has_content || response.is_stop() {
                consecutive_tool_calls = 0;
                let text = response.message.as_text().unwrap_or_default().to_string();

                if let Some((name, args)) = parse_legacy_inline_call(&text) {
                    if let Some(tool) = self.tools.get(&name) {
                        let call = ToolCall { id: format!("fallback_{name}"), name: name.clone(), args };
                        self.emit(AiLoopEvent::ToolExecutionStart {
                            session_id: self.session_id.clone(),
                            call: call.clone(),
                        })
                        .await;
                        let output = tool.execute(&call).await;
                        self.emit(AiLoopEvent::ToolExecutionEnd {
                            session_id: self.session_id.clone(),
                            call_id: call.id.clone(),
                            tool_name: name.clone(),
                            is_error: output.is_error,
                        })
                        .await;
                        ctx.add(Message::tool_result(call.id, output.content));
                        self.emit(AiLoopEvent::AiLoopStopped {
                            session_id: self.session_id.clone(),
                            reason: "legacy_inline_tool".into(),
                        })
                        .await;
                        return LoopOutcome::Stopped { final_text: text };
                    }
                }

                self.emit(AiLoopEvent::AiLoopStopped {
                    session_id: self.session_id.clone(),
                    reason: "stop".into(),
                })
                .await;
                return LoopOutcome::Stopped { final_text: text };
            }

            self.emit(AiLoopEvent::AiLoopErrorOccurred {
                session_id: self.session_id.clone(),
                kind: "unexpected_response".into(),
                message: "assistant message had no tool_calls, no content, and finish_reason != stop".into(),
            })
            .await;
            return LoopOutcome::Failed {
                kind: "unexpected_response",
                message: "assistant response had neither tool calls nor content".to_string(),
            };
        }
    }

    /// Parses and dispatches every call in order, returning `(call_id,
    /// content)` pairs in the same order. A JSON-parse failure on any
    /// single call fails the whole turn as `tool_args_invalid`; tool-level
    /// failures are folded into the per-call result instead of aborting
    /// the turn.
    async fn execute_tool_calls(
        &self,
        calls: &[ToolCallRequest],
    ) -> Result<Vec<(String, String)>, (&'static str, String)> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let args: serde_json::Value = serde_json::from_str(&call.function.arguments).map_err(|e| {
                (
                    "tool_args_invalid",
                    format!("arguments for {} are not valid JSON: {e}", call.function.name),
                )
            })?;
            let tool_call = ToolCall { id: call.id.clone(), name: call.function.name.clone(), args };
            self.emit(AiLoopEvent::ToolExecutionStart {
                session_id: self.session_id.clone(),
                call: tool_call.clone(),
            })
            .await;
            let output = self.tools.execute(&tool_call).await;
            self.emit(AiLoopEvent::ToolExecutionEnd {
                session_id: self.session_id.clone(),
                call_id: tool_call.id.clone(),
                tool_name: tool_call.name.clone(),
                is_error: output.is_error,
            })
            .await;
            if output.is_error {
                warn!(tool = %tool_call.name, "tool execution failed");
            }
            results.push((tool_call.id, output.content));
        }
        Ok(results)
    }
}

/// Recognises the legacy transitional `identifier(key=val, ...)` shape
/// as a fallback for models that don't emit structured tool calls.
/// Returns `None` for anything else, including ordinary prose that
/// merely contains parentheses.
fn parse_legacy_inline_call(text: &str) -> Option<(String, serde_json::Value)> {
    let text = text.trim();
    let open = text.find('(')?;
    if !text.ends_with(')') {
        return None;
    }
    let name = &text[..open];
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    let inner = &text[open + 1..text.len() - 1];
    let mut map = serde_json::Map::new();
    if !inner.trim().is_empty() {
        for pair in inner.split(',') {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?.trim();
            let val = parts.next()?.trim();
            if key.is_empty() {
                return None;
            }
            map.insert(key.to_string(), serde_json::Value::String(val.trim_matches('"').to_string()));
        }
    }
    Some((name.to_string(), serde_json::Value::Object(map)))
}
