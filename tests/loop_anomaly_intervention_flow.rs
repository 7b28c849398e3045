// SPDX-License-Identifier: MIT
//! Feeds AI Interaction Loop tool-execution events into the Session Monitor
//! and Intervention Engine, mirroring how a live session's event stream
//! would be consumed outside the loop itself.

use std::sync::Arc;

use tokio::sync::mpsc;

use whisper_config::{MonitorConfig, ToolsConfig};
use whisper_core::{AiLoop, AiLoopEvent, LoopControl};
use whisper_model::{CompletionResponse, FunctionCall, Message, ScriptedMockProvider, ToolCallRequest};
use whisper_monitor::{AnomalyDetector, AlertKind, BaselineTracker, InterventionExecutor, InterventionOutcome, SessionMetrics};
use whisper_tools::{ReadFileTool, ToolPolicy, ToolRegistry};

fn registry(root: std::path::PathBuf) -> Arc<ToolRegistry> {
    let policy = ToolPolicy::from_config(&ToolsConfig::default());
    let mut reg = ToolRegistry::new(policy);
    reg.register(ReadFileTool { root });
    Arc::new(reg)
}

#[tokio::test]
async fn repeated_tool_calls_trigger_anomaly_and_get_resolved() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("f.txt"), "data").unwrap();

    let repeat_call = || CompletionResponse {
        message: Message::assistant_tool_calls(vec![ToolCallRequest {
            id: "call".into(),
            function: FunctionCall { name: "read_file".into(), arguments: r#"{"path":"f.txt"}"#.into() },
        }]),
        finish_reason: Some("tool_calls".into()),
    };
    // Six identical tool calls trip the default tool_loop_repeat (5) before
    // the loop's own consecutive-call budget (set high here) intervenes.
    let provider = Arc::new(ScriptedMockProvider::new((0..6).map(|_| repeat_call()).collect()));

    let (tx, mut rx) = mpsc::channel(64);
    let ai_loop = AiLoop::new(provider, registry(dir.path().to_path_buf()), "preamble", "mock-model", 0.0, 10, tx);

    let session_id = ai_loop.session_id().to_string();
    let run_handle = tokio::spawn(async move { ai_loop.run("keep reading the file", &LoopControl::new()).await });

    let mut tool_events = Vec::new();
    while let Some(event) = rx.recv().await {
        if let AiLoopEvent::ToolExecutionStart { call, .. } = event {
            tool_events.push(call.name);
        }
    }
    let _ = run_handle.await;
    assert!(tool_events.len() >= 5, "expected at least 5 tool executions, got {}", tool_events.len());

    let metrics = SessionMetrics::new(session_id.clone(), 100);
    let mut baselines = BaselineTracker::new(0.1);
    let detector = AnomalyDetector::new(MonitorConfig::default());
    let alerts = detector.analyze(&metrics, &tool_events, &mut baselines);
    assert!(alerts.iter().any(|a| a.kind == AlertKind::ToolLoop), "expected a tool_loop alert");

    let alert = alerts.into_iter().find(|a| a.kind == AlertKind::ToolLoop).unwrap();
    let mut executor = InterventionExecutor::new(whisper_config::InterventionConfig::default());
    let records = executor.intervene(&alert);
    // tool_loop's strategy table is [state_reset, escalate]; state_reset
    // always succeeds on a fresh session, so recovery stops there.
    assert_eq!(records[0].outcome, InterventionOutcome::Success);
}
