// SPDX-License-Identifier: MIT
//! Wires a real AI Loop run straight into a background Session Monitor task
//! and the global Intervention Orchestrator, with no manual draining or
//! synchronous detector/executor calls in between.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use whisper_config::{InterventionConfig, MonitorConfig, ToolsConfig};
use whisper_core::{AiLoop, LoopControl};
use whisper_model::{CompletionResponse, FunctionCall, Message, ScriptedMockProvider, ToolCallRequest};
use whisper_monitor::{spawn_intervention_orchestrator, SessionSupervisor};
use whisper_tools::{ReadFileTool, ToolPolicy, ToolRegistry};

fn registry(root: std::path::PathBuf) -> Arc<ToolRegistry> {
    let policy = ToolPolicy::from_config(&ToolsConfig::default());
    let mut reg = ToolRegistry::new(policy);
    reg.register(ReadFileTool { root });
    Arc::new(reg)
}

#[tokio::test]
async fn live_ai_loop_events_drive_automatic_intervention() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("f.txt"), "data").unwrap();

    let repeat_call = || CompletionResponse {
        message: Message::assistant_tool_calls(vec![ToolCallRequest {
            id: "call".into(),
            function: FunctionCall { name: "read_file".into(), arguments: r#"{"path":"f.txt"}"#.into() },
        }]),
        finish_reason: Some("tool_calls".into()),
    };
    let provider = Arc::new(ScriptedMockProvider::new((0..6).map(|_| repeat_call()).collect()));

    let (event_tx, event_rx) = mpsc::channel(64);
    let ai_loop = AiLoop::new(provider, registry(dir.path().to_path_buf()), "preamble", "mock-model", 0.0, 10, event_tx);
    let session_id = ai_loop.session_id().to_string();

    let monitor_config = MonitorConfig { tool_loop_window: 10, tool_loop_repeat: 3, ..MonitorConfig::default() };
    let (alert_tx, alert_rx) = mpsc::channel(16);
    let (record_tx, mut record_rx) = mpsc::channel(16);

    let supervisor =
        SessionSupervisor::spawn_with_interval(session_id, monitor_config, Duration::from_millis(20), event_rx, alert_tx);
    let orchestrator = spawn_intervention_orchestrator(InterventionConfig::default(), alert_rx, record_tx);

    let run_handle = tokio::spawn(async move { ai_loop.run("keep reading the file", &LoopControl::new()).await });
    let _ = run_handle.await;

    let record = tokio::time::timeout(Duration::from_secs(2), record_rx.recv()).await.unwrap().unwrap();
    assert_eq!(record.strategy.as_str(), "state_reset");

    supervisor.shutdown().await;
    orchestrator.stop().await;
}
