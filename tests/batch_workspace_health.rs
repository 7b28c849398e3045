// SPDX-License-Identifier: MIT
//! Drives the Workspace health-check runner over a directory of real batch
//! scripts against a registry of real filesystem tools, rather than the
//! single-script/empty-registry setups covered by whisper-workspace's own
//! unit tests.

use std::sync::Arc;

use whisper_config::ToolsConfig;
use whisper_tools::{CreateFileTool, ListFilesTool, ReadFileTool, ToolPolicy, ToolRegistry, WriteFileTool};
use whisper_workspace::{run_health_check, ScriptOutcome};

fn registry(root: std::path::PathBuf) -> Arc<ToolRegistry> {
    let policy = ToolPolicy::from_config(&ToolsConfig {
        allow_list: vec!["list_files".into(), "read_file".into(), "write_file".into(), "create_file".into()],
        deny_list: vec![],
        deadline_secs: 5,
    });
    let mut reg = ToolRegistry::new(policy);
    reg.register(ListFilesTool { root: root.clone() });
    reg.register(ReadFileTool { root: root.clone() });
    reg.register(WriteFileTool { root: root.clone() });
    reg.register(CreateFileTool { root });
    Arc::new(reg)
}

#[tokio::test]
async fn mixed_directory_of_scripts_reports_pass_fail_and_error() {
    let workspace = tempfile::tempdir().unwrap();
    std::fs::write(workspace.path().join("notes.txt"), "hello").unwrap();

    let scripts_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        scripts_dir.path().join("read_ok.json"),
        r#"{"name":"read_ok","steps":[{"action":"read_file","params":{"path":"notes.txt"}}]}"#,
    )
    .unwrap();
    std::fs::write(
        scripts_dir.path().join("denied.json"),
        r#"{"name":"denied","steps":[{"action":"delete_file","params":{"path":"notes.txt"}}]}"#,
    )
    .unwrap();
    std::fs::write(scripts_dir.path().join("broken.json"), "{ not json").unwrap();

    let report = run_health_check(scripts_dir.path(), registry(workspace.path().to_path_buf()), vec![
        "list_files".into(),
        "read_file".into(),
        "write_file".into(),
        "create_file".into(),
    ], vec![], 5)
    .await;

    assert_eq!(report.total, 3);
    assert_eq!(report.passed, 1);
    assert!(report.failed + report.error >= 2);
    assert!(report.results.iter().any(|r| r.script.ends_with("read_ok.json") && r.outcome == ScriptOutcome::Passed));
    assert!(report.results.iter().any(|r| r.script.ends_with("broken.json") && r.outcome == ScriptOutcome::Error));
    assert!(report.score() < 100.0 && report.score() > 0.0);
}

#[tokio::test]
async fn list_files_script_passes_against_real_workspace_tree() {
    let workspace = tempfile::tempdir().unwrap();
    std::fs::write(workspace.path().join("a.txt"), "a").unwrap();
    std::fs::write(workspace.path().join("b.txt"), "b").unwrap();

    let scripts_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        scripts_dir.path().join("list.json"),
        r#"{"name":"list","steps":[{"action":"list_files","params":{"path":"."}}]}"#,
    )
    .unwrap();

    let report = run_health_check(
        scripts_dir.path(),
        registry(workspace.path().to_path_buf()),
        vec!["list_files".into()],
        vec![],
        5,
    )
    .await;

    assert_eq!(report.total, 1);
    assert_eq!(report.passed, 1);
    assert_eq!(report.score(), 100.0);
}
