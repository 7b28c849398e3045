// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{json, Value};

use whisper_config::path_is_contained;

use crate::policy::ApprovalPolicy;
use crate::tool::ErrorType;
use crate::{Tool, ToolCall, ToolOutput};

/// Lists entries directly under a directory inside the workspace root.
pub struct ListFilesTool {
    pub root: PathBuf,
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and directories under a path relative to the workspace root"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"],
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Auto
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let Some(rel) = call.args.get("path").and_then(Value::as_str) else {
            return ToolOutput::err(&call.id, "missing required argument: path");
        };
        let rel_path = PathBuf::from(rel);
        if !path_is_contained(&rel_path) {
            return ToolOutput::err_typed(&call.id, ErrorType::InvalidPath, format!("path escapes workspace root: {rel}"))
                .with_suggestions(["use a path relative to the workspace root, without `..` components"]);
        }
        let target = self.root.join(&rel_path);
        let mut entries = match tokio::fs::read_dir(&target).await {
            Ok(r) => r,
            Err(e) => return ToolOutput::err_typed(&call.id, ErrorType::from_io_error(&e), format!("reading {rel}: {e}")),
        };
        let mut names = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => names.push(entry.file_name().to_string_lossy().to_string()),
                Ok(None) => break,
                Err(e) => return ToolOutput::err_typed(&call.id, ErrorType::from_io_error(&e), format!("reading {rel}: {e}")),
            }
        }
        names.sort();
        ToolOutput::ok(&call.id, names.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_sorted_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        let tool = ListFilesTool { root: dir.path().to_path_buf() };
        let call = ToolCall { id: "1".into(), name: "list_files".into(), args: json!({"path": "."}) };
        let out = tool.execute(&call).await;
        assert!(!out.is_error);
        assert_eq!(out.content, "a.txt\nb.txt");
    }

    #[tokio::test]
    async fn rejects_path_escape() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ListFilesTool { root: dir.path().to_path_buf() };
        let call = ToolCall { id: "1".into(), name: "list_files".into(), args: json!({"path": "../etc"}) };
        let out = tool.execute(&call).await;
        assert!(out.is_error);
    }

    #[tokio::test]
    async fn missing_argument_errors() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ListFilesTool { root: dir.path().to_path_buf() };
        let call = ToolCall { id: "1".into(), name: "list_files".into(), args: json!({}) };
        let out = tool.execute(&call).await;
        assert!(out.is_error);
    }
}
