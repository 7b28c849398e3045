// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{json, Value};

use whisper_config::path_is_contained;

use crate::policy::ApprovalPolicy;
use crate::tool::ErrorType;
use crate::{Tool, ToolCall, ToolOutput};

/// Reads a UTF-8 text file from inside the workspace root.
pub struct ReadFileTool {
    pub root: PathBuf,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the full contents of a text file relative to the workspace root"
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
        match tokio::fs::read_to_string(self.root.join(&rel_path)).await {
            Ok(text) => ToolOutput::ok(&call.id, text),
            Err(e) => ToolOutput::err_typed(&call.id, ErrorType::from_io_error(&e), format!("reading {rel}: {e}"))
                .with_suggestions(["check the path with list_files"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hi there").unwrap();
        let tool = ReadFileTool { root: dir.path().to_path_buf() };
        let call = ToolCall { id: "1".into(), name: "read_file".into(), args: json!({"path": "hello.txt"}) };
        let out = tool.execute(&call).await;
        assert!(!out.is_error);
        assert_eq!(out.content, "hi there");
    }

    #[tokio::test]
    async fn missing_file_is_nonfatal_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool { root: dir.path().to_path_buf() };
        let call = ToolCall { id: "1".into(), name: "read_file".into(), args: json!({"path": "missing.txt"}) };
        let out = tool.execute(&call).await;
        assert!(out.is_error);
    }

    #[tokio::test]
    async fn rejects_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool { root: dir.path().to_path_buf() };
        let call = ToolCall { id: "1".into(), name: "read_file".into(), args: json!({"path": "/etc/passwd"}) };
        let out = tool.execute(&call).await;
        assert!(out.is_error);
    }
}
