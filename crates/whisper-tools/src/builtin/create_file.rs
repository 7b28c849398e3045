// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{json, Value};

use whisper_config::path_is_contained;

use crate::policy::ApprovalPolicy;
use crate::tool::ErrorType;
use crate::{Tool, ToolCall, ToolOutput};

/// Creates a new text file inside the workspace root, failing if it exists.
pub struct CreateFileTool {
    pub root: PathBuf,
}

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &str {
        "create_file"
    }

    fn description(&self) -> &str {
        "Create a new file relative to the workspace root; fails if it already exists"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "content": { "type": "string" },
            },
            "required": ["path"],
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let Some(rel) = call.args.get("path").and_then(Value::as_str) else {
            return ToolOutput::err(&call.id, "missing required argument: path");
        };
        let content = call.args.get("content").and_then(Value::as_str).unwrap_or("");
        let rel_path = PathBuf::from(rel);
        if !path_is_contained(&rel_path) {
            return ToolOutput::err_typed(&call.id, ErrorType::InvalidPath, format!("path escapes workspace root: {rel}"))
                .with_suggestions(["use a path relative to the workspace root, without `..` components"]);
        }
        let target = self.root.join(&rel_path);
        if target.exists() {
            return ToolOutput::err_typed(&call.id, ErrorType::ToolExecutionError, format!("{rel} already exists; use write_file"))
                .with_suggestions(["call write_file to overwrite an existing file"]);
        }
        if let Some(parent) = target.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ToolOutput::err_typed(&call.id, ErrorType::from_io_error(&e), format!("creating parent dirs for {rel}: {e}"));
            }
        }
        match tokio::fs::write(&target, content).await {
            Ok(()) => ToolOutput::ok(&call.id, format!("created {rel}")),
            Err(e) => ToolOutput::err_typed(&call.id, ErrorType::from_io_error(&e), format!("creating {rel}: {e}")),
        }
    }
}
