// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{json, Value};

use whisper_config::path_is_contained;

use crate::policy::ApprovalPolicy;
use crate::tool::ErrorType;
use crate::{Tool, ToolCall, ToolOutput};

/// Overwrites an existing text file inside the workspace root.
pub struct WriteFileTool {
    pub root: PathBuf,
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Overwrite the contents of an existing file relative to the workspace root"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "content": { "type": "string" },
            },
            "required": ["path", "content"],
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let (Some(rel), Some(content)) = (
            call.args.get("path").and_then(Value::as_str),
            call.args.get("content").and_then(Value::as_str),
        ) else {
            return ToolOutput::err(&call.id, "missing required argument: path or content");
        };
        let rel_path = PathBuf::from(rel);
        if !path_is_contained(&rel_path) {
            return ToolOutput::err_typed(&call.id, ErrorType::InvalidPath, format!("path escapes workspace root: {rel}"))
                .with_suggestions(["use a path relative to the workspace root, without `..` components"]);
        }
        let target = self.root.join(&rel_path);
        if !target.is_file() {
            return ToolOutput::err_typed(&call.id, ErrorType::FileNotFound, format!("{rel} does not exist; use create_file"))
                .with_suggestions(["call create_file for a new file"]);
        }
        match tokio::fs::write(&target, content).await {
            Ok(()) => ToolOutput::ok(&call.id, format!("wrote {} bytes to {rel}", content.len())),
            Err(e) => ToolOutput::err_typed(&call.id, ErrorType::from_io_error(&e), format!("writing {rel}: {e}")),
        }
    }
}
