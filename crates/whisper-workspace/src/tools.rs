// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};

use whisper_config::Config;
use whisper_tools::{ApprovalPolicy, Tool, ToolCall, ToolOutput};

use crate::validator::validate_workspace;

/// Exposes the Workspace Validator as a callable tool so the AI loop and
/// batch scripts can trigger it directly.
pub struct ValidateWorkspaceTool {
    pub config: Config,
}

#[async_trait]
impl Tool for ValidateWorkspaceTool {
    fn name(&self) -> &str {
        "validate_workspace"
    }

    fn description(&self) -> &str {
        "Validate workspace structure, configuration, and dependencies"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Auto
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let health = validate_workspace(&self.config);
        let lines: Vec<String> = health
            .checks
            .iter()
            .map(|c| format!("[{:?}] {}: {}", c.status, c.name, c.message))
            .collect();
        let summary = format!("overall: {:?}\n{}", health.overall_status, lines.join("\n"));
        ToolOutput::ok(&call.id, summary)
    }
}
