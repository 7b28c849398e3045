// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::policy::ApprovalPolicy;
use crate::{Tool, ToolCall, ToolOutput};

/// Switches which named persona/agent handles the rest of the session.
/// The active name is shared state read by the AI Interaction Loop when it
/// builds the next system prompt.
pub struct SwitchAgentTool {
    pub active: Arc<Mutex<String>>,
    pub available: Vec<String>,
}

#[async_trait]
impl Tool for SwitchAgentTool {
    fn name(&self) -> &str {
        "switch_agent"
    }

    fn description(&self) -> &str {
        "Switch the active agent persona for the remainder of the session"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "agent": { "type": "string" } },
            "required": ["agent"],
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Auto
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let Some(agent) = call.args.get("agent").and_then(Value::as_str) else {
            return ToolOutput::err(&call.id, "missing required argument: agent");
        };
        if !self.available.iter().any(|a| a == agent) {
            return ToolOutput::err(
                &call.id,
                format!("unknown agent: {agent} (available: {})", self.available.join(", ")),
            );
        }
        *self.active.lock().unwrap() = agent.to_string();
        ToolOutput::ok(&call.id, format!("switched to {agent}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn switches_to_known_agent() {
        let active = Arc::new(Mutex::new("default".to_string()));
        let tool = SwitchAgentTool { active: active.clone(), available: vec!["default".into(), "reviewer".into()] };
        let call = ToolCall { id: "1".into(), name: "switch_agent".into(), args: json!({"agent": "reviewer"}) };
        let out = tool.execute(&call).await;
        assert!(!out.is_error);
        assert_eq!(*active.lock().unwrap(), "reviewer");
    }

    #[tokio::test]
    async fn rejects_unknown_agent() {
        let active = Arc::new(Mutex::new("default".to_string()));
        let tool = SwitchAgentTool { active: active.clone(), available: vec!["default".into()] };
        let call = ToolCall { id: "1".into(), name: "switch_agent".into(), args: json!({"agent": "ghost"}) };
        let out = tool.execute(&call).await;
        assert!(out.is_error);
        assert_eq!(*active.lock().unwrap(), "default");
    }
}
