// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use crate::policy::{ApprovalPolicy, ToolPolicy};
use crate::schema::validate_args;
use crate::tool::ErrorType;
use crate::{Tool, ToolCall, ToolOutput};

/// A tool's JSON-Schema projection, as sent to the model.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Immutable dispatch table from tool name to implementation.
/// Registration happens once at startup; execution never mutates the map.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    policy: ToolPolicy,
}

impl ToolRegistry {
    pub fn new(policy: ToolPolicy) -> Self {
        Self { tools: HashMap::new(), policy }
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Decide the approval policy for a tool invocation. Unknown tools are
    /// always denied regardless of the allow/deny lists.
    pub fn decide(&self, name: &str) -> ApprovalPolicy {
        if !self.tools.contains_key(name) {
            return ApprovalPolicy::Deny;
        }
        self.policy.decide(name)
    }

    /// Execute a call that has already cleared approval: `Deny` short-circuits
    /// before this is reached, `Ask` requires caller consent.
    ///
    /// Arguments are validated against the tool's declared schema before
    /// dispatch, and the call is bounded by the configured per-invocation
    /// deadline; both failures are surfaced through the stable taxonomy.
    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let Some(tool) = self.tools.get(&call.name) else {
            return ToolOutput::err_typed(&call.id, ErrorType::ToolNotFound, format!("unknown tool: {}", call.name))
                .with_suggestions([format!("available tools: {}", self.names().join(", "))]);
        };

        if let Some(violation) = validate_args(&tool.parameters_schema(), &call.args) {
            return ToolOutput::err_typed(&call.id, ErrorType::InvalidArguments, violation.message)
                .with_suggestions([format!("offending field: {}", violation.pointer)]);
        }

        let deadline = std::time::Duration::from_secs(self.policy.deadline_secs());
        match tokio::time::timeout(deadline, tool.execute(call)).await {
            Ok(output) => output,
            Err(_) => ToolOutput::err_typed(
                &call.id,
                ErrorType::ProcessingTimeout,
                format!("{} did not complete within {}s", call.name, deadline.as_secs()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use whisper_config::ToolsConfig;

    use super::*;
    use crate::tool::{Tool, ToolCall, ToolOutput};

    struct EchoTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        fn default_policy(&self) -> ApprovalPolicy {
            ApprovalPolicy::Auto
        }
        async fn execute(&self, call: &ToolCall) -> ToolOutput {
            ToolOutput::ok(&call.id, format!("echo:{}", call.args))
        }
    }

    struct RequiresFieldTool;

    #[async_trait]
    impl Tool for RequiresFieldTool {
        fn name(&self) -> &str {
            "needs_field"
        }
        fn description(&self) -> &str {
            "requires a `path` argument"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object", "properties": {"path": {"type": "string"}}, "required": ["path"] })
        }
        fn default_policy(&self) -> ApprovalPolicy {
            ApprovalPolicy::Auto
        }
        async fn execute(&self, call: &ToolCall) -> ToolOutput {
            ToolOutput::ok(&call.id, "should not run")
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "never completes"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        fn default_policy(&self) -> ApprovalPolicy {
            ApprovalPolicy::Auto
        }
        async fn execute(&self, call: &ToolCall) -> ToolOutput {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            ToolOutput::ok(&call.id, "unreachable")
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(ToolPolicy::from_config(&ToolsConfig::default()))
    }

    #[test]
    fn register_and_get() {
        let mut reg = registry();
        reg.register(EchoTool { name: "echo" });
        assert!(reg.get("echo").is_some());
    }

    #[test]
    fn get_unknown_returns_none() {
        assert!(registry().get("nope").is_none());
    }

    #[test]
    fn names_returns_all_registered_sorted() {
        let mut reg = registry();
        reg.register(EchoTool { name: "b" });
        reg.register(EchoTool { name: "a" });
        assert_eq!(reg.names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn execute_known_tool_succeeds() {
        let mut reg = registry();
        reg.register(EchoTool { name: "echo" });
        let call = ToolCall { id: "1".into(), name: "echo".into(), args: json!({"x": 1}) };
        let out = reg.execute(&call).await;
        assert!(!out.is_error);
    }

    #[tokio::test]
    async fn execute_unknown_tool_returns_error() {
        let reg = registry();
        let call = ToolCall { id: "x".into(), name: "missing".into(), args: json!({}) };
        let out = reg.execute(&call).await;
        assert!(out.is_error);
    }

    #[test]
    fn decide_denies_unregistered_tool_regardless_of_lists() {
        let reg = registry();
        assert_eq!(reg.decide("not_registered"), ApprovalPolicy::Deny);
    }

    #[test]
    fn decide_uses_policy_for_registered_tool() {
        let mut reg = registry();
        reg.register(EchoTool { name: "list_files" });
        assert_eq!(reg.decide("list_files"), ApprovalPolicy::Auto);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_as_tool_not_found() {
        let reg = registry();
        let call = ToolCall { id: "1".into(), name: "missing".into(), args: json!({}) };
        let out = reg.execute(&call).await;
        assert_eq!(out.error_type, Some(crate::tool::ErrorType::ToolNotFound));
    }

    #[tokio::test]
    async fn missing_required_argument_is_rejected_before_dispatch() {
        let mut reg = registry();
        reg.register(RequiresFieldTool);
        let call = ToolCall { id: "1".into(), name: "needs_field".into(), args: json!({}) };
        let out = reg.execute(&call).await;
        assert!(out.is_error);
        assert_eq!(out.error_type, Some(crate::tool::ErrorType::InvalidArguments));
        assert!(out.content.contains("path"));
    }

    #[tokio::test]
    async fn valid_arguments_reach_the_tool() {
        let mut reg = registry();
        reg.register(RequiresFieldTool);
        let call = ToolCall { id: "1".into(), name: "needs_field".into(), args: json!({"path": "a.txt"}) };
        let out = reg.execute(&call).await;
        assert!(!out.is_error);
    }

    #[tokio::test]
    async fn exceeding_the_deadline_reports_processing_timeout() {
        let policy = ToolPolicy::from_config(&ToolsConfig {
            allow_list: vec!["slow".into()],
            deny_list: vec![],
            deadline_secs: 1,
        });
        let mut reg = ToolRegistry::new(policy);
        reg.register(SlowTool);
        let call = ToolCall { id: "1".into(), name: "slow".into(), args: json!({}) };
        let out = reg.execute(&call).await;
        assert_eq!(out.error_type, Some(crate::tool::ErrorType::ProcessingTimeout));
    }
}
