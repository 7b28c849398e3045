// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use whisper_tools::{ApprovalPolicy, Tool, ToolCall, ToolOutput};

use crate::plan::{Plan, PlanStore};
use crate::rfc::{RfcStatus, RfcStore};

fn arg_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

pub struct CreateRfcTool {
    pub store: Arc<RfcStore>,
}

#[async_trait]
impl Tool for CreateRfcTool {
    fn name(&self) -> &str {
        "create_rfc"
    }

    fn description(&self) -> &str {
        "Create a new RFC document for feature refinement"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "summary": {"type": "string"},
                "short_name": {"type": "string", "pattern": "^[a-z0-9]+(-[a-z0-9]+)*$"},
                "background": {"type": "string"},
                "initial_requirements": {"type": "array", "items": {"type": "string"}},
                "author": {"type": "string", "default": "User"},
            },
            "required": ["title", "summary", "short_name"],
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let (Some(title), Some(summary), Some(short_name)) = (
            arg_str(&call.args, "title"),
            arg_str(&call.args, "summary"),
            arg_str(&call.args, "short_name"),
        ) else {
            return ToolOutput::err(&call.id, "missing required argument: title, summary, or short_name");
        };
        let background = arg_str(&call.args, "background");
        let author = arg_str(&call.args, "author");
        let requirements: Vec<String> = call
            .args
            .get("initial_requirements")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();

        match self.store.create(title, summary, short_name, background, &requirements, author) {
            Ok(rfc) => ToolOutput::ok(&call.id, format!("created {}", rfc.sidecar.rfc_id)),
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}

pub struct ReadRfcTool {
    pub store: Arc<RfcStore>,
}

#[async_trait]
impl Tool for ReadRfcTool {
    fn name(&self) -> &str {
        "read_rfc"
    }
    fn description(&self) -> &str {
        "Read an RFC's markdown content and metadata by id"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"rfc_id": {"type": "string"}}, "required": ["rfc_id"]})
    }
    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Auto
    }
    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let Some(rfc_id) = arg_str(&call.args, "rfc_id") else {
            return ToolOutput::err(&call.id, "missing required argument: rfc_id");
        };
        match self.store.read(rfc_id) {
            Ok(rfc) => ToolOutput::ok(&call.id, rfc.markdown),
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}

pub struct UpdateRfcTool {
    pub store: Arc<RfcStore>,
}

#[async_trait]
impl Tool for UpdateRfcTool {
    fn name(&self) -> &str {
        "update_rfc"
    }
    fn description(&self) -> &str {
        "Update an RFC's title and/or markdown content"
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "rfc_id": {"type": "string"},
                "title": {"type": "string"},
                "markdown": {"type": "string"},
            },
            "required": ["rfc_id"],
        })
    }
    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }
    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let Some(rfc_id) = arg_str(&call.args, "rfc_id") else {
            return ToolOutput::err(&call.id, "missing required argument: rfc_id");
        };
        let title = arg_str(&call.args, "title");
        let markdown = arg_str(&call.args, "markdown");
        match self.store.update(rfc_id, markdown, title) {
            Ok(rfc) => ToolOutput::ok(&call.id, format!("updated {}", rfc.sidecar.rfc_id)),
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}

pub struct MoveRfcTool {
    pub store: Arc<RfcStore>,
}

#[async_trait]
impl Tool for MoveRfcTool {
    fn name(&self) -> &str {
        "move_rfc"
    }
    fn description(&self) -> &str {
        "Move an RFC between in_progress and archived"
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"rfc_id": {"type": "string"}, "target_status": {"type": "string", "enum": ["in_progress", "archived"]}},
            "required": ["rfc_id", "target_status"],
        })
    }
    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }
    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let (Some(rfc_id), Some(target)) = (arg_str(&call.args, "rfc_id"), arg_str(&call.args, "target_status"))
        else {
            return ToolOutput::err(&call.id, "missing required argument: rfc_id or target_status");
        };
        let status = match RfcStatus::parse(target) {
            Ok(s) => s,
            Err(e) => return ToolOutput::err(&call.id, e.to_string()),
        };
        match self.store.move_status(rfc_id, status) {
            Ok(rfc) => ToolOutput::ok(&call.id, format!("moved {} to {}", rfc.sidecar.rfc_id, target)),
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}

pub struct DeleteRfcTool {
    pub store: Arc<RfcStore>,
}

#[async_trait]
impl Tool for DeleteRfcTool {
    fn name(&self) -> &str {
        "delete_rfc"
    }
    fn description(&self) -> &str {
        "Permanently delete an RFC and its sidecar"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"rfc_id": {"type": "string"}}, "required": ["rfc_id"]})
    }
    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Deny
    }
    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let Some(rfc_id) = arg_str(&call.args, "rfc_id") else {
            return ToolOutput::err(&call.id, "missing required argument: rfc_id");
        };
        match self.store.delete(rfc_id) {
            Ok(()) => ToolOutput::ok(&call.id, format!("deleted {rfc_id}")),
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}

pub struct ListRfcsTool {
    pub store: Arc<RfcStore>,
}

#[async_trait]
impl Tool for ListRfcsTool {
    fn name(&self) -> &str {
        "list_rfcs"
    }
    fn description(&self) -> &str {
        "List all RFCs across both status folders"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }
    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Auto
    }
    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        match self.store.list() {
            Ok(list) => {
                let lines: Vec<String> =
                    list.iter().map(|s| format!("{} [{}] {}", s.rfc_id, s.status, s.title)).collect();
                ToolOutput::ok(&call.id, if lines.is_empty() { "no rfcs".to_string() } else { lines.join("\n") })
            }
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}

pub struct PreparePlanFromRfcTool {
    pub store: Arc<PlanStore>,
}

#[async_trait]
impl Tool for PreparePlanFromRfcTool {
    fn name(&self) -> &str {
        "prepare_plan_from_rfc"
    }
    fn description(&self) -> &str {
        "Read an RFC and return its content plus hash for plan generation"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"rfc_id": {"type": "string"}}, "required": ["rfc_id"]})
    }
    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Auto
    }
    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let Some(rfc_id) = arg_str(&call.args, "rfc_id") else {
            return ToolOutput::err(&call.id, "missing required argument: rfc_id");
        };
        match self.store.prepare_from_rfc(rfc_id) {
            Ok(ctx) => ToolOutput::ok(
                &call.id,
                json!({
                    "rfc_id": ctx.rfc_id,
                    "rfc_title": ctx.rfc_title,
                    "rfc_hash": ctx.rfc_hash,
                    "plan_name": ctx.plan_name,
                    "rfc_markdown": ctx.rfc_markdown,
                })
                .to_string(),
            ),
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}

pub struct SaveGeneratedPlanTool {
    pub store: Arc<PlanStore>,
}

#[async_trait]
impl Tool for SaveGeneratedPlanTool {
    fn name(&self) -> &str {
        "save_generated_plan"
    }
    fn description(&self) -> &str {
        "Validate and persist an LLM-generated plan linked to its source RFC"
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "rfc_id": {"type": "string"},
                "plan_name": {"type": "string"},
                "plan": {"type": "object"},
            },
            "required": ["rfc_id", "plan_name", "plan"],
        })
    }
    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }
    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let (Some(rfc_id), Some(plan_name), Some(plan_value)) = (
            arg_str(&call.args, "rfc_id"),
            arg_str(&call.args, "plan_name"),
            call.args.get("plan"),
        ) else {
            return ToolOutput::err(&call.id, "missing required argument: rfc_id, plan_name, or plan");
        };
        let plan: Plan = match serde_json::from_value(plan_value.clone()) {
            Ok(p) => p,
            Err(e) => return ToolOutput::err(&call.id, format!("plan does not match schema: {e}")),
        };
        match self.store.save_generated_plan(rfc_id, plan_name, plan) {
            Ok(()) => ToolOutput::ok(&call.id, format!("saved plan {plan_name}")),
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}

pub struct UpdatePlanFromRfcTool {
    pub store: Arc<PlanStore>,
}

#[async_trait]
impl Tool for UpdatePlanFromRfcTool {
    fn name(&self) -> &str {
        "update_plan_from_rfc"
    }
    fn description(&self) -> &str {
        "Re-sync a plan against its source RFC if the RFC content has drifted"
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "plan_name": {"type": "string"},
                "plan": {"type": "object"},
                "force": {"type": "boolean", "default": false},
                "preserve_progress": {"type": "boolean", "default": true},
            },
            "required": ["plan_name", "plan"],
        })
    }
    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }
    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let (Some(plan_name), Some(plan_value)) =
            (arg_str(&call.args, "plan_name"), call.args.get("plan"))
        else {
            return ToolOutput::err(&call.id, "missing required argument: plan_name or plan");
        };
        let plan: Plan = match serde_json::from_value(plan_value.clone()) {
            Ok(p) => p,
            Err(e) => return ToolOutput::err(&call.id, format!("plan does not match schema: {e}")),
        };
        let force = call.args.get("force").and_then(Value::as_bool).unwrap_or(false);
        let preserve = call.args.get("preserve_progress").and_then(Value::as_bool).unwrap_or(true);
        match self.store.update_from_rfc(plan_name, plan, force, preserve) {
            Ok(changed) => ToolOutput::ok(&call.id, if changed { "plan updated" } else { "plan already current" }),
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}

pub struct MovePlanTool {
    pub store: Arc<PlanStore>,
}

#[async_trait]
impl Tool for MovePlanTool {
    fn name(&self) -> &str {
        "move_plan"
    }
    fn description(&self) -> &str {
        "Move a plan between in_progress and archived"
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"plan_name": {"type": "string"}, "target_status": {"type": "string", "enum": ["in_progress", "archived"]}},
            "required": ["plan_name", "target_status"],
        })
    }
    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }
    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let (Some(plan_name), Some(target)) =
            (arg_str(&call.args, "plan_name"), arg_str(&call.args, "target_status"))
        else {
            return ToolOutput::err(&call.id, "missing required argument: plan_name or target_status");
        };
        let status = match RfcStatus::parse(target) {
            Ok(s) => s,
            Err(e) => return ToolOutput::err(&call.id, e.to_string()),
        };
        match self.store.move_status(plan_name, status) {
            Ok(()) => ToolOutput::ok(&call.id, format!("moved {plan_name} to {target}")),
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}

pub struct DeletePlanTool {
    pub store: Arc<PlanStore>,
}

#[async_trait]
impl Tool for DeletePlanTool {
    fn name(&self) -> &str {
        "delete_plan"
    }
    fn description(&self) -> &str {
        "Permanently delete a plan and clear it from its source RFC"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"plan_name": {"type": "string"}}, "required": ["plan_name"]})
    }
    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Deny
    }
    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let Some(plan_name) = arg_str(&call.args, "plan_name") else {
            return ToolOutput::err(&call.id, "missing required argument: plan_name");
        };
        match self.store.delete(plan_name) {
            Ok(()) => ToolOutput::ok(&call.id, format!("deleted {plan_name}")),
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}

pub struct ListPlansTool {
    pub store: Arc<PlanStore>,
}

#[async_trait]
impl Tool for ListPlansTool {
    fn name(&self) -> &str {
        "list_plans"
    }
    fn description(&self) -> &str {
        "List all plans across both status folders"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }
    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Auto
    }
    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        match self.store.list() {
            Ok(list) => ToolOutput::ok(&call.id, if list.is_empty() { "no plans".to_string() } else { list.join("\n") }),
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn create_rfc_tool_rejects_missing_fields() {
        let dir = tempdir().unwrap();
        let tool = CreateRfcTool { store: Arc::new(RfcStore::new(dir.path())) };
        let call = ToolCall { id: "1".into(), name: "create_rfc".into(), args: json!({"title": "t"}) };
        let out = tool.execute(&call).await;
        assert!(out.is_error);
    }

    #[tokio::test]
    async fn create_rfc_tool_creates_rfc() {
        let dir = tempdir().unwrap();
        let tool = CreateRfcTool { store: Arc::new(RfcStore::new(dir.path())) };
        let call = ToolCall {
            id: "1".into(),
            name: "create_rfc".into(),
            args: json!({"title": "Dark Mode", "summary": "s", "short_name": "dark-mode"}),
        };
        let out = tool.execute(&call).await;
        assert!(!out.is_error);
        assert!(out.content.starts_with("created RFC-"));
    }

    #[tokio::test]
    async fn list_rfcs_tool_reports_empty() {
        let dir = tempdir().unwrap();
        let tool = ListRfcsTool { store: Arc::new(RfcStore::new(dir.path())) };
        let call = ToolCall { id: "1".into(), name: "list_rfcs".into(), args: json!({}) };
        let out = tool.execute(&call).await;
        assert_eq!(out.content, "no rfcs");
    }
}
