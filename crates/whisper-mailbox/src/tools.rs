// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use whisper_tools::{ApprovalPolicy, Tool, ToolCall, ToolOutput};

use crate::mailbox::Mailbox;

/// Sends a message from the calling agent to another named agent.
pub struct SendMailTool {
    pub mailbox: Arc<Mailbox>,
    pub agent_name: String,
}

#[async_trait]
impl Tool for SendMailTool {
    fn name(&self) -> &str {
        "send_mail"
    }

    fn description(&self) -> &str {
        "Send a message to another agent's mailbox"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to": { "type": "string" },
                "subject": { "type": "string" },
                "body": { "type": "string" },
            },
            "required": ["to", "body"],
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Auto
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let Some(to) = call.args.get("to").and_then(Value::as_str) else {
            return ToolOutput::err(&call.id, "missing required argument: to");
        };
        let Some(body) = call.args.get("body").and_then(Value::as_str) else {
            return ToolOutput::err(&call.id, "missing required argument: body");
        };
        let subject = call.args.get("subject").and_then(Value::as_str).unwrap_or("");
        let msg = self.mailbox.send(&self.agent_name, to, subject, body);
        ToolOutput::ok(&call.id, format!("sent message {} to {to}", msg.id))
    }
}

/// Checks the calling agent's own inbox.
pub struct CheckMailTool {
    pub mailbox: Arc<Mailbox>,
    pub agent_name: String,
}

#[async_trait]
impl Tool for CheckMailTool {
    fn name(&self) -> &str {
        "check_mail"
    }

    fn description(&self) -> &str {
        "Check the calling agent's mailbox for messages"
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Auto
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let inbox = self.mailbox.check(&self.agent_name);
        if inbox.is_empty() {
            return ToolOutput::ok(&call.id, "inbox is empty");
        }
        let summary: Vec<String> = inbox
            .iter()
            .map(|m| format!("[{}] from {}: {} — {}", m.id, m.from, m.subject, m.body))
            .collect();
        ToolOutput::ok(&call.id, summary.join("\n"))
    }
}

/// Replies to a specific message id, addressing the reply to its sender.
pub struct ReplyMailTool {
    pub mailbox: Arc<Mailbox>,
    pub agent_name: String,
}

#[async_trait]
impl Tool for ReplyMailTool {
    fn name(&self) -> &str {
        "reply_mail"
    }

    fn description(&self) -> &str {
        "Reply to a received message by id"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message_id": { "type": "string" },
                "body": { "type": "string" },
            },
            "required": ["message_id", "body"],
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Auto
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let (Some(message_id), Some(body)) = (
            call.args.get("message_id").and_then(Value::as_str),
            call.args.get("body").and_then(Value::as_str),
        ) else {
            return ToolOutput::err(&call.id, "missing required argument: message_id or body");
        };
        match self.mailbox.reply(&self.agent_name, message_id, body) {
            Ok(reply) => ToolOutput::ok(&call.id, format!("sent reply {} to {}", reply.id, reply.to)),
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}
