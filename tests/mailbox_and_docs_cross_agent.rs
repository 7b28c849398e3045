// SPDX-License-Identifier: MIT
//! Two agents sharing a Mailbox and an RFC store: one creates an RFC and
//! notifies the other, who reads it back by id after checking mail.

use std::sync::Arc;

use serde_json::json;

use whisper_config::ToolsConfig;
use whisper_docs::{CreateRfcTool, ReadRfcTool, RfcStore};
use whisper_mailbox::{CheckMailTool, Mailbox, SendMailTool};
use whisper_tools::{ToolCall, ToolPolicy, ToolRegistry};

fn registry_for(agent_name: &str, mailbox: Arc<Mailbox>, rfc_store: Arc<RfcStore>) -> ToolRegistry {
    let policy = ToolPolicy::from_config(&ToolsConfig::default());
    let mut registry = ToolRegistry::new(policy);
    registry.register(SendMailTool { mailbox: mailbox.clone(), agent_name: agent_name.to_string() });
    registry.register(CheckMailTool { mailbox, agent_name: agent_name.to_string() });
    registry.register(CreateRfcTool { store: rfc_store.clone() });
    registry.register(ReadRfcTool { store: rfc_store });
    registry
}

#[tokio::test]
async fn agent_notifies_peer_of_new_rfc_and_peer_reads_it() {
    let dir = tempfile::tempdir().unwrap();
    let mailbox = Arc::new(Mailbox::new());
    let rfc_store = Arc::new(RfcStore::new(dir.path()));

    let author = registry_for("author", mailbox.clone(), rfc_store.clone());
    let reviewer = registry_for("reviewer", mailbox.clone(), rfc_store.clone());

    let create_out = author
        .execute(&ToolCall {
            id: "1".into(),
            name: "create_rfc".into(),
            args: json!({"title": "Rate Limiting", "summary": "add a token bucket", "short_name": "rate-limit"}),
        })
        .await;
    assert!(!create_out.is_error);
    let rfc_id = create_out.content.strip_prefix("created ").unwrap().to_string();

    let send_out = author
        .execute(&ToolCall {
            id: "2".into(),
            name: "send_mail".into(),
            args: json!({"to": "reviewer", "subject": "please review", "body": format!("see {rfc_id}")}),
        })
        .await;
    assert!(!send_out.is_error);

    let check_out = reviewer.execute(&ToolCall { id: "3".into(), name: "check_mail".into(), args: json!({}) }).await;
    assert!(check_out.content.contains(&rfc_id));
    assert!(check_out.content.contains("please review"));

    let read_out =
        reviewer.execute(&ToolCall { id: "4".into(), name: "read_rfc".into(), args: json!({"rfc_id": rfc_id}) }).await;
    assert!(!read_out.is_error);
    assert!(read_out.content.contains("Rate Limiting"));
}

#[tokio::test]
async fn reviewer_with_no_mail_gets_empty_inbox_message() {
    let dir = tempfile::tempdir().unwrap();
    let mailbox = Arc::new(Mailbox::new());
    let rfc_store = Arc::new(RfcStore::new(dir.path()));
    let reviewer = registry_for("reviewer", mailbox, rfc_store);

    let check_out = reviewer.execute(&ToolCall { id: "1".into(), name: "check_mail".into(), args: json!({}) }).await;
    assert_eq!(check_out.content, "inbox is empty");
}
