// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single message delivered between agents (spec C2 Mailbox).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    /// Set when this message is a reply to another message's id.
    pub in_reply_to: Option<String>,
    pub read: bool,
}

/// In-process mailbox: a mutex-guarded per-recipient ordered queue. Delivery
/// order within a recipient's queue matches send order; there is no
/// cross-recipient ordering guarantee.
#[derive(Default)]
pub struct Mailbox {
    inboxes: Mutex<HashMap<String, Vec<MailMessage>>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&self, from: &str, to: &str, subject: &str, body: &str) -> MailMessage {
        let msg = MailMessage {
            id: Uuid::new_v4().to_string(),
            from: from.to_string(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            timestamp: Utc::now(),
            in_reply_to: None,
            read: false,
        };
        self.inboxes.lock().unwrap().entry(to.to_string()).or_default().push(msg.clone());
        msg
    }

    pub fn reply(&self, from: &str, original_id: &str, body: &str) -> anyhow::Result<MailMessage> {
        let original = self
            .find(original_id)
            .ok_or_else(|| anyhow::anyhow!("no message with id {original_id}"))?;
        let msg = MailMessage {
            id: Uuid::new_v4().to_string(),
            from: from.to_string(),
            to: original.from.clone(),
            subject: format!("Re: {}", original.subject),
            body: body.to_string(),
            timestamp: Utc::now(),
            in_reply_to: Some(original_id.to_string()),
            read: false,
        };
        self.inboxes.lock().unwrap().entry(msg.to.clone()).or_default().push(msg.clone());
        Ok(msg)
    }

    /// Returns all messages addressed to `recipient`, oldest first, and
    /// marks them read. Does not remove them from the inbox.
    pub fn check(&self, recipient: &str) -> Vec<MailMessage> {
        let mut inboxes = self.inboxes.lock().unwrap();
        let Some(inbox) = inboxes.get_mut(recipient) else {
            return Vec::new();
        };
        for msg in inbox.iter_mut() {
            msg.read = true;
        }
        inbox.clone()
    }

    fn find(&self, id: &str) -> Option<MailMessage> {
        self.inboxes.lock().unwrap().values().flatten().find(|m| m.id == id).cloned()
    }
}
