// SPDX-License-Identifier: MIT
mod mailbox;
mod tools;

pub use mailbox::{MailMessage, Mailbox};
pub use tools::{CheckMailTool, ReplyMailTool, SendMailTool};
