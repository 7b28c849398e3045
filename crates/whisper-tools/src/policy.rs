// SPDX-License-Identifier: MIT
use regex::Regex;
use whisper_config::ToolsConfig;

/// Per-tool approval decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalPolicy {
    Auto,
    Ask,
    Deny,
}

/// Maps a tool name to an approval decision using the workspace's
/// allow/deny lists. Deny always beats allow; absence from both means Ask.
#[derive(Debug)]
pub struct ToolPolicy {
    allow_patterns: Vec<Regex>,
    deny_patterns: Vec<Regex>,
    deadline_secs: u64,
}

impl ToolPolicy {
    pub fn from_config(cfg: &ToolsConfig) -> Self {
        let compile = |patterns: &[String]| -> Vec<Regex> {
            patterns.iter().filter_map(|p| glob_to_regex(p)).collect()
        };
        Self {
            allow_patterns: compile(&cfg.allow_list),
            deny_patterns: compile(&cfg.deny_list),
            deadline_secs: cfg.deadline_secs,
        }
    }

    pub fn decide(&self, tool_name: &str) -> ApprovalPolicy {
        if self.deny_patterns.iter().any(|re| re.is_match(tool_name)) {
            return ApprovalPolicy::Deny;
        }
        if self.allow_patterns.iter().any(|re| re.is_match(tool_name)) {
            return ApprovalPolicy::Auto;
        }
        ApprovalPolicy::Ask
    }

    /// Per-call execution deadline enforced by [`crate::ToolRegistry::execute`].
    pub fn deadline_secs(&self) -> u64 {
        self.deadline_secs
    }
}

/// Convert a simple shell glob (`*` and `?` only) to an anchored [`Regex`].
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}
