// SPDX-License-Identifier: MIT
use std::path::Path;

use regex::Regex;
use serde_json::Value;

use crate::error::{BatchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFormat {
    Json,
    Yaml,
    Text,
}

#[derive(Debug, Clone)]
pub struct ParsedStep {
    pub action: Option<String>,
    pub command: Option<String>,
    pub params: Value,
}

#[derive(Debug, Clone)]
pub struct ParsedScript {
    pub format: ScriptFormat,
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<ParsedStep>,
}

const MAX_NESTING_DEPTH: usize = 10;
const MAX_YAML_ANCHORS: usize = 100;

/// Detects format from extension, falling back to a content sniff.
pub fn detect_format(path: &Path, content: &str) -> ScriptFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => return ScriptFormat::Json,
        Some("yml") | Some("yaml") => return ScriptFormat::Yaml,
        Some("txt") | Some("script") => return ScriptFormat::Text,
        _ => {}
    }
    let trimmed = content.trim_start();
    if trimmed.starts_with('{') {
        ScriptFormat::Json
    } else if trimmed.lines().any(|l| l.trim_start().starts_with('#')) || !trimmed.contains(':') {
        ScriptFormat::Text
    } else {
        ScriptFormat::Yaml
    }
}

fn json_depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(json_depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(json_depth).max().unwrap_or(0),
        _ => 0,
    }
}

pub fn parse_json(content: &str) -> Result<ParsedScript> {
    let value: Value = serde_json::from_str(content)?;
    if json_depth(&value) > MAX_NESTING_DEPTH {
        return Err(BatchError::TooDeep(MAX_NESTING_DEPTH));
    }
    let obj = value.as_object().ok_or(BatchError::MissingName)?;
    let name = obj.get("name").and_then(Value::as_str).ok_or(BatchError::MissingName)?.to_string();
    let description = obj.get("description").and_then(Value::as_str).map(String::from);
    let steps = obj
        .get("steps")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(step_from_value).collect())
        .unwrap_or_default();
    Ok(ParsedScript { format: ScriptFormat::Json, name, description, steps })
}

/// Counts anchor definitions (`&name`) in the raw YAML text. `serde_yaml`
/// resolves anchors during parsing, so the >100-anchor limit is enforced
/// via a pre-scan of the source rather than the parsed value.
fn count_yaml_anchors(content: &str) -> usize {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"&[A-Za-z0-9_]+").unwrap());
    re.find_iter(content).count()
}

pub fn parse_yaml(content: &str) -> Result<ParsedScript> {
    let anchors = count_yaml_anchors(content);
    if anchors > MAX_YAML_ANCHORS {
        return Err(BatchError::TooManyAnchors(anchors, MAX_YAML_ANCHORS));
    }
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;
    let json_value: Value = serde_json::to_value(&value).unwrap_or(Value::Null);
    if json_depth(&json_value) > MAX_NESTING_DEPTH {
        return Err(BatchError::TooDeep(MAX_NESTING_DEPTH));
    }
    let obj = json_value.as_object().ok_or(BatchError::MissingName)?;
    let name = obj.get("name").and_then(Value::as_str).ok_or(BatchError::MissingName)?.to_string();
    let description = obj.get("description").and_then(Value::as_str).map(String::from);
    let steps = obj
        .get("steps")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(step_from_value).collect())
        .unwrap_or_default();
    Ok(ParsedScript { format: ScriptFormat::Yaml, name, description, steps })
}

/// Wraps `parse_yaml` with a parse timeout, since `serde_yaml::from_str`
/// has no internal cancellation point.
pub async fn parse_yaml_with_timeout(content: String, timeout_secs: u64) -> Result<ParsedScript> {
    let handle = tokio::task::spawn_blocking(move || parse_yaml(&content));
    match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(BatchError::ParseTimeout),
        Err(_) => Err(BatchError::ParseTimeout),
    }
}

fn step_from_value(value: &Value) -> ParsedStep {
    let action = value.get("action").and_then(Value::as_str).map(String::from);
    let command = value.get("command").and_then(Value::as_str).map(String::from);
    let params = value.get("params").cloned().unwrap_or_else(|| Value::Object(Default::default()));
    ParsedStep { action, command, params }
}

struct TextRule {
    pattern: &'static str,
    action: &'static str,
    fields: &'static [&'static str],
}

/// Curated natural-language → `{action, params}` mapping. Lines that
/// match none of these fall through to a raw `command` step so the
/// dangerous-shell-pattern scan still covers them.
const TEXT_RULES: &[TextRule] = &[
    TextRule { pattern: r"(?i)^list files? in (.+)$", action: "list_files", fields: &["path"] },
    TextRule { pattern: r"(?i)^read file (.+)$", action: "read_file", fields: &["path"] },
    TextRule { pattern: r"(?i)^switch to (.+)$", action: "switch_agent", fields: &["agent"] },
    TextRule {
        pattern: r"(?i)^create file (\S+) with content (.+)$",
        action: "create_file",
        fields: &["path", "content"],
    },
    TextRule { pattern: r"(?i)^write (.+) to (\S+)$", action: "write_file", fields: &["content", "path"] },
];

pub fn parse_text(content: &str) -> Result<ParsedScript> {
    let mut steps = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        steps.push(parse_text_line(trimmed));
    }
    Ok(ParsedScript { format: ScriptFormat::Text, name: "text_script".to_string(), description: None, steps })
}

fn parse_text_line(line: &str) -> ParsedStep {
    for rule in TEXT_RULES {
        let re = Regex::new(rule.pattern).unwrap();
        if let Some(caps) = re.captures(line) {
            let mut params = serde_json::Map::new();
            for (i, field) in rule.fields.iter().enumerate() {
                if let Some(m) = caps.get(i + 1) {
                    params.insert((*field).to_string(), Value::String(m.as_str().trim().to_string()));
                }
            }
            return ParsedStep { action: Some(rule.action.to_string()), command: None, params: Value::Object(params) };
        }
    }
    ParsedStep { action: None, command: Some(line.to_string()), params: Value::Object(Default::default()) }
}
