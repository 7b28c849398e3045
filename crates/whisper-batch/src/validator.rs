// SPDX-License-Identifier: MIT
use regex::Regex;
use serde_json::Value;

use crate::error::{BatchError, Result};
use crate::parser::{ParsedScript, ParsedStep};

const MAX_STEPS: usize = 1000;
const MAX_FILE_SIZE: usize = 1024 * 1024;

const RESERVED_DEVICE_NAMES: &[&str] =
    &["CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "LPT1", "LPT2", "LPT3"];

fn dangerous_path_patterns() -> &'static [Regex] {
    static PATTERNS: std::sync::OnceLock<Vec<Regex>> = std::sync::OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"\.\./", r"^/etc/", r"^/root/", r"^/sys/", r"^/proc/", r"\$\{", r"\$\(", r"`", r";", r"\|", r"&"]
            .iter()
            .map(|p| Regex::new(p).unwrap())
            .collect()
    })
}

fn dangerous_shell_patterns() -> &'static [Regex] {
    static PATTERNS: std::sync::OnceLock<Vec<Regex>> = std::sync::OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"\brm\s+-rf", r"\bformat\b", r"\bdd\s+if=", r"\bmkfs\b", r"\beval\b", r"\bexec\b", r">\s*/dev/"]
            .iter()
            .map(|p| Regex::new(p).unwrap())
            .collect()
    })
}

/// Path-safety check: rejects traversal, absolute paths into system
/// directories, null bytes, command-substitution metacharacters, and
/// reserved device names.
pub fn path_is_safe(path: &str) -> Result<()> {
    if path.contains('\0') {
        return Err(BatchError::UnsafePath(path.to_string()));
    }
    let stem = path.rsplit('/').next().unwrap_or(path).split('.').next().unwrap_or(path).to_uppercase();
    if RESERVED_DEVICE_NAMES.contains(&stem.as_str()) {
        return Err(BatchError::UnsafePath(path.to_string()));
    }
    for re in dangerous_path_patterns() {
        if re.is_match(path) {
            return Err(BatchError::UnsafePath(path.to_string()));
        }
    }
    Ok(())
}

fn scan_params_for_paths(params: &Value) -> Result<()> {
    match params {
        Value::String(s) => {
            if s.contains('/') || s.contains('\\') {
                path_is_safe(s)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for (key, value) in map {
                if key.to_lowercase().contains("path") {
                    if let Some(s) = value.as_str() {
                        path_is_safe(s)?;
                    }
                }
                scan_params_for_paths(value)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                scan_params_for_paths(item)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_step(step: &ParsedStep, allow_list: &[String], deny_list: &[String]) -> Result<()> {
    if let Some(action) = &step.action {
        if deny_list.iter().any(|d| d == action) || !allow_list.iter().any(|a| a == action) {
            return Err(BatchError::ActionNotAllowed(action.clone()));
        }
        scan_params_for_paths(&step.params)?;
        if action == "create_file" || action == "write_file" {
            if let Some(content) = step.params.get("content").and_then(Value::as_str) {
                if content.len() > MAX_FILE_SIZE {
                    return Err(BatchError::ContentTooLarge(MAX_FILE_SIZE));
                }
            }
        }
    }
    if let Some(command) = &step.command {
        for re in dangerous_shell_patterns() {
            if re.is_match(command) {
                return Err(BatchError::DangerousPattern(command.clone()));
            }
        }
    }
    Ok(())
}

/// Validates an entire parsed script before any step executes. Runs even
/// when `validate_first` is not requested for individual step checks, but
/// a dedicated pre-flight pass is what the executor's `validate_first`
/// mode triggers up front.
pub fn validate_script(script: &ParsedScript, allow_list: &[String], deny_list: &[String]) -> Result<()> {
    if script.steps.len() > MAX_STEPS {
        return Err(BatchError::TooManySteps(script.steps.len(), MAX_STEPS));
    }
    for step in &script.steps {
        check_step(step, allow_list, deny_list)?;
    }
    Ok(())
}
