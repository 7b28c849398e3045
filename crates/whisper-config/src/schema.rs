// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Top-level configuration, merged from layered YAML files and environment
/// variables by [`crate::load`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub loop_config: LoopConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub intervention: InterventionConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Layout of the `.WHISPER` workspace directory tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Root of the project workspace; `.WHISPER` is created under this.
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self { root: PathBuf::from(".") }
    }
}

impl WorkspaceConfig {
    pub fn whisper_dir(&self) -> PathBuf {
        self.root.join(".WHISPER")
    }
    pub fn rfc_dir(&self) -> PathBuf {
        self.whisper_dir().join("rfc")
    }
    pub fn plans_dir(&self) -> PathBuf {
        self.whisper_dir().join("plans")
    }
    pub fn logs_dir(&self) -> PathBuf {
        self.whisper_dir().join("logs")
    }
    pub fn state_dir(&self) -> PathBuf {
        self.whisper_dir().join("state")
    }
    pub fn output_dir(&self) -> PathBuf {
        self.whisper_dir().join("output")
    }
    pub fn required_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.whisper_dir(),
            self.rfc_dir(),
            self.rfc_dir().join("in_progress"),
            self.rfc_dir().join("archived"),
            self.plans_dir(),
            self.plans_dir().join("in_progress"),
            self.plans_dir().join("archived"),
            self.logs_dir(),
            self.state_dir(),
            self.output_dir(),
        ]
    }
}

/// LLM endpoint configuration. The endpoint itself is external; this only
/// carries the fields the AI Loop needs to build a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    pub name: String,
    /// Environment variable holding the API key. Absence is a validator
    /// failure, never a crash.
    pub api_key_env: String,
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            name: "google/gemini-2.5-flash-preview".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            temperature: 0.1,
        }
    }
}

/// Batch Script Runtime allow/deny configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Action identifiers that the batch validator will accept.
    #[serde(default = "default_allow_list")]
    pub allow_list: Vec<String>,
    /// Action identifiers that are always rejected, regardless of allow_list.
    #[serde(default = "default_deny_list")]
    pub deny_list: Vec<String>,
    /// Per-invocation tool execution deadline.
    #[serde(default = "default_tool_deadline")]
    pub deadline_secs: u64,
}

fn default_allow_list() -> Vec<String> {
    [
        "list_files",
        "read_file",
        "create_file",
        "write_file",
        "switch_agent",
        "send_mail",
        "check_mail",
        "reply_mail",
        "create_rfc",
        "read_rfc",
        "update_rfc",
        "move_rfc",
        "list_rfcs",
        "prepare_plan_from_rfc",
        "save_generated_plan",
        "update_plan_from_rfc",
        "move_plan",
        "list_plans",
        "validate_workspace",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_deny_list() -> Vec<String> {
    ["delete_file", "execute_shell", "eval", "delete_rfc", "delete_plan"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_tool_deadline() -> u64 {
    30
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            allow_list: default_allow_list(),
            deny_list: default_deny_list(),
            deadline_secs: default_tool_deadline(),
        }
    }
}

/// AI Interaction Loop thresholds governing tool-call budgets and pause polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    pub max_consecutive_tool_calls: usize,
    pub tool_call_deadline_secs: u64,
    /// Interval the loop polls the shutdown flag while paused.
    pub pause_poll_millis: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_consecutive_tool_calls: 5,
            tool_call_deadline_secs: 30,
            pause_poll_millis: 100,
        }
    }
}

/// Session Monitor thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub check_interval_secs: u64,
    pub stall_threshold_secs: u64,
    pub tool_loop_window: usize,
    pub tool_loop_repeat: usize,
    pub high_error_rate_threshold: f32,
    pub slow_response_multiplier: f32,
    pub memory_spike_multiplier: f32,
    pub memory_spike_seed_samples: usize,
    /// EMA smoothing factor for the response-time baseline.
    pub ema_alpha: f32,
    pub response_time_window: usize,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 5,
            stall_threshold_secs: 30,
            tool_loop_window: 50,
            tool_loop_repeat: 5,
            high_error_rate_threshold: 0.2,
            slow_response_multiplier: 2.0,
            memory_spike_multiplier: 1.5,
            memory_spike_seed_samples: 5,
            ema_alpha: 0.1,
            response_time_window: 100,
            enabled: true,
        }
    }
}

/// Intervention Engine policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionConfig {
    pub max_interventions_per_session: usize,
    pub retry_delay_secs: u64,
    /// Window of recent interventions inspected for repeat-failure skipping.
    pub recent_failure_window: usize,
    /// Failures of the same strategy within the window before it is skipped.
    pub recent_failure_threshold: usize,
    pub max_restart_attempts: usize,
    pub prompt_injection_timeout_secs: u64,
    /// Window after an intervention in which success is checked.
    pub post_condition_check_secs: u64,
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self {
            max_interventions_per_session: 10,
            retry_delay_secs: 2,
            recent_failure_window: 5,
            recent_failure_threshold: 2,
            max_restart_attempts: 2,
            prompt_injection_timeout_secs: 10,
            post_condition_check_secs: 2,
        }
    }
}

/// Batch Script Runtime limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub max_steps: usize,
    pub max_param_depth: usize,
    pub max_file_size_bytes: usize,
    pub yaml_max_anchors: usize,
    pub yaml_parse_timeout_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            max_param_depth: 10,
            max_file_size_bytes: 1024 * 1024,
            yaml_max_anchors: 100,
            yaml_parse_timeout_secs: 5,
        }
    }
}

/// Returns `true` if `candidate` is a relative path that does not escape
/// its root via a `..` component. Used both by the batch validator and by
/// filesystem tools.
pub fn path_is_contained(candidate: &Path) -> bool {
    if candidate.is_absolute() {
        return false;
    }
    !candidate
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_openrouter_env_var() {
        let c = Config::default();
        assert_eq!(c.model.api_key_env, "OPENROUTER_API_KEY");
    }

    #[test]
    fn required_dirs_includes_rfc_and_plans() {
        let ws = WorkspaceConfig { root: PathBuf::from("/tmp/proj") };
        let dirs = ws.required_dirs();
        assert!(dirs.contains(&PathBuf::from("/tmp/proj/.WHISPER/rfc/in_progress")));
        assert!(dirs.contains(&PathBuf::from("/tmp/proj/.WHISPER/plans/archived")));
    }

    #[test]
    fn deny_list_rejects_delete_file() {
        let t = ToolsConfig::default();
        assert!(t.deny_list.contains(&"delete_file".to_string()));
    }

    #[test]
    fn path_containment_rejects_parent_dir() {
        assert!(!path_is_contained(Path::new("../etc/passwd")));
    }

    #[test]
    fn path_containment_rejects_absolute() {
        assert!(!path_is_contained(Path::new("/etc/passwd")));
    }

    #[test]
    fn path_containment_accepts_relative() {
        assert!(path_is_contained(Path::new("src/main.rs")));
    }
}
