// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use whisper_tools::{ErrorType, ToolCall, ToolRegistry};

use crate::error::{BatchError, Result};
use crate::parser::{ParsedScript, ParsedStep};
use crate::validator::validate_script;

#[derive(Debug, Clone, Default)]
pub struct ExecutionModes {
    pub stop_on_error: bool,
    pub dry_run: bool,
    pub pass_context: bool,
    pub validate_first: bool,
}

#[derive(Debug, Clone)]
pub struct StepResult {
    pub index: usize,
    pub action: Option<String>,
    pub success: bool,
    pub output: String,
    pub error_type: Option<ErrorType>,
}

/// Flags a run where most failures trace back to one root cause instead of
/// several independent ones.
#[derive(Debug, Clone)]
pub struct CascadingFailure {
    pub detected: bool,
    pub root_cause: String,
    pub mitigation_steps: Vec<String>,
}

/// A run's failures "cascade" when at least 80% of them share one
/// `error_type` — the signal that one upstream cause (a missing path, a
/// denied action, an exhausted deadline) took down the rest of the script
/// rather than each step failing for its own reason.
const CASCADE_THRESHOLD: f64 = 0.8;

fn detect_cascading_failure(results: &[StepResult], failed: usize) -> Option<CascadingFailure> {
    if failed == 0 {
        return None;
    }
    let mut counts: HashMap<ErrorType, usize> = HashMap::new();
    for result in results.iter().filter(|r| !r.success) {
        if let Some(error_type) = result.error_type {
            *counts.entry(error_type).or_insert(0) += 1;
        }
    }
    let (dominant, count) = counts.into_iter().max_by_key(|(_, count)| *count)?;
    if (count as f64) / (failed as f64) < CASCADE_THRESHOLD {
        return None;
    }
    Some(CascadingFailure { detected: true, root_cause: dominant.as_str().to_string(), mitigation_steps: mitigation_for(dominant) })
}

fn mitigation_for(error_type: ErrorType) -> Vec<String> {
    match error_type {
        ErrorType::PermissionDenied => vec![
            "review the script's allow/deny lists against the actions it calls".to_string(),
            "grant the denied actions explicitly if the script is trusted".to_string(),
        ],
        ErrorType::FileNotFound | ErrorType::InvalidPath | ErrorType::PathTooLong => vec![
            "confirm the workspace paths the script references actually exist".to_string(),
            "run with dry_run first to catch missing paths before they fail live".to_string(),
        ],
        ErrorType::ProcessingTimeout => vec![
            "raise deadline_secs in the tools config".to_string(),
            "split the offending step into smaller calls".to_string(),
        ],
        ErrorType::ToolNotFound => {
            vec!["check the script's action names against the registered tool set".to_string()]
        }
        ErrorType::InvalidArguments | ErrorType::ToolArgsInvalid | ErrorType::InvalidParameterType => {
            vec!["validate the script's step parameters against each tool's schema before running".to_string()]
        }
        ErrorType::DiskFull => vec!["free disk space on the workspace volume".to_string()],
        ErrorType::InvalidConfiguration | ErrorType::ConflictingOptions => {
            vec!["re-check the script's format and step definitions against the parser's expectations".to_string()]
        }
        ErrorType::MemoryExhaustion => vec!["reduce the step's working set or raise the process memory limit".to_string()],
        ErrorType::EncodingError | ErrorType::JsonSerializationError => {
            vec!["confirm the affected files are valid UTF-8/JSON before the script runs".to_string()]
        }
        ErrorType::ToolExecutionError => {
            vec!["inspect the failing steps' output for a common cause".to_string()]
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub success: bool,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
    pub per_step: Vec<StepResult>,
    pub cascading_failure: Option<CascadingFailure>,
}

/// Resolves `{{results[i].field}}` references against prior step outputs.
/// Only string parameter values are scanned.
fn interpolate(value: &Value, results: &[StepResult]) -> Value {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"\{\{results\[(\d+)\]\.(\w+)\}\}").unwrap());

    match value {
        Value::String(s) => {
            let replaced = re.replace_all(s, |caps: &regex::Captures| {
                let idx: usize = caps[1].parse().unwrap_or(usize::MAX);
                let field = &caps[2];
                results
                    .get(idx)
                    .map(|r| match field {
                        "output" => r.output.clone(),
                        "success" => r.success.to_string(),
                        "action" => r.action.clone().unwrap_or_default(),
                        _ => String::new(),
                    })
                    .unwrap_or_default()
            });
            Value::String(replaced.into_owned())
        }
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), interpolate(v, results))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| interpolate(v, results)).collect()),
        other => other.clone(),
    }
}

pub type ProgressCallback<'a> = dyn Fn(usize, usize, &StepResult) + Send + Sync + 'a;

pub struct Executor<'a> {
    registry: Arc<ToolRegistry>,
    allow_list: Vec<String>,
    deny_list: Vec<String>,
    progress: Option<Box<ProgressCallback<'a>>>,
}

impl<'a> Executor<'a> {
    pub fn new(registry: Arc<ToolRegistry>, allow_list: Vec<String>, deny_list: Vec<String>) -> Self {
        Self { registry, allow_list, deny_list, progress: None }
    }

    pub fn with_progress(mut self, callback: Box<ProgressCallback<'a>>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Executes `script`'s steps sequentially, honouring `stop_on_error`,
    /// `dry_run`, `pass_context`, and `validate_first`.
    pub async fn run(&self, script: &ParsedScript, modes: &ExecutionModes) -> Result<ExecutionReport> {
        if modes.validate_first {
            validate_script(script, &self.allow_list, &self.deny_list)?;
        }

        let mut results = Vec::new();
        let mut context = serde_json::Map::new();
        let total = script.steps.len();

        for (index, step) in script.steps.iter().enumerate() {
            if !modes.validate_first {
                if let Err(e) = crate::validator::validate_script(
                    &ParsedScript { format: script.format, name: script.name.clone(), description: None, steps: vec![step.clone()] },
                    &self.allow_list,
                    &self.deny_list,
                ) {
                    let result = StepResult {
                        index,
                        action: step.action.clone(),
                        success: false,
                        output: e.to_string(),
                        error_type: Some(ErrorType::InvalidConfiguration),
                    };
                    self.report_progress(index, total, &result);
                    results.push(result);
                    if modes.stop_on_error {
                        break;
                    }
                    continue;
                }
            }

            let result = self.run_step(index, step, &results, &mut context, modes).await;
            let failed = !result.success;
            self.report_progress(index, total, &result);
            results.push(result);
            if failed && modes.stop_on_error {
                break;
            }
        }

        let completed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - completed;
        let cascading_failure = detect_cascading_failure(&results, failed);
        Ok(ExecutionReport { success: failed == 0, completed, failed, total, per_step: results, cascading_failure })
    }

    fn report_progress(&self, index: usize, total: usize, result: &StepResult) {
        if let Some(cb) = &self.progress {
            cb(index, total, result);
        }
    }

    async fn run_step(
        &self,
        index: usize,
        step: &ParsedStep,
        prior: &[StepResult],
        context: &mut serde_json::Map<String, Value>,
        modes: &ExecutionModes,
    ) -> StepResult {
        let action = match &step.action {
            Some(a) => a.clone(),
            None => match &step.command {
                Some(cmd) => match self.interpret_command(cmd) {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        return StepResult { index, action: None, success: false, output: e.to_string(), error_type: Some(ErrorType::ToolNotFound) }
                    }
                },
                None => {
                    return StepResult {
                        index,
                        action: None,
                        success: false,
                        output: "step has neither action nor command".into(),
                        error_type: Some(ErrorType::InvalidConfiguration),
                    }
                }
            },
        };

        let mut params = interpolate(&step.params, prior);
        if modes.pass_context {
            if let Value::Object(map) = &mut params {
                for (k, v) in context.iter() {
                    map.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }

        if modes.dry_run {
            return StepResult {
                index,
                action: Some(action.clone()),
                success: true,
                output: format!("dry_run: would call {action}"),
                error_type: None,
            };
        }

        if self.registry.decide(&action) == whisper_tools::ApprovalPolicy::Deny {
            return StepResult {
                index,
                action: Some(action.clone()),
                success: false,
                output: format!("denied: {action}"),
                error_type: Some(ErrorType::PermissionDenied),
            };
        }

        let call = ToolCall { id: format!("batch-{index}"), name: action.clone(), args: params.clone() };
        let output = self.registry.execute(&call).await;

        if modes.pass_context {
            if let Some(ctx) = params.get("_context").and_then(Value::as_object) {
                for (k, v) in ctx {
                    context.insert(k.clone(), v.clone());
                }
            }
        }

        StepResult { index, action: Some(action), success: !output.is_error, output: output.content, error_type: output.error_type }
    }

    /// Delegates a raw `command` line through the natural-language
    /// interpreter to resolve it to a known action.
    fn interpret_command(&self, command: &str) -> Result<String> {
        let parsed = crate::parser::parse_text(command)?;
        match parsed.steps.into_iter().next().and_then(|s| s.action) {
            Some(action) => Ok(action),
            None => Err(BatchError::UnknownTool(command.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use whisper_config::ToolsConfig;
    use whisper_tools::{ApprovalPolicy, Tool, ToolOutput, ToolPolicy};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its message param"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
        fn default_policy(&self) -> ApprovalPolicy {
            ApprovalPolicy::Auto
        }
        async fn execute(&self, call: &ToolCall) -> ToolOutput {
            let msg = call.args.get("message").and_then(Value::as_str).unwrap_or("");
            ToolOutput::ok(&call.id, msg.to_string())
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let policy = ToolPolicy::from_config(&ToolsConfig {
            allow_list: vec!["echo".to_string()],
            deny_list: vec![],
            deadline_secs: 30,
        });
        let mut reg = ToolRegistry::new(policy);
        reg.register(EchoTool);
        Arc::new(reg)
    }

    fn script(steps: Vec<ParsedStep>) -> ParsedScript {
        ParsedScript { format: crate::parser::ScriptFormat::Json, name: "s".into(), description: None, steps }
    }

    #[tokio::test]
    async fn executes_steps_in_order_and_reports_success() {
        let exec = Executor::new(registry(), vec!["echo".into()], vec![]);
        let steps = vec![
            ParsedStep { action: Some("echo".into()), command: None, params: json!({"message": "first"}) },
            ParsedStep { action: Some("echo".into()), command: None, params: json!({"message": "second"}) },
        ];
        let report = exec.run(&script(steps), &ExecutionModes::default()).await.unwrap();
        assert_eq!(report.completed, 2);
        assert_eq!(report.per_step[0].output, "first");
    }

    #[tokio::test]
    async fn interpolates_prior_step_output() {
        let exec = Executor::new(registry(), vec!["echo".into()], vec![]);
        let steps = vec![
            ParsedStep { action: Some("echo".into()), command: None, params: json!({"message": "hello"}) },
            ParsedStep { action: Some("echo".into()), command: None, params: json!({"message": "{{results[0].output}} world"}) },
        ];
        let report = exec.run(&script(steps), &ExecutionModes::default()).await.unwrap();
        assert_eq!(report.per_step[1].output, "hello world");
    }

    #[tokio::test]
    async fn stop_on_error_halts_after_first_failure() {
        let exec = Executor::new(registry(), vec!["echo".into()], vec![]);
        let steps = vec![
            ParsedStep { action: Some("missing_tool".into()), command: None, params: json!({}) },
            ParsedStep { action: Some("echo".into()), command: None, params: json!({"message": "never"}) },
        ];
        let modes = ExecutionModes { stop_on_error: true, ..Default::default() };
        let report = exec.run(&script(steps), &modes).await.unwrap();
        assert_eq!(report.per_step.len(), 1);
        assert!(!report.success);
    }

    #[tokio::test]
    async fn dry_run_does_not_invoke_tool() {
        let exec = Executor::new(registry(), vec!["echo".into()], vec![]);
        let steps = vec![ParsedStep { action: Some("echo".into()), command: None, params: json!({"message": "x"}) }];
        let modes = ExecutionModes { dry_run: true, ..Default::default() };
        let report = exec.run(&script(steps), &modes).await.unwrap();
        assert!(report.per_step[0].output.starts_with("dry_run:"));
    }

    #[tokio::test]
    async fn validate_first_rejects_whole_script_up_front() {
        let exec = Executor::new(registry(), vec!["echo".into()], vec![]);
        let steps = vec![ParsedStep { action: Some("delete_file".into()), command: None, params: json!({}) }];
        let modes = ExecutionModes { validate_first: true, ..Default::default() };
        assert!(exec.run(&script(steps), &modes).await.is_err());
    }

    #[tokio::test]
    async fn cascading_failure_detected_when_most_failures_share_a_cause() {
        let exec = Executor::new(registry(), vec!["echo".into()], vec![]);
        let steps = vec![
            ParsedStep { action: Some("delete_file".into()), command: None, params: json!({}) },
            ParsedStep { action: Some("execute_shell".into()), command: None, params: json!({}) },
            ParsedStep { action: Some("echo".into()), command: None, params: json!({"message": "ok"}) },
        ];
        let report = exec.run(&script(steps), &ExecutionModes::default()).await.unwrap();
        assert_eq!(report.failed, 2);
        let cascade = report.cascading_failure.expect("two of three failures share invalid_configuration");
        assert!(cascade.detected);
        assert_eq!(cascade.root_cause, "invalid_configuration");
        assert!(!cascade.mitigation_steps.is_empty());
    }

    #[tokio::test]
    async fn no_cascading_failure_when_causes_are_split_below_threshold() {
        // "blocked_tool" is denied at the registry's own policy level
        // (distinct from the executor's allow/deny_list, which only gates
        // the batch validator), while "missing_tool" passes policy but
        // isn't registered at all — two distinct error_types, 1 each.
        let policy = ToolPolicy::from_config(&ToolsConfig {
            allow_list: vec!["echo".to_string()],
            deny_list: vec!["blocked_tool".to_string()],
            deadline_secs: 30,
        });
        let mut reg = ToolRegistry::new(policy);
        reg.register(EchoTool);
        let exec = Executor::new(Arc::new(reg), vec!["echo".into(), "blocked_tool".into(), "missing_tool".into()], vec![]);
        let steps = vec![
            ParsedStep { action: Some("blocked_tool".into()), command: None, params: json!({}) },
            ParsedStep { action: Some("missing_tool".into()), command: None, params: json!({}) },
        ];
        let report = exec.run(&script(steps), &ExecutionModes::default()).await.unwrap();
        assert_eq!(report.failed, 2);
        assert!(report.cascading_failure.is_none());
    }
}
