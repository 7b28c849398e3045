// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use whisper_batch::{detect_format, parse_json, parse_text, parse_yaml, ExecutionModes, Executor, ScriptFormat};
use whisper_tools::ToolRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptOutcome {
    Passed,
    Failed,
    Timeout,
    Error,
}

#[derive(Debug, Clone)]
pub struct ScriptHealthResult {
    pub script: PathBuf,
    pub outcome: ScriptOutcome,
    pub detail: String,
}

/// Flags a health-check run where most failing scripts fail the same way
/// instead of each for its own reason — see `whisper_batch::CascadingFailure`
/// for the per-step equivalent this mirrors at the script level.
#[derive(Debug, Clone)]
pub struct CascadingFailure {
    pub detected: bool,
    pub root_cause: String,
    pub mitigation_steps: Vec<String>,
}

const CASCADE_THRESHOLD: f64 = 0.8;

fn mitigation_for_outcome(outcome: ScriptOutcome) -> Vec<String> {
    match outcome {
        ScriptOutcome::Timeout => vec!["raise per_script_timeout_secs or simplify the slow scripts".to_string()],
        ScriptOutcome::Error => vec!["check the scripts directory for malformed or unreadable script files".to_string()],
        ScriptOutcome::Failed => vec!["inspect the failing scripts' steps for an action outside the allow list".to_string()],
        ScriptOutcome::Passed => Vec::new(),
    }
}

fn detect_cascading_failure(results: &[ScriptHealthResult], failed_scripts: usize) -> Option<CascadingFailure> {
    if failed_scripts == 0 {
        return None;
    }
    let mut counts: HashMap<ScriptOutcome, usize> = HashMap::new();
    for result in results.iter().filter(|r| r.outcome != ScriptOutcome::Passed) {
        *counts.entry(result.outcome).or_insert(0) += 1;
    }
    let (dominant, count) = counts.into_iter().max_by_key(|(_, count)| *count)?;
    if (count as f64) / (failed_scripts as f64) < CASCADE_THRESHOLD {
        return None;
    }
    let root_cause = match dominant {
        ScriptOutcome::Timeout => "processing_timeout",
        ScriptOutcome::Error => "script_load_error",
        ScriptOutcome::Failed => "step_execution_failure",
        ScriptOutcome::Passed => unreachable!("passed scripts are excluded above"),
    };
    Some(CascadingFailure { detected: true, root_cause: root_cause.to_string(), mitigation_steps: mitigation_for_outcome(dominant) })
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub passed: usize,
    pub failed: usize,
    pub timeout: usize,
    pub error: usize,
    pub total: usize,
    pub results: Vec<ScriptHealthResult>,
    pub cascading_failure: Option<CascadingFailure>,
}

impl HealthReport {
    pub fn score(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.passed as f64 / self.total as f64) * 100.0
    }

    pub fn summary(&self) -> String {
        format!(
            "{}/{} scripts passed ({:.1}% health score)",
            self.passed,
            self.total,
            self.score()
        )
    }
}

/// Discovers batch scripts under `scripts_dir` and drives each through the
/// Batch Runtime, assembling a pass/fail/timeout/error report.
pub async fn run_health_check(
    scripts_dir: &Path,
    registry: Arc<ToolRegistry>,
    allow_list: Vec<String>,
    deny_list: Vec<String>,
    per_script_timeout_secs: u64,
) -> HealthReport {
    let mut results = Vec::new();

    let entries = match std::fs::read_dir(scripts_dir) {
        Ok(entries) => entries,
        Err(e) => {
            return HealthReport {
                passed: 0,
                failed: 0,
                timeout: 0,
                error: 1,
                total: 1,
                results: vec![ScriptHealthResult {
                    script: scripts_dir.to_path_buf(),
                    outcome: ScriptOutcome::Error,
                    detail: e.to_string(),
                }],
                cascading_failure: None,
            };
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let outcome = run_one_script(&path, registry.clone(), &allow_list, &deny_list, per_script_timeout_secs).await;
        results.push(outcome);
    }

    let passed = results.iter().filter(|r| r.outcome == ScriptOutcome::Passed).count();
    let failed = results.iter().filter(|r| r.outcome == ScriptOutcome::Failed).count();
    let timeout = results.iter().filter(|r| r.outcome == ScriptOutcome::Timeout).count();
    let error = results.iter().filter(|r| r.outcome == ScriptOutcome::Error).count();
    let total = results.len();
    let cascading_failure = detect_cascading_failure(&results, total - passed);

    HealthReport { passed, failed, timeout, error, total, results, cascading_failure }
}

async fn run_one_script(
    path: &Path,
    registry: Arc<ToolRegistry>,
    allow_list: &[String],
    deny_list: &[String],
    timeout_secs: u64,
) -> ScriptHealthResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return ScriptHealthResult { script: path.to_path_buf(), outcome: ScriptOutcome::Error, detail: e.to_string() },
    };

    let format = detect_format(path, &content);
    let parsed = match format {
        ScriptFormat::Json => parse_json(&content),
        ScriptFormat::Yaml => parse_yaml(&content),
        ScriptFormat::Text => parse_text(&content),
    };
    let script = match parsed {
        Ok(s) => s,
        Err(e) => return ScriptHealthResult { script: path.to_path_buf(), outcome: ScriptOutcome::Error, detail: e.to_string() },
    };

    let executor = Executor::new(registry, allow_list.to_vec(), deny_list.to_vec());
    let modes = ExecutionModes { dry_run: true, validate_first: true, ..Default::default() };

    match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), executor.run(&script, &modes)).await {
        Ok(Ok(report)) if report.success => {
            ScriptHealthResult { script: path.to_path_buf(), outcome: ScriptOutcome::Passed, detail: "ok".into() }
        }
        Ok(Ok(report)) => ScriptHealthResult {
            script: path.to_path_buf(),
            outcome: ScriptOutcome::Failed,
            detail: format!("{}/{} steps failed", report.failed, report.total),
        },
        Ok(Err(e)) => ScriptHealthResult { script: path.to_path_buf(), outcome: ScriptOutcome::Error, detail: e.to_string() },
        Err(_) => ScriptHealthResult { script: path.to_path_buf(), outcome: ScriptOutcome::Timeout, detail: "timed out".into() },
    }
}
