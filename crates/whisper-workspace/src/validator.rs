// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

use whisper_config::{Config, WorkspaceConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Info,
    Warning,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    Structure,
    Configuration,
    Dependencies,
    Permissions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub category: CheckCategory,
    pub status: CheckStatus,
    pub message: String,
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceHealth {
    pub overall_status: CheckStatus,
    pub checks: Vec<ValidationCheck>,
}

fn check(name: &str, category: CheckCategory, status: CheckStatus, message: impl Into<String>, recommendation: Option<&str>) -> ValidationCheck {
    ValidationCheck { name: name.to_string(), category, status, message: message.into(), recommendation: recommendation.map(String::from) }
}

/// Enumerates expected directories, required config keys, API-key
/// presence (never logging the value), filesystem write permission, and
/// dependency availability.
pub fn validate_workspace(config: &Config) -> WorkspaceHealth {
    let mut checks = Vec::new();
    checks.extend(check_structure(&config.workspace));
    checks.extend(check_configuration(config));
    checks.extend(check_permissions(&config.workspace));
    checks.extend(check_dependencies(config));

    let overall_status = checks.iter().map(|c| c.status).max().unwrap_or(CheckStatus::Pass);
    WorkspaceHealth { overall_status, checks }
}

fn check_structure(workspace: &WorkspaceConfig) -> Vec<ValidationCheck> {
    workspace
        .required_dirs()
        .into_iter()
        .map(|dir| {
            if dir.is_dir() {
                check(
                    &format!("directory:{}", dir.display()),
                    CheckCategory::Structure,
                    CheckStatus::Pass,
                    format!("{} exists", dir.display()),
                    None,
                )
            } else {
                check(
                    &format!("directory:{}", dir.display()),
                    CheckCategory::Structure,
                    CheckStatus::Warning,
                    format!("{} is missing", dir.display()),
                    Some("create the directory or run workspace initialisation"),
                )
            }
        })
        .collect()
}

fn check_configuration(config: &Config) -> Vec<ValidationCheck> {
    let mut checks = Vec::new();
    if config.model.name.is_empty() {
        checks.push(check(
            "config:model.name",
            CheckCategory::Configuration,
            CheckStatus::Fail,
            "model.name is not set",
            Some("set model.name in the workspace config"),
        ));
    } else {
        checks.push(check(
            "config:model.name",
            CheckCategory::Configuration,
            CheckStatus::Pass,
            format!("model.name = {}", config.model.name),
            None,
        ));
    }

    let api_key_present = std::env::var(&config.model.api_key_env).is_ok();
    checks.push(if api_key_present {
        check(
            "config:api_key",
            CheckCategory::Configuration,
            CheckStatus::Pass,
            format!("{} is set", config.model.api_key_env),
            None,
        )
    } else {
        check(
            "config:api_key",
            CheckCategory::Configuration,
            CheckStatus::Fail,
            format!("{} is not set", config.model.api_key_env),
            Some("export the API key environment variable before starting a session"),
        )
    });
    checks
}

fn check_permissions(workspace: &WorkspaceConfig) -> Vec<ValidationCheck> {
    let probe = workspace.whisper_dir().join(".write_probe");
    let writable = std::fs::create_dir_all(workspace.whisper_dir())
        .and_then(|_| std::fs::write(&probe, b"ok"))
        .is_ok();
    let _ = std::fs::remove_file(&probe);
    vec![if writable {
        check("permissions:write", CheckCategory::Permissions, CheckStatus::Pass, "workspace directory is writable", None)
    } else {
        check(
            "permissions:write",
            CheckCategory::Permissions,
            CheckStatus::Fail,
            "workspace directory is not writable",
            Some("check filesystem permissions on the workspace root"),
        )
    }]
}

fn check_dependencies(config: &Config) -> Vec<ValidationCheck> {
    // No external process dependencies are invoked directly by this
    // runtime; this check only verifies the model provider name is one
    // the runtime actually knows how to construct a client for.
    let known = ["openrouter", "openai", "mock"];
    if known.contains(&config.model.provider.as_str()) {
        vec![check(
            "dependencies:model_provider",
            CheckCategory::Dependencies,
            CheckStatus::Pass,
            format!("provider '{}' is supported", config.model.provider),
            None,
        )]
    } else {
        vec![check(
            "dependencies:model_provider",
            CheckCategory::Dependencies,
            CheckStatus::Warning,
            format!("provider '{}' is not one of the built-in providers", config.model.provider),
            Some("verify a ModelProvider implementation is registered for this provider name"),
        )]
    }
}
