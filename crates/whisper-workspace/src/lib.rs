// SPDX-License-Identifier: MIT
mod health_check;
mod tools;
mod validator;

pub use health_check::{run_health_check, CascadingFailure, HealthReport, ScriptHealthResult, ScriptOutcome};
pub use tools::ValidateWorkspaceTool;
pub use validator::{validate_workspace, CheckCategory, CheckStatus, ValidationCheck, WorkspaceHealth};
