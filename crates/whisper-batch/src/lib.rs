// SPDX-License-Identifier: MIT
mod error;
mod executor;
mod parser;
mod validator;

pub use error::{BatchError, Result};
pub use executor::{CascadingFailure, ExecutionModes, ExecutionReport, Executor, ProgressCallback, StepResult};
pub use parser::{detect_format, parse_json, parse_text, parse_yaml, parse_yaml_with_timeout, ParsedScript, ParsedStep, ScriptFormat};
pub use validator::{path_is_safe, validate_script};
