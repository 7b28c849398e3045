// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::policy::ApprovalPolicy;

/// A single tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Opaque identifier from the model, forwarded back on the result.
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// Stable error-type identifiers surfaced to callers. Every layer above a
/// tool translates lower-level failures into one of these before they reach
/// the model; no raw `std::io::Error`/`serde_json::Error` text leaks up on
/// its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    InvalidArguments,
    ToolNotFound,
    ToolExecutionError,
    ToolArgsInvalid,
    ProcessingTimeout,
    FileNotFound,
    PermissionDenied,
    DiskFull,
    EncodingError,
    PathTooLong,
    InvalidPath,
    MemoryExhaustion,
    JsonSerializationError,
    InvalidConfiguration,
    ConflictingOptions,
    InvalidParameterType,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArguments => "invalid_arguments",
            Self::ToolNotFound => "tool_not_found",
            Self::ToolExecutionError => "tool_execution_error",
            Self::ToolArgsInvalid => "tool_args_invalid",
            Self::ProcessingTimeout => "processing_timeout",
            Self::FileNotFound => "file_not_found",
            Self::PermissionDenied => "permission_denied",
            Self::DiskFull => "disk_full",
            Self::EncodingError => "encoding_error",
            Self::PathTooLong => "path_too_long",
            Self::InvalidPath => "invalid_path",
            Self::MemoryExhaustion => "memory_exhaustion",
            Self::JsonSerializationError => "json_serialization_error",
            Self::InvalidConfiguration => "invalid_configuration",
            Self::ConflictingOptions => "conflicting_options",
            Self::InvalidParameterType => "invalid_parameter_type",
        }
    }

    /// Maps an I/O failure against a workspace-relative path to the
    /// file-system error family.
    pub fn from_io_error(e: &std::io::Error) -> Self {
        const ENOSPC: i32 = 28;
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            std::io::ErrorKind::InvalidData => Self::EncodingError,
            _ if e.raw_os_error() == Some(ENOSPC) => Self::DiskFull,
            _ => Self::ToolExecutionError,
        }
    }
}

/// Optional features that degraded rather than failing the whole call.
#[derive(Debug, Clone, Default)]
pub struct DegradedMode {
    pub disabled_features: Vec<String>,
    pub fallback_info: Value,
}

/// The uniform result envelope every tool returns.
///
/// `content`/`is_error` remain the plain-text, backward-compatible fields
/// every call site reads; `data`, `error_type`, `suggestions`, and
/// `degraded_mode` carry the structured envelope required of the Tool
/// Runtime's public contract.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub call_id: String,
    pub content: String,
    pub is_error: bool,
    /// Structured success payload, when the tool produces one.
    pub data: Option<Value>,
    pub error_type: Option<ErrorType>,
    pub suggestions: Vec<String>,
    pub degraded_mode: Option<DegradedMode>,
}

impl ToolOutput {
    pub fn ok(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
            data: None,
            error_type: None,
            suggestions: Vec::new(),
            degraded_mode: None,
        }
    }

    /// Successful result with a structured payload; `content` mirrors its
    /// JSON text so plain-text call sites keep working unchanged.
    pub fn ok_data(call_id: impl Into<String>, data: Value) -> Self {
        let content = data.to_string();
        Self {
            call_id: call_id.into(),
            content,
            is_error: false,
            data: Some(data),
            error_type: None,
            suggestions: Vec::new(),
            degraded_mode: None,
        }
    }

    /// Untyped error, kept for call sites that have not been classified
    /// against the taxonomy yet.
    pub fn err(call_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: msg.into(),
            is_error: true,
            data: None,
            error_type: None,
            suggestions: Vec::new(),
            degraded_mode: None,
        }
    }

    /// Error classified against the stable taxonomy in §7.
    pub fn err_typed(call_id: impl Into<String>, error_type: ErrorType, msg: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: msg.into(),
            is_error: true,
            data: None,
            error_type: Some(error_type),
            suggestions: Vec::new(),
            degraded_mode: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_degraded_mode(mut self, degraded: DegradedMode) -> Self {
        self.degraded_mode = Some(degraded);
        self
    }

    /// The `{ok, ...}` envelope from §4.1, as sent across a process
    /// boundary (MCP bridge, CLI `--json` output, batch step records).
    pub fn envelope(&self) -> Value {
        if self.is_error {
            let mut obj = json!({
                "ok": false,
                "error_type": self.error_type.as_ref().map(ErrorType::as_str).unwrap_or("tool_execution_error"),
                "message": self.content,
                "suggestions": self.suggestions,
            });
            if let Some(degraded) = &self.degraded_mode {
                obj["degraded_mode"] = json!(true);
                obj["disabled_features"] = json!(degraded.disabled_features);
                obj["fallback_info"] = degraded.fallback_info.clone();
            }
            obj
        } else {
            let data = self.data.clone().unwrap_or_else(|| Value::String(self.content.clone()));
            let mut obj = json!({ "ok": true, "data": data });
            if let Some(degraded) = &self.degraded_mode {
                obj["degraded_mode"] = json!(true);
                obj["disabled_features"] = json!(degraded.disabled_features);
                obj["fallback_info"] = degraded.fallback_info.clone();
            }
            obj
        }
    }
}

/// Contract every built-in tool implements.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    /// Approval level applied when the workspace config has no explicit
    /// allow/deny entry for this tool name.
    fn default_policy(&self) -> ApprovalPolicy;
    async fn execute(&self, call: &ToolCall) -> ToolOutput;
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        fn default_policy(&self) -> ApprovalPolicy {
            ApprovalPolicy::Auto
        }
        async fn execute(&self, call: &ToolCall) -> ToolOutput {
            ToolOutput::ok(&call.id, call.args.to_string())
        }
    }

    #[tokio::test]
    async fn ok_output_is_not_error() {
        let call = ToolCall { id: "1".into(), name: "echo".into(), args: json!({"a": 1}) };
        let out = EchoTool.execute(&call).await;
        assert!(!out.is_error);
        assert_eq!(out.call_id, "1");
    }

    #[test]
    fn err_output_is_error() {
        let out = ToolOutput::err("2", "boom");
        assert!(out.is_error);
        assert_eq!(out.content, "boom");
    }

    #[test]
    fn ok_envelope_carries_data() {
        let out = ToolOutput::ok("1", "hello");
        let env = out.envelope();
        assert_eq!(env["ok"], json!(true));
        assert_eq!(env["data"], json!("hello"));
    }

    #[test]
    fn err_envelope_carries_taxonomy_and_suggestions() {
        let out = ToolOutput::err_typed("1", ErrorType::FileNotFound, "no such file")
            .with_suggestions(["check the path", "run list_files first"]);
        let env = out.envelope();
        assert_eq!(env["ok"], json!(false));
        assert_eq!(env["error_type"], json!("file_not_found"));
        assert_eq!(env["suggestions"][0], json!("check the path"));
    }

    #[test]
    fn untyped_error_falls_back_to_generic_taxonomy_entry() {
        let out = ToolOutput::err("1", "boom");
        assert_eq!(out.envelope()["error_type"], json!("tool_execution_error"));
    }
}
