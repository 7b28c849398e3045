// SPDX-License-Identifier: MIT
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("unrecognised script format for {0}")]
    UnknownFormat(String),
    #[error("script exceeds maximum nesting depth of {0}")]
    TooDeep(usize),
    #[error("script has {0} steps, exceeding the limit of {1}")]
    TooManySteps(usize, usize),
    #[error("script is missing required top-level 'name'")]
    MissingName,
    #[error("yaml document has {0} anchors/aliases, exceeding the limit of {1}")]
    TooManyAnchors(usize, usize),
    #[error("yaml parse timed out")]
    ParseTimeout,
    #[error("action '{0}' is not in the allow-list")]
    ActionNotAllowed(String),
    #[error("unsafe path: {0}")]
    UnsafePath(String),
    #[error("file content exceeds the {0} byte limit")]
    ContentTooLarge(usize),
    #[error("dangerous shell pattern detected: {0}")]
    DangerousPattern(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BatchError>;
