// SPDX-License-Identifier: MIT
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocsError {
    #[error("rfc not found: {0}")]
    RfcNotFound(String),
    #[error("plan not found: {0}")]
    PlanNotFound(String),
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    #[error("plan has drifted from its source RFC: {0}")]
    PlanDrift(String),
    #[error("plan validation failed: {0}")]
    InvalidPlan(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DocsError>;
