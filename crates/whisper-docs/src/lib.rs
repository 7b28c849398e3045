// SPDX-License-Identifier: MIT
mod error;
mod plan;
mod rfc;
mod tools;

pub use error::{DocsError, Result};
pub use plan::{
    validate_plan, Plan, PlanStore, PlanTask, PreparedPlanContext, RfcReference, SourceRfc, SyncHistoryEntry,
    TddPhase, TddPhases,
};
pub use rfc::{hash_markdown, slugify, Rfc, RfcSidecar, RfcStatus, RfcStore, StatusHistoryEntry};
pub use tools::{
    CreateRfcTool, DeletePlanTool, DeleteRfcTool, ListPlansTool, ListRfcsTool, MovePlanTool, MoveRfcTool,
    PreparePlanFromRfcTool, ReadRfcTool, SaveGeneratedPlanTool, UpdatePlanFromRfcTool, UpdateRfcTool,
};
