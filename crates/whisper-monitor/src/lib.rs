// SPDX-License-Identifier: MIT
mod anomaly;
mod intervention;
mod metrics;
mod runtime;

pub use anomaly::{AlertKind, AnomalyAlert, AnomalyDetector, Severity};
pub use intervention::{
    InterventionExecutor, InterventionHistory, InterventionOutcome, InterventionRecord,
    InterventionStrategy, StrategyStats,
};
pub use metrics::{BaselineTracker, SessionMetrics};
pub use runtime::{
    spawn_intervention_orchestrator, spawn_session_monitor, InterventionOrchestratorHandle, SessionMonitorHandle,
    SessionSupervisor,
};
