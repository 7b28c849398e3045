// SPDX-License-Identifier: MIT
use std::collections::HashMap;

use whisper_config::MonitorConfig;

use crate::metrics::{BaselineTracker, SessionMetrics};

/// Kind of anomaly an [`AnomalyDetector`] can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    SessionStall,
    ToolLoop,
    HighErrorRate,
    SlowResponse,
    MemorySpike,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::SessionStall => "session_stall",
            AlertKind::ToolLoop => "tool_loop",
            AlertKind::HighErrorRate => "high_error_rate",
            AlertKind::SlowResponse => "slow_response",
            AlertKind::MemorySpike => "memory_spike",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone)]
pub struct AnomalyAlert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub session_id: String,
    pub message: String,
    pub requires_intervention: bool,
}

/// Runs the five anomaly detectors in a fixed order: stall, tool_loop,
/// high_error_rate, slow_response, memory_spike. Order matters because the
/// Intervention Engine receives alerts in this sequence.
pub struct AnomalyDetector {
    config: MonitorConfig,
}

impl AnomalyDetector {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    /// `recent_tool_events` is the tail of the session's event log,
    /// oldest-first, already trimmed to `tool_loop_window` entries.
    pub fn analyze(
        &self,
        metrics: &SessionMetrics,
        recent_tool_events: &[String],
        baselines: &mut BaselineTracker,
    ) -> Vec<AnomalyAlert> {
        let mut alerts = Vec::new();
        let session_id = metrics.session_id.clone();

        let stall = metrics.stall_duration_secs();
        if stall > self.config.stall_threshold_secs as f64 {
            alerts.push(AnomalyAlert {
                kind: AlertKind::SessionStall,
                severity: Severity::High,
                session_id: session_id.clone(),
                message: format!("session stalled for {stall:.0}s"),
                requires_intervention: true,
            });
        }

        let mut tool_counts: HashMap<&str, usize> = HashMap::new();
        for t in recent_tool_events.iter().rev().take(self.config.tool_loop_window) {
            *tool_counts.entry(t.as_str()).or_insert(0) += 1;
        }
        for (tool, count) in &tool_counts {
            if *count >= self.config.tool_loop_repeat {
                alerts.push(AnomalyAlert {
                    kind: AlertKind::ToolLoop,
                    severity: Severity::Critical,
                    session_id: session_id.clone(),
                    message: format!("possible tool loop: '{tool}' executed {count} times"),
                    requires_intervention: true,
                });
            }
        }

        if metrics.message_count > 0 {
            let rate = metrics.error_rate();
            if rate > self.config.high_error_rate_threshold as f64 {
                alerts.push(AnomalyAlert {
                    kind: AlertKind::HighErrorRate,
                    severity: Severity::High,
                    session_id: session_id.clone(),
                    message: format!("high error rate: {:.1}%", rate * 100.0),
                    requires_intervention: true,
                });
            }
        }

        let avg = metrics.avg_response_ms();
        if avg > 0.0 {
            let baseline = baselines.update(&session_id, "response_time", avg);
            if avg > baseline * self.config.slow_response_multiplier as f64 && baseline > 0.0 {
                alerts.push(AnomalyAlert {
                    kind: AlertKind::SlowResponse,
                    severity: Severity::Medium,
                    session_id: session_id.clone(),
                    message: format!("response time degraded to {avg:.0}ms (baseline {baseline:.0}ms)"),
                    requires_intervention: false,
                });
            }
        }

        let samples = metrics.memory_samples();
        if let Some(&current) = samples.last() {
            let seed = self.config.memory_spike_seed_samples.min(samples.len());
            if seed > 0 {
                let baseline_mem: f64 = samples[..seed].iter().sum::<f64>() / seed as f64;
                if baseline_mem > 0.0 && current > baseline_mem * self.config.memory_spike_multiplier as f64 {
                    alerts.push(AnomalyAlert {
                        kind: AlertKind::MemorySpike,
                        severity: Severity::Medium,
                        session_id: session_id.clone(),
                        message: format!("memory usage spike: {current:.1}MB"),
                        requires_intervention: false,
                    });
                }
            }
        }

        alerts
    }
}
