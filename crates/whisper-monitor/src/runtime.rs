// SPDX-License-Identifier: MIT
//! Background task wiring for the Session Monitor and Intervention Engine.
//!
//! Per the concurrency model, each session owns one Monitor task that polls
//! on a fixed interval and zero-or-one Intervention worker; a single global
//! Intervention Orchestrator drains a bounded alert queue and dispatches to
//! per-session workers, serialising interventions within a session while
//! letting different sessions run concurrently.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use whisper_config::{InterventionConfig, MonitorConfig};
use whisper_core::AiLoopEvent;

use crate::anomaly::{AnomalyAlert, AnomalyDetector};
use crate::intervention::{InterventionExecutor, InterventionRecord};
use crate::metrics::{BaselineTracker, SessionMetrics};

#[derive(Clone)]
struct ShutdownSignal {
    stopping: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    fn new() -> Self {
        Self { stopping: Arc::new(AtomicBool::new(false)), notify: Arc::new(Notify::new()) }
    }

    fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    async fn wait_stop(&self) {
        self.notify.notified().await;
    }
}

fn apply_event(metrics: &mut SessionMetrics, tool_log: &mut VecDeque<String>, window: usize, event: &AiLoopEvent) {
    match event {
        AiLoopEvent::AiLoopStarted { .. } => {}
        AiLoopEvent::AiRequestPrepared { .. } => metrics.record_message(),
        AiLoopEvent::AiResponseReceived { elapsed_ms, .. } => metrics.record_response_time(*elapsed_ms as f64),
        AiLoopEvent::ToolExecutionStart { call, .. } => {
            metrics.record_tool_start(&call.name);
            tool_log.push_back(call.name.clone());
            while tool_log.len() > window {
                tool_log.pop_front();
            }
        }
        AiLoopEvent::ToolExecutionEnd { tool_name, is_error, .. } => {
            metrics.record_tool_end(tool_name);
            if *is_error {
                metrics.record_error();
            }
        }
        AiLoopEvent::AiLoopErrorOccurred { .. } => metrics.record_error(),
        AiLoopEvent::AiLoopStopped { .. } => {}
    }
}

/// Handle to a running per-session Monitor task.
pub struct SessionMonitorHandle {
    shutdown: ShutdownSignal,
    task: JoinHandle<()>,
}

impl SessionMonitorHandle {
    /// Signals the task to stop and waits for it to drain and exit.
    pub async fn stop(self) {
        self.shutdown.stop();
        let _ = self.task.await;
    }
}

/// Spawns a per-session background task: every `interval`, drains events
/// accumulated since the last poll, recomputes metrics, runs the anomaly
/// detectors in fixed order, and forwards any alerts to `alert_tx`.
///
/// `interval` is taken separately from `config.check_interval_secs` so tests
/// can poll faster than a whole-second resolution allows.
pub fn spawn_session_monitor(
    session_id: impl Into<String>,
    config: MonitorConfig,
    interval: Duration,
    mut events: mpsc::Receiver<AiLoopEvent>,
    alert_tx: mpsc::Sender<AnomalyAlert>,
) -> SessionMonitorHandle {
    let session_id = session_id.into();
    let shutdown = ShutdownSignal::new();
    let task_shutdown = shutdown.clone();

    let task = tokio::spawn(async move {
        let mut metrics = SessionMetrics::new(session_id, config.response_time_window);
        let mut baselines = BaselineTracker::new(config.ema_alpha as f64);
        let mut tool_log: VecDeque<String> = VecDeque::new();
        let detector = AnomalyDetector::new(config.clone());

        loop {
            if task_shutdown.is_stopping() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = task_shutdown.wait_stop() => break,
            }
            if task_shutdown.is_stopping() {
                break;
            }

            while let Ok(event) = events.try_recv() {
                apply_event(&mut metrics, &mut tool_log, config.tool_loop_window, &event);
            }

            let window: Vec<String> = tool_log.iter().cloned().collect();
            let alerts = detector.analyze(&metrics, &window, &mut baselines);
            for alert in alerts {
                debug!(kind = alert.kind.as_str(), session = %metrics.session_id, "anomaly detected");
                if alert_tx.send(alert).await.is_err() {
                    warn!("intervention queue closed; stopping session monitor");
                    return;
                }
            }
        }
    });

    SessionMonitorHandle { shutdown, task }
}

/// Handle to the global Intervention Orchestrator task.
pub struct InterventionOrchestratorHandle {
    shutdown: ShutdownSignal,
    task: JoinHandle<()>,
}

impl InterventionOrchestratorHandle {
    /// Stops accepting new alerts, lets in-flight per-session workers drain,
    /// and waits for everything to finish.
    pub async fn stop(self) {
        self.shutdown.stop();
        let _ = self.task.await;
    }
}

async fn session_intervention_worker(
    config: InterventionConfig,
    mut alerts: mpsc::Receiver<AnomalyAlert>,
    records: mpsc::Sender<InterventionRecord>,
) {
    let mut executor = InterventionExecutor::new(config);
    while let Some(alert) = alerts.recv().await {
        for record in executor.intervene(&alert) {
            if records.send(record).await.is_err() {
                return;
            }
        }
    }
}

/// Spawns the global Intervention Orchestrator: it drains `alert_rx` and
/// dispatches each alert needing intervention to that session's worker,
/// spawning one the first time a session is seen. Interventions for one
/// session are serialised through its worker; different sessions run
/// concurrently. Outcomes are forwarded to `record_tx`.
pub fn spawn_intervention_orchestrator(
    config: InterventionConfig,
    mut alert_rx: mpsc::Receiver<AnomalyAlert>,
    record_tx: mpsc::Sender<InterventionRecord>,
) -> InterventionOrchestratorHandle {
    let shutdown = ShutdownSignal::new();
    let task_shutdown = shutdown.clone();

    let task = tokio::spawn(async move {
        let mut workers: HashMap<String, mpsc::Sender<AnomalyAlert>> = HashMap::new();
        let mut worker_tasks = Vec::new();

        loop {
            let alert = tokio::select! {
                _ = task_shutdown.wait_stop() => break,
                received = alert_rx.recv() => match received {
                    Some(alert) => alert,
                    None => break,
                },
            };
            if !alert.requires_intervention {
                continue;
            }

            let session_id = alert.session_id.clone();
            let tx = workers
                .entry(session_id.clone())
                .or_insert_with(|| {
                    let (tx, rx) = mpsc::channel(32);
                    worker_tasks.push(tokio::spawn(session_intervention_worker(config.clone(), rx, record_tx.clone())));
                    tx
                })
                .clone();

            if tx.send(alert).await.is_err() {
                warn!(session = %session_id, "intervention worker gone; dropping stale entry");
                workers.remove(&session_id);
            }
        }

        drop(workers);
        for handle in worker_tasks {
            let _ = handle.await;
        }
    });

    InterventionOrchestratorHandle { shutdown, task }
}

/// Owns the background tasks for one session: the per-session Monitor task,
/// wired directly to the AI Loop's event stream. Shares a single
/// Intervention Orchestrator (and its alert queue) across every session,
/// matching the one-orchestrator-per-process concurrency model.
pub struct SessionSupervisor {
    monitor: SessionMonitorHandle,
}

impl SessionSupervisor {
    pub fn spawn(
        session_id: impl Into<String>,
        config: MonitorConfig,
        events: mpsc::Receiver<AiLoopEvent>,
        alert_tx: mpsc::Sender<AnomalyAlert>,
    ) -> Self {
        let interval = Duration::from_secs(config.check_interval_secs.max(1));
        Self { monitor: spawn_session_monitor(session_id, config, interval, events, alert_tx) }
    }

    /// Used by tests that need a faster-than-one-second poll interval.
    pub fn spawn_with_interval(
        session_id: impl Into<String>,
        config: MonitorConfig,
        interval: Duration,
        events: mpsc::Receiver<AiLoopEvent>,
        alert_tx: mpsc::Sender<AnomalyAlert>,
    ) -> Self {
        Self { monitor: spawn_session_monitor(session_id, config, interval, events, alert_tx) }
    }

    pub async fn shutdown(self) {
        self.monitor.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whisper_tools::ToolCall;

    fn fast_config() -> MonitorConfig {
        MonitorConfig { tool_loop_window: 10, tool_loop_repeat: 3, ..MonitorConfig::default() }
    }

    #[tokio::test]
    async fn session_monitor_forwards_alert_from_live_events() {
        let (event_tx, event_rx) = mpsc::channel(32);
        let (alert_tx, mut alert_rx) = mpsc::channel(8);
        let monitor =
            SessionSupervisor::spawn_with_interval("s1", fast_config(), Duration::from_millis(20), event_rx, alert_tx);

        for i in 0..4 {
            event_tx
                .send(AiLoopEvent::ToolExecutionStart {
                    session_id: "s1".into(),
                    call: ToolCall { id: i.to_string(), name: "grep".into(), args: serde_json::json!({}) },
                })
                .await
                .unwrap();
        }

        let alert = tokio::time::timeout(Duration::from_secs(2), alert_rx.recv()).await.unwrap().unwrap();
        assert_eq!(alert.kind, crate::anomaly::AlertKind::ToolLoop);
        assert_eq!(alert.session_id, "s1");

        drop(event_tx);
        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn session_monitor_stops_promptly() {
        let (_event_tx, event_rx) = mpsc::channel(8);
        let (alert_tx, _alert_rx) = mpsc::channel(8);
        let monitor = SessionSupervisor::spawn_with_interval(
            "s1",
            MonitorConfig::default(),
            Duration::from_millis(10),
            event_rx,
            alert_tx,
        );
        tokio::time::timeout(Duration::from_secs(2), monitor.shutdown()).await.unwrap();
    }

    fn alert(session_id: &str, kind: crate::anomaly::AlertKind) -> AnomalyAlert {
        AnomalyAlert {
            kind,
            severity: crate::anomaly::Severity::High,
            session_id: session_id.into(),
            message: "test".into(),
            requires_intervention: true,
        }
    }

    #[tokio::test]
    async fn orchestrator_dispatches_distinct_sessions_concurrently() {
        let (alert_tx, alert_rx) = mpsc::channel(8);
        let (record_tx, mut record_rx) = mpsc::channel(32);
        let orchestrator = spawn_intervention_orchestrator(InterventionConfig::default(), alert_rx, record_tx);

        alert_tx.send(alert("s1", crate::anomaly::AlertKind::SessionStall)).await.unwrap();
        alert_tx.send(alert("s2", crate::anomaly::AlertKind::ToolLoop)).await.unwrap();
        drop(alert_tx);

        let mut seen_sessions = std::collections::HashSet::new();
        while let Some(record) = record_rx.recv().await {
            seen_sessions.insert(record.session_id);
        }
        orchestrator.stop().await;

        assert!(seen_sessions.contains("s1"));
        assert!(seen_sessions.contains("s2"));
    }

    #[tokio::test]
    async fn orchestrator_serialises_repeat_alerts_for_the_same_session() {
        let (alert_tx, alert_rx) = mpsc::channel(8);
        let (record_tx, mut record_rx) = mpsc::channel(32);
        let orchestrator = spawn_intervention_orchestrator(InterventionConfig::default(), alert_rx, record_tx);

        for _ in 0..3 {
            alert_tx.send(alert("s1", crate::anomaly::AlertKind::SessionStall)).await.unwrap();
        }
        drop(alert_tx);

        let mut records = Vec::new();
        while let Some(record) = record_rx.recv().await {
            records.push(record);
        }
        orchestrator.stop().await;

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.session_id == "s1"));
    }

    #[tokio::test]
    async fn alerts_not_requiring_intervention_are_dropped_before_dispatch() {
        let (alert_tx, alert_rx) = mpsc::channel(8);
        let (record_tx, mut record_rx) = mpsc::channel(32);
        let orchestrator = spawn_intervention_orchestrator(InterventionConfig::default(), alert_rx, record_tx);

        let mut a = alert("s1", crate::anomaly::AlertKind::SlowResponse);
        a.requires_intervention = false;
        alert_tx.send(a).await.unwrap();
        drop(alert_tx);

        assert!(record_rx.recv().await.is_none());
        orchestrator.stop().await;
    }
}
