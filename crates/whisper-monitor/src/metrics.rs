// SPDX-License-Identifier: MIT
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// Per-session metrics the monitor recomputes every poll.
#[derive(Debug)]
pub struct SessionMetrics {
    pub session_id: String,
    pub last_activity: Instant,
    pub message_count: u64,
    pub tool_execution_count: u64,
    pub error_count: u64,
    pub intervention_count: u64,
    pub active_tools: Vec<String>,
    response_times_ms: VecDeque<f64>,
    response_window: usize,
    memory_samples_mb: Vec<f64>,
}

impl SessionMetrics {
    pub fn new(session_id: impl Into<String>, response_window: usize) -> Self {
        Self {
            session_id: session_id.into(),
            last_activity: Instant::now(),
            message_count: 0,
            tool_execution_count: 0,
            error_count: 0,
            intervention_count: 0,
            active_tools: Vec::new(),
            response_times_ms: VecDeque::new(),
            response_window,
            memory_samples_mb: Vec::new(),
        }
    }

    pub fn record_message(&mut self) {
        self.message_count += 1;
        self.last_activity = Instant::now();
    }

    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    pub fn record_tool_start(&mut self, tool_name: &str) {
        self.tool_execution_count += 1;
        self.active_tools.push(tool_name.to_string());
        self.last_activity = Instant::now();
    }

    pub fn record_tool_end(&mut self, tool_name: &str) {
        if let Some(idx) = self.active_tools.iter().position(|t| t == tool_name) {
            self.active_tools.remove(idx);
        }
    }

    /// Pushes a response-time sample, capped to a bounded ring buffer.
    pub fn record_response_time(&mut self, ms: f64) {
        self.response_times_ms.push_back(ms);
        while self.response_times_ms.len() > self.response_window {
            self.response_times_ms.pop_front();
        }
    }

    pub fn record_memory_sample(&mut self, mb: f64) {
        self.memory_samples_mb.push(mb);
    }

    pub fn avg_response_ms(&self) -> f64 {
        if self.response_times_ms.is_empty() {
            return 0.0;
        }
        self.response_times_ms.iter().sum::<f64>() / self.response_times_ms.len() as f64
    }

    pub fn stall_duration_secs(&self) -> f64 {
        self.last_activity.elapsed().as_secs_f64()
    }

    pub fn error_rate(&self) -> f64 {
        if self.message_count == 0 {
            return 0.0;
        }
        self.error_count as f64 / self.message_count as f64
    }

    pub fn memory_samples(&self) -> &[f64] {
        &self.memory_samples_mb
    }
}

/// Per-`(session_id, metric_name)` exponential-moving-average baseline,
/// seeded from the first sample for that key.
#[derive(Default)]
pub struct BaselineTracker {
    baselines: HashMap<(String, String), f64>,
    alpha: f64,
}

impl BaselineTracker {
    pub fn new(alpha: f64) -> Self {
        Self { baselines: HashMap::new(), alpha }
    }

    /// Idempotent update: the first call for a key seeds the baseline to
    /// that value; subsequent calls blend via `alpha`.
    pub fn update(&mut self, session_id: &str, metric: &str, value: f64) -> f64 {
        let key = (session_id.to_string(), metric.to_string());
        let updated = match self.baselines.get(&key) {
            Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
            None => value,
        };
        self.baselines.insert(key, updated);
        updated
    }

    pub fn get(&self, session_id: &str, metric: &str) -> Option<f64> {
        self.baselines.get(&(session_id.to_string(), metric.to_string())).copied()
    }
}
