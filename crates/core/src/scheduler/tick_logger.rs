use std::collections::HashMap;
use std::time::Instant;

use crate::scheduler::detection_scheduler::SkipReason;

/// Cross-cutting logger for scheduler events.
///
/// Keeps the scheduler loop free of output concerns: the session picks a
/// logger, tests pass the silent one.
pub trait TickLogger: Send {
    /// A tick fired but no inference was dispatched.
    fn tick_skipped(&mut self, reason: SkipReason);

    /// Record how long a named stage took for one pass.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per pass).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullTickLogger;

impl TickLogger for NullTickLogger {
    fn tick_skipped(&mut self, _reason: SkipReason) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running aggregate for one timing stage or metric.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SampleStats {
    pub count: usize,
    pub total: f64,
    pub max: f64,
}

impl SampleStats {
    fn record(&mut self, value: f64) {
        self.max = if self.count == 0 { value } else { self.max.max(value) };
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Forwards to the `log` facade and keeps per-stage timing and metric
/// aggregates for a summary when the session ends. Memory stays constant
/// no matter how long the session runs.
pub struct LogTickLogger {
    timings: HashMap<String, SampleStats>,
    metrics: HashMap<String, SampleStats>,
    busy_skips: usize,
    no_frame_skips: usize,
    start_time: Instant,
}

impl LogTickLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            metrics: HashMap::new(),
            busy_skips: 0,
            no_frame_skips: 0,
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary, or `None` if no pass was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Detection summary ({elapsed_s:.1}s, {} busy skips, {} no-frame skips):",
            self.busy_skips, self.no_frame_skips
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stats = &self.timings[stage];
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms  ({} passes)",
                stats.mean(),
                stats.max,
                stats.count
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            lines.push(format!("  {name}: avg {:.1}", self.metrics[name].mean()));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&SampleStats> {
        self.timings.get(stage)
    }

    pub fn metrics_for(&self, name: &str) -> Option<&SampleStats> {
        self.metrics.get(name)
    }
}

impl Default for LogTickLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl TickLogger for LogTickLogger {
    fn tick_skipped(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Busy => self.busy_skips += 1,
            SkipReason::NoFrame => self.no_frame_skips += 1,
        }
        log::trace!("Tick skipped: {reason}");
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
