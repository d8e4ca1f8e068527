use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for long-running use cases.
///
/// `current`/`total` count frames for video processing and episodes for
/// threshold optimization; the logger is told which via its unit label.
pub trait PipelineLogger: Send {
    fn progress(&mut self, current: usize, total: usize);

    /// Wall time spent in a named stage for one unit of work.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time value such as an episode reward or a box count.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards every event.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logs progress through the `log` crate and keeps per-stage timings and
/// metrics for a closing summary.
///
/// Progress lines are emitted every `throttle` units and on the last one.
pub struct StdoutPipelineLogger {
    unit: &'static str,
    throttle: usize,
    timings: BTreeMap<String, Vec<f64>>,
    metrics: BTreeMap<String, Vec<f64>>,
    start_time: Instant,
    completed: usize,
}

impl StdoutPipelineLogger {
    pub fn new(unit: &'static str, throttle: usize) -> Self {
        Self {
            unit,
            throttle: throttle.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            completed: 0,
        }
    }

    pub fn for_frames() -> Self {
        Self::new("frames", 100)
    }

    pub fn for_episodes() -> Self {
        Self::new("episodes", 10)
    }

    /// Formatted report, or `None` before anything was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Run summary ({} {}, {:.1}s):",
            self.completed,
            self.unit,
            elapsed_ms / 1000.0
        )];

        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            let share = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:7.1}ms  total {total_ms:8.0}ms  ({share:4.1}%)"
            ));
        }

        for (name, values) in &self.metrics {
            let last = values.last().copied().unwrap_or(0.0);
            lines.push(format!("  {name}: avg {:.1}, last {last:.1}", mean(values)));
        }

        if self.completed > 0 && elapsed_ms > 0.0 {
            let rate = self.completed as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {rate:.1} {}/s", self.unit));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(Vec::as_slice)
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(Vec::as_slice)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.completed = current;
        if total > 0 && (current % self.throttle == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Progress: {current}/{total} {} ({pct:.1}%)", self.unit);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("episode", 5.0);
        logger.metric("reward", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timings_are_kept_per_stage() {
        let mut logger = StdoutPipelineLogger::for_frames();
        logger.timing("track", 20.0);
        logger.timing("track", 30.0);
        logger.timing("render", 5.0);

        assert_eq!(logger.timings_for("track").unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for("render").unwrap(), &[5.0]);
        assert!(logger.timings_for("write").is_none());
    }

    #[test]
    fn test_metrics_average() {
        let mut logger = StdoutPipelineLogger::for_episodes();
        logger.metric("reward", 30.0);
        logger.metric("reward", 40.0);

        assert_relative_eq!(mean(logger.metrics_for("reward").unwrap()), 35.0);
    }

    #[test]
    fn test_summary_lists_stages_metrics_and_rate() {
        let mut logger = StdoutPipelineLogger::for_episodes();
        logger.progress(10, 10);
        logger.timing("episode", 12.0);
        logger.metric("reward", 30.0);
        logger.metric("reward", 40.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Run summary (10 episodes"));
        assert!(summary.contains("episode"));
        assert!(summary.contains("reward: avg 35.0, last 40.0"));
        assert!(summary.contains("episodes/s"));
    }

    #[test]
    fn test_empty_summary_is_none() {
        assert!(StdoutPipelineLogger::for_frames().summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_completed_units() {
        let mut logger = StdoutPipelineLogger::new("frames", 0);
        for i in 1..=20 {
            logger.progress(i, 20);
        }
        assert_eq!(logger.completed, 20);
        assert_eq!(logger.throttle, 1);
    }
}
