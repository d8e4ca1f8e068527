use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::optimization::domain::episode_source::EpisodeSource;
use crate::optimization::domain::q_learning_optimizer::{OptimizationReport, QLearningOptimizer};
use crate::optimization::domain::threshold_environment::ThresholdEnvironment;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::config::MonitorConfig;
use crate::shared::error::MonitorError;

/// Fails fast when the model or the video is missing, before any
/// expensive setup.
pub fn check_inputs(model_path: &Path, video_path: &Path) -> Result<(), MonitorError> {
    if !model_path.is_file() {
        return Err(MonitorError::MissingModel(model_path.to_path_buf()));
    }
    if !video_path.is_file() {
        return Err(MonitorError::MissingVideo(video_path.to_path_buf()));
    }
    Ok(())
}

/// Searches for the confidence threshold that keeps the dispatch-area
/// object count in its sweet spot.
pub struct OptimizeThresholdUseCase {
    optimizer: QLearningOptimizer,
    env: ThresholdEnvironment,
    source: Box<dyn EpisodeSource>,
    logger: Box<dyn PipelineLogger>,
    cancelled: Arc<AtomicBool>,
}

impl OptimizeThresholdUseCase {
    pub fn new(
        optimizer: QLearningOptimizer,
        env: ThresholdEnvironment,
        source: Box<dyn EpisodeSource>,
        logger: Box<dyn PipelineLogger>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            optimizer,
            env,
            source,
            logger,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn execute(&mut self) -> Result<OptimizationReport, Box<dyn std::error::Error>> {
        let candidates = self.env.space().candidates().len();
        self.logger.info(&format!(
            "Optimizing over {candidates} thresholds for {} episodes",
            self.optimizer.config().episodes
        ));

        let logger = &mut self.logger;
        let cancelled = &self.cancelled;
        let mut episode_start = Instant::now();

        let report = self.optimizer.run(&mut self.env, &mut *self.source, |summary| {
            logger.timing("episode", episode_start.elapsed().as_secs_f64() * 1000.0);
            logger.metric("reward", summary.total_reward);
            logger.metric("max_q_change", summary.max_q_change);
            logger.progress(summary.episode + 1, summary.total_episodes);
            episode_start = Instant::now();
            !cancelled.load(Ordering::Relaxed)
        })?;

        for (threshold, value) in self
            .env
            .space()
            .candidates()
            .iter()
            .zip(report.state_values.iter())
        {
            log::debug!("threshold {threshold:.2}: mean Q {value:.3}");
        }
        self.logger.info(&format!(
            "Recommended confidence threshold: {:.2}",
            report.recommended_threshold
        ));
        self.logger.summary();
        Ok(report)
    }
}

/// Stores `threshold` as the processing threshold in the config file at
/// `path`, creating the file from defaults if needed.
pub fn write_recommendation(path: &Path, threshold: f64) -> Result<MonitorConfig, MonitorError> {
    let mut config = MonitorConfig::load_or_default(path)?;
    config.confidence_threshold = threshold;
    config.save(path)?;
    log::info!("Saved threshold {threshold:.2} to {}", path.display());
    Ok(config)
}
