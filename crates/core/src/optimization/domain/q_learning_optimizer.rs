use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    DEFAULT_ALPHA, DEFAULT_CANDIDATE_THRESHOLDS, DEFAULT_EPISODES, DEFAULT_EPSILON, DEFAULT_GAMMA,
};
use crate::shared::error::MonitorError;

use super::episode_source::{CachedEpisodeSource, EpisodeSource};
use super::q_table::QTable;
use super::threshold_environment::ThresholdEnvironment;
use super::threshold_space::Action;

/// Episodes between reward log lines.
const REPORT_EVERY: usize = 10;

/// Hyperparameters of the threshold search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub candidate_thresholds: Vec<f64>,
    pub episodes: usize,
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon: f64,
    /// Fixed seed for reproducible runs; `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Decode the video once and replay the ROI crops from memory.
    pub cache_frames: bool,
    /// Stop early once no Q-value moved by more than this in an episode.
    pub convergence_tolerance: Option<f64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            candidate_thresholds: DEFAULT_CANDIDATE_THRESHOLDS.to_vec(),
            episodes: DEFAULT_EPISODES,
            alpha: DEFAULT_ALPHA,
            gamma: DEFAULT_GAMMA,
            epsilon: DEFAULT_EPSILON,
            seed: None,
            cache_frames: false,
            convergence_tolerance: None,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.episodes == 0 {
            return Err("episode count must be positive".into());
        }
        for (name, value) in [
            ("alpha", self.alpha),
            ("gamma", self.gamma),
            ("epsilon", self.epsilon),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must be in [0, 1], got {value}"));
            }
        }
        if let Some(tol) = self.convergence_tolerance {
            if !(tol.is_finite() && tol > 0.0) {
                return Err(format!("convergence tolerance must be positive, got {tol}"));
            }
        }
        Ok(())
    }
}

/// Per-episode progress handed to the observer callback.
#[derive(Clone, Copy, Debug)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub total_episodes: usize,
    pub total_reward: f64,
    pub steps: usize,
    pub max_q_change: f64,
}

/// Result of a completed search.
#[derive(Clone, Debug)]
pub struct OptimizationReport {
    pub recommended_threshold: f64,
    /// Mean action value per candidate, in candidate order.
    pub state_values: Array1<f64>,
    pub episode_rewards: Vec<f64>,
    pub episodes_run: usize,
    pub q_table: QTable,
}

/// Epsilon-greedy tabular Q-learning over the candidate thresholds.
///
/// The recommendation is the candidate with the highest mean action value,
/// which ranks states by how rewarding it is to act from them rather than
/// reading out a greedy policy.
pub struct QLearningOptimizer {
    config: OptimizerConfig,
    rng: StdRng,
}

impl QLearningOptimizer {
    pub fn new(config: OptimizerConfig) -> Result<Self, MonitorError> {
        config.validate().map_err(MonitorError::InvalidConfig)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { config, rng })
    }

    /// Runs every episode and returns the recommendation.
    ///
    /// `on_episode` is called after each episode; returning `false` aborts
    /// the run with [`MonitorError::Cancelled`].
    pub fn run(
        &mut self,
        env: &mut ThresholdEnvironment,
        source: &mut dyn EpisodeSource,
        mut on_episode: impl FnMut(&EpisodeSummary) -> bool,
    ) -> Result<OptimizationReport, Box<dyn std::error::Error>> {
        let mut cached;
        let source: &mut dyn EpisodeSource = if self.config.cache_frames {
            cached = CachedEpisodeSource::fill(source)?;
            &mut cached
        } else {
            source
        };

        let num_states = env.space().len();
        let mut q = QTable::new(num_states);
        let mut episode_rewards = Vec::with_capacity(self.config.episodes);

        for episode in 0..self.config.episodes {
            let summary = self.run_episode(episode, env, source, &mut q)?;
            episode_rewards.push(summary.total_reward);

            if (episode + 1) % REPORT_EVERY == 0 {
                log::info!(
                    "Episode {}/{}: total reward {:.1}",
                    episode + 1,
                    self.config.episodes,
                    summary.total_reward
                );
            }

            if !on_episode(&summary) {
                return Err(MonitorError::Cancelled.into());
            }

            if let Some(tol) = self.config.convergence_tolerance {
                if summary.steps > 0 && summary.max_q_change < tol {
                    log::info!(
                        "Converged after {} episodes (max change {:.2e})",
                        episode + 1,
                        summary.max_q_change
                    );
                    break;
                }
            }
        }

        let state_values = q.state_means();
        let best = q.recommended_state();
        let recommended_threshold = env.space().threshold(best);
        log::info!("Recommended confidence threshold: {recommended_threshold:.2}");

        Ok(OptimizationReport {
            recommended_threshold,
            state_values,
            episodes_run: episode_rewards.len(),
            episode_rewards,
            q_table: q,
        })
    }

    fn run_episode(
        &mut self,
        episode: usize,
        env: &mut ThresholdEnvironment,
        source: &mut dyn EpisodeSource,
        q: &mut QTable,
    ) -> Result<EpisodeSummary, Box<dyn std::error::Error>> {
        let mut state = self.rng.gen_range(0..q.num_states());
        let mut total_reward = 0.0;
        let mut max_q_change: f64 = 0.0;
        let mut steps = 0;

        for frame in source.pass()? {
            let frame = frame?;
            let action = self.choose_action(q, state);
            let transition = env.step(state, action, &frame)?;

            let before = q.get(state, action);
            let after = q.update(
                state,
                action,
                transition.reward,
                transition.next_state,
                self.config.alpha,
                self.config.gamma,
            );
            max_q_change = max_q_change.max((after - before).abs());

            total_reward += transition.reward;
            state = transition.next_state;
            steps += 1;
        }

        Ok(EpisodeSummary {
            episode,
            total_episodes: self.config.episodes,
            total_reward,
            steps,
            max_q_change,
        })
    }

    fn choose_action(&mut self, q: &QTable, state: usize) -> Action {
        if self.rng.gen::<f64>() < self.config.epsilon {
            Action::ALL[self.rng.gen_range(0..Action::ALL.len())]
        } else {
            q.best_action(state)
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::domain::reward::RewardModel;
    use crate::optimization::domain::threshold_environment::tests::StubDetector;
    use crate::optimization::domain::threshold_space::ThresholdSpace;
    use crate::shared::frame::Frame;
    use approx::assert_relative_eq;

    fn frames(n: usize) -> CachedEpisodeSource {
        CachedEpisodeSource::new(
            (0..n)
                .map(|i| Frame::new(vec![0u8; 8 * 8 * 3], 8, 8, 3, i))
                .collect(),
        )
    }

    fn env(detector: StubDetector, candidates: Vec<f64>) -> ThresholdEnvironment {
        ThresholdEnvironment::new(
            Box::new(detector),
            ThresholdSpace::new(candidates).unwrap(),
            RewardModel::default(),
        )
    }

    fn seeded(episodes: usize) -> OptimizerConfig {
        OptimizerConfig {
            episodes,
            seed: Some(42),
            ..OptimizerConfig::default()
        }
    }

    #[test]
    fn test_constant_eight_detections_gives_constant_reward() {
        let mut env = env(StubDetector::constant(8), DEFAULT_CANDIDATE_THRESHOLDS.to_vec());
        let mut optimizer = QLearningOptimizer::new(seeded(5)).unwrap();

        let report = optimizer.run(&mut env, &mut frames(10), |_| true).unwrap();

        assert_eq!(report.episodes_run, 5);
        for total in &report.episode_rewards {
            assert_relative_eq!(*total, 100.0);
        }
        assert!(DEFAULT_CANDIDATE_THRESHOLDS.contains(&report.recommended_threshold));
    }

    #[test]
    fn test_same_seed_gives_same_report() {
        let run = || {
            let mut env = env(StubDetector::constant(8), DEFAULT_CANDIDATE_THRESHOLDS.to_vec());
            QLearningOptimizer::new(seeded(5))
                .unwrap()
                .run(&mut env, &mut frames(10), |_| true)
                .unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.recommended_threshold, b.recommended_threshold);
        assert_eq!(a.q_table, b.q_table);
    }

    #[test]
    fn test_empty_stream_recommends_first_candidate() {
        let mut env = env(StubDetector::constant(8), vec![0.2, 0.3, 0.4]);
        let mut optimizer = QLearningOptimizer::new(seeded(3)).unwrap();

        let report = optimizer.run(&mut env, &mut frames(0), |_| true).unwrap();
        assert_relative_eq!(report.recommended_threshold, 0.2);
        assert!(report.state_values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_learns_threshold_that_keeps_detections() {
        // Five detections survive only the lowest threshold.
        let detector = StubDetector::new(vec![0.25; 5]);
        let mut env = env(detector, vec![0.2, 0.3, 0.4]);
        let mut optimizer = QLearningOptimizer::new(OptimizerConfig {
            episodes: 200,
            alpha: 0.5,
            epsilon: 1.0,
            seed: Some(7),
            ..OptimizerConfig::default()
        })
        .unwrap();

        let report = optimizer.run(&mut env, &mut frames(20), |_| true).unwrap();
        assert_relative_eq!(report.recommended_threshold, 0.2);
        assert!(report.state_values[0] > report.state_values[1]);
        assert!(report.state_values[1] > report.state_values[2]);
    }

    #[test]
    fn test_convergence_tolerance_stops_early() {
        let mut env = env(StubDetector::constant(8), vec![0.5]);
        let mut optimizer = QLearningOptimizer::new(OptimizerConfig {
            episodes: 1000,
            alpha: 1.0,
            gamma: 0.0,
            convergence_tolerance: Some(1e-9),
            seed: Some(1),
            ..OptimizerConfig::default()
        })
        .unwrap();

        // alpha 1, gamma 0: a revisited pair is already at its reward.
        let report = optimizer.run(&mut env, &mut frames(4), |_| true).unwrap();
        assert!(report.episodes_run < 1000);
    }

    #[test]
    fn test_observer_can_cancel() {
        let mut env = env(StubDetector::constant(8), vec![0.2, 0.3]);
        let mut optimizer = QLearningOptimizer::new(seeded(10)).unwrap();

        let err = optimizer
            .run(&mut env, &mut frames(3), |s| s.episode < 2)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MonitorError>(),
            Some(MonitorError::Cancelled)
        ));
    }

    #[test]
    fn test_cache_frames_produces_same_result() {
        let run = |cache_frames| {
            let mut env = env(StubDetector::constant(4), vec![0.2, 0.3, 0.4]);
            QLearningOptimizer::new(OptimizerConfig {
                cache_frames,
                ..seeded(4)
            })
            .unwrap()
            .run(&mut env, &mut frames(6), |_| true)
            .unwrap()
        };
        assert_eq!(run(true).q_table, run(false).q_table);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = QLearningOptimizer::new(OptimizerConfig {
            epsilon: 1.5,
            ..OptimizerConfig::default()
        })
        .err()
        .unwrap();
        assert_eq!(err.exit_code(), 4);
        assert!(QLearningOptimizer::new(OptimizerConfig {
            episodes: 0,
            ..OptimizerConfig::default()
        })
        .is_err());
    }
}
