use serde::{Deserialize, Serialize};

/// Shape of the detection-count reward.
///
/// Counts strictly inside `(sweet_spot_min, sweet_spot_max)` earn
/// `sweet_spot_reward`; zero detections earn `empty_penalty`; anything
/// else is penalized by its distance from `target_count`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub sweet_spot_min: usize,
    pub sweet_spot_max: usize,
    pub sweet_spot_reward: f64,
    pub empty_penalty: f64,
    pub target_count: usize,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            sweet_spot_min: 2,
            sweet_spot_max: 15,
            sweet_spot_reward: 10.0,
            empty_penalty: -20.0,
            target_count: 8,
        }
    }
}

impl RewardConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sweet_spot_min >= self.sweet_spot_max {
            return Err(format!(
                "reward sweet spot ({}, {}) is empty",
                self.sweet_spot_min, self.sweet_spot_max
            ));
        }
        if !self.sweet_spot_reward.is_finite() || !self.empty_penalty.is_finite() {
            return Err("reward values must be finite".into());
        }
        Ok(())
    }
}

/// Scores the number of detections one step produced.
#[derive(Clone, Debug, Default)]
pub struct RewardModel {
    config: RewardConfig,
}

impl RewardModel {
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    pub fn reward(&self, count: usize) -> f64 {
        let c = &self.config;
        if c.sweet_spot_min < count && count < c.sweet_spot_max {
            c.sweet_spot_reward
        } else if count == 0 {
            c.empty_penalty
        } else {
            -(count.abs_diff(c.target_count) as f64)
        }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }
}
