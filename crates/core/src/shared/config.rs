use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optimization::domain::q_learning_optimizer::OptimizerConfig;
use crate::optimization::domain::reward::RewardConfig;
use crate::optimization::domain::threshold_space::ThresholdSpace;
use crate::shared::constants::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MODEL_PATH, DEFAULT_ROI};
use crate::shared::roi::Roi;
use crate::tracking::domain::track_registry::SmoothingConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot access config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("no per-user config directory on this platform")]
    NoConfigDir,
}

/// Everything a processing or optimization run needs, persisted as JSON.
///
/// Missing fields fall back to their defaults, so a file may set only
/// what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub roi: Roi,
    pub confidence_threshold: f64,
    pub model_path: PathBuf,
    /// Class names indexed by detector class id.
    pub class_names: Vec<String>,
    pub smoothing: SmoothingConfig,
    pub optimizer: OptimizerConfig,
    pub reward: RewardConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let (x1, y1, x2, y2) = DEFAULT_ROI;
        Self {
            roi: Roi::new(x1, y1, x2, y2),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            class_names: Vec::new(),
            smoothing: SmoothingConfig::default(),
            optimizer: OptimizerConfig::default(),
            reward: RewardConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// `<config dir>/DispatchMonitor/config.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|d| d.join("DispatchMonitor").join("config.json"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.roi.validate()?;
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(format!(
                "confidence threshold must be in [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        self.smoothing.validate()?;
        self.optimizer.validate()?;
        ThresholdSpace::new(self.optimizer.candidate_thresholds.clone())?;
        self.reward.validate()
    }
}
