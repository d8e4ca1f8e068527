use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::error::MonitorError;
use crate::shared::frame::Frame;

use super::reward::RewardModel;
use super::threshold_space::{Action, ThresholdSpace};

/// Outcome of one environment step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub next_state: usize,
    pub reward: f64,
    pub detection_count: usize,
}

/// Wraps a detector so that moving between thresholds yields a reward.
///
/// The action is applied first; the detector then runs at the destination
/// threshold on the supplied ROI image.
pub struct ThresholdEnvironment {
    detector: Box<dyn ObjectDetector>,
    space: ThresholdSpace,
    reward: RewardModel,
}

impl ThresholdEnvironment {
    pub fn new(
        detector: Box<dyn ObjectDetector>,
        space: ThresholdSpace,
        reward: RewardModel,
    ) -> Self {
        Self {
            detector,
            space,
            reward,
        }
    }

    pub fn step(
        &mut self,
        state: usize,
        action: Action,
        roi_image: &Frame,
    ) -> Result<Transition, Box<dyn std::error::Error>> {
        let next_state = self.space.apply(state, action);
        let threshold = self.space.threshold(next_state);
        let detection_count = self
            .detector
            .detect(roi_image, threshold)
            .map_err(|e| MonitorError::from_boxed(e, MonitorError::Detector))?
            .iter()
            .filter(|d| d.confidence >= threshold)
            .count();
        let reward = self.reward.reward(detection_count);

        log::debug!(
            "frame {}: state {state} -> {next_state} (threshold {threshold:.2}), \
             {detection_count} detections, reward {reward}",
            roi_image.index()
        );

        Ok(Transition {
            next_state,
            reward,
            detection_count,
        })
    }

    pub fn space(&self) -> &ThresholdSpace {
        &self.space
    }
}
