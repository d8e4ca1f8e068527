use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::detection::domain::tracked_detector::TrackedDetector;
use crate::shared::frame::Frame;

use super::bytetrack_tracker::{ByteTracker, DEFAULT_HIGH_THRESH, DEFAULT_MATCH_THRESH};

/// Confidence floor passed to the detector so low-score boxes can still
/// extend existing tracks. Display gating happens later, in the annotator.
pub const DEFAULT_DETECT_CONFIDENCE: f64 = 0.1;

/// Runs a detector on each frame and assigns track identities with ByteTrack.
pub struct TrackingDetector {
    detector: Box<dyn ObjectDetector>,
    tracker: ByteTracker,
    detect_confidence: f64,
}

impl TrackingDetector {
    /// Builds a tracker that may open a track for any detection the
    /// annotator would display at `display_threshold`.
    pub fn new(
        detector: Box<dyn ObjectDetector>,
        max_lost: usize,
        display_threshold: f64,
    ) -> Self {
        let tracker = ByteTracker::with_thresholds(
            max_lost,
            display_threshold.min(DEFAULT_HIGH_THRESH),
            DEFAULT_MATCH_THRESH,
        );
        Self::with_confidence(detector, tracker, DEFAULT_DETECT_CONFIDENCE)
    }

    pub fn with_confidence(
        detector: Box<dyn ObjectDetector>,
        tracker: ByteTracker,
        detect_confidence: f64,
    ) -> Self {
        Self {
            detector,
            tracker,
            detect_confidence,
        }
    }
}

impl TrackedDetector for TrackingDetector {
    fn track(&mut self, image: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let raw = self.detector.detect(image, self.detect_confidence)?;
        Ok(self.tracker.update(&raw))
    }
}
