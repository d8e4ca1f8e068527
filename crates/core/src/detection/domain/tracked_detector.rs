use crate::shared::frame::Frame;

use super::detection::Detection;

/// Domain interface for detection with persistent identities.
///
/// Tracker state lives inside the implementation and carries over between
/// calls, so consecutive calls must come from one logical stream, in order.
pub trait TrackedDetector: Send {
    fn track(&mut self, image: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
