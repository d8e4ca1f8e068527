use crate::shared::frame::Frame;

use super::detection::RawDetection;

/// Domain interface for a single-image object detector.
///
/// Stateless from the caller's point of view, but `&mut self` lets
/// implementations reuse inference buffers.
pub trait ObjectDetector: Send {
    /// Detections scoring at least `confidence` in `image`.
    fn detect(
        &mut self,
        image: &Frame,
        confidence: f64,
    ) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>>;
}
