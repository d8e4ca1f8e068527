use crate::annotation::domain::annotation_sink::AnnotationSink;
use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::annotation::domain::frame_renderer::FrameRenderer;
use crate::detection::domain::detection::Detection;
use crate::detection::domain::tracked_detector::TrackedDetector;
use crate::shared::error::MonitorError;
use crate::shared::frame::Frame;
use crate::shared::roi::Roi;

/// Runs the tracked detector on the ROI crop of `frame`.
///
/// Returned boxes are ROI-local.
pub fn detect_in_roi(
    detector: &mut dyn TrackedDetector,
    frame: &Frame,
    roi: &Roi,
) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
    let crop = frame.crop(roi).ok_or_else(|| {
        MonitorError::InvalidConfig(format!(
            "ROI {roi} lies outside the {}x{} frame",
            frame.width(),
            frame.height()
        ))
    })?;
    detector
        .track(&crop)
        .map_err(|e| MonitorError::from_boxed(e, MonitorError::Detector).into())
}

/// Per-frame work of the main thread: smooth, draw, record.
///
/// Holds all session state that must see frames in order.
pub struct AnnotationStage {
    annotator: FrameAnnotator,
    renderer: Box<dyn FrameRenderer>,
    sinks: Vec<Box<dyn AnnotationSink>>,
    roi: Roi,
    confidence_threshold: f64,
}

impl AnnotationStage {
    pub fn new(
        annotator: FrameAnnotator,
        renderer: Box<dyn FrameRenderer>,
        sinks: Vec<Box<dyn AnnotationSink>>,
        roi: Roi,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            annotator,
            renderer,
            sinks,
            roi,
            confidence_threshold,
        }
    }

    /// Annotates `frame` in place and returns how many boxes were drawn.
    pub fn process(
        &mut self,
        frame: &mut Frame,
        detections: &[Detection],
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let boxes = self.annotator.annotate(
            frame.index(),
            detections,
            &self.roi,
            self.confidence_threshold,
        );
        self.renderer.render(frame, &self.roi, &boxes)?;
        for sink in &mut self.sinks {
            sink.record(frame, &boxes)?;
        }
        Ok(boxes.len())
    }

    pub fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        for sink in &mut self.sinks {
            sink.finish()?;
        }
        Ok(())
    }

    pub fn roi(&self) -> Roi {
        self.roi
    }
}
