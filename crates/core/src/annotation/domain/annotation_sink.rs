use crate::annotation::domain::drawable_box::DrawableBox;
use crate::shared::frame::Frame;

/// Receives every rendered frame together with the boxes drawn on it.
///
/// Sinks run on the pipeline's main thread, in frame order.
pub trait AnnotationSink: Send {
    fn record(&mut self, frame: &Frame, boxes: &[DrawableBox])
        -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes buffered output. Default: no-op.
    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}
