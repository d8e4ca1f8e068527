use crate::annotation::domain::drawable_box::DrawableBox;
use crate::shared::frame::Frame;
use crate::shared::roi::Roi;

/// Draws the ROI outline and annotation boxes onto a frame in place.
pub trait FrameRenderer: Send {
    fn render(
        &self,
        frame: &mut Frame,
        roi: &Roi,
        boxes: &[DrawableBox],
    ) -> Result<(), Box<dyn std::error::Error>>;
}
