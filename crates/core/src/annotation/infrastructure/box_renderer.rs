use crate::annotation::domain::drawable_box::DrawableBox;
use crate::annotation::domain::frame_renderer::FrameRenderer;
use crate::shared::frame::Frame;
use crate::shared::roi::Roi;

pub const ROI_COLOR: [u8; 3] = [0, 0, 255];
pub const BOX_COLOR: [u8; 3] = [0, 255, 0];
const DEFAULT_THICKNESS: u32 = 2;

/// Outlines rectangles directly in the RGB buffer.
///
/// Edges outside the frame are clipped; nothing is drawn for boxes that
/// lie entirely outside.
pub struct BoxRenderer {
    thickness: u32,
}

impl BoxRenderer {
    pub fn new(thickness: u32) -> Self {
        Self {
            thickness: thickness.max(1),
        }
    }
}

impl Default for BoxRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_THICKNESS)
    }
}

impl FrameRenderer for BoxRenderer {
    fn render(
        &self,
        frame: &mut Frame,
        roi: &Roi,
        boxes: &[DrawableBox],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() < 3 {
            return Err(format!("cannot draw on {}-channel frame", frame.channels()).into());
        }
        draw_rect(frame, roi.x1, roi.y1, roi.x2, roi.y2, ROI_COLOR, self.thickness);
        for b in boxes {
            draw_rect(frame, b.x1, b.y1, b.x2, b.y2, BOX_COLOR, self.thickness);
        }
        Ok(())
    }
}

/// Outlines `[x1, x2) x [y1, y2)` with bands `thickness` pixels wide,
/// drawn inward from each edge.
fn draw_rect(
    frame: &mut Frame,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    color: [u8; 3],
    thickness: u32,
) {
    let (left, right) = (x1.min(x2), x1.max(x2));
    let (top, bottom) = (y1.min(y2), y1.max(y2));
    let t = thickness as i32;

    fill(frame, left, top, right, (top + t).min(bottom), color);
    fill(frame, left, (bottom - t).max(top), right, bottom, color);
    fill(frame, left, top, (left + t).min(right), bottom, color);
    fill(frame, (right - t).max(left), top, right, bottom, color);
}

/// Paints the clipped half-open rectangle `[x1, x2) x [y1, y2)`.
fn fill(frame: &mut Frame, x1: i32, y1: i32, x2: i32, y2: i32, color: [u8; 3]) {
    let w = frame.width() as i32;
    let h = frame.height() as i32;
    let (x1, x2) = (x1.clamp(0, w), x2.clamp(0, w));
    let (y1, y2) = (y1.clamp(0, h), y2.clamp(0, h));
    if x1 >= x2 || y1 >= y2 {
        return;
    }

    let channels = frame.channels() as usize;
    let stride = w as usize * channels;
    let data = frame.data_mut();
    for y in y1 as usize..y2 as usize {
        for x in x1 as usize..x2 as usize {
            let offset = y * stride + x * channels;
            data[offset..offset + 3].copy_from_slice(&color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(w: u32, h: u32) -> Frame {
        Frame::new(vec![0u8; (w * h * 3) as usize], w, h, 3, 0)
    }

    fn pixel(frame: &Frame, x: usize, y: usize) -> [u8; 3] {
        let o = (y * frame.width() as usize + x) * 3;
        [frame.data()[o], frame.data()[o + 1], frame.data()[o + 2]]
    }

    fn drawable(x1: i32, y1: i32, x2: i32, y2: i32) -> DrawableBox {
        DrawableBox {
            x1,
            y1,
            x2,
            y2,
            track_id: 1,
            class_id: 0,
            confidence: 0.9,
            label: "ID 1: plate 0.90".into(),
        }
    }

    #[test]
    fn test_draws_outline_not_interior() {
        let mut frame = blank(20, 20);
        BoxRenderer::new(1)
            .render(&mut frame, &Roi::new(0, 0, 0, 0), &[drawable(5, 5, 15, 15)])
            .unwrap();

        assert_eq!(pixel(&frame, 5, 5), BOX_COLOR);
        assert_eq!(pixel(&frame, 14, 10), BOX_COLOR);
        assert_eq!(pixel(&frame, 10, 14), BOX_COLOR);
        assert_eq!(pixel(&frame, 10, 10), [0, 0, 0]);
        assert_eq!(pixel(&frame, 15, 15), [0, 0, 0]);
    }

    #[test]
    fn test_roi_drawn_in_roi_color_under_boxes() {
        let mut frame = blank(20, 20);
        BoxRenderer::new(1)
            .render(&mut frame, &Roi::new(0, 0, 20, 20), &[drawable(0, 0, 5, 5)])
            .unwrap();

        assert_eq!(pixel(&frame, 19, 19), ROI_COLOR);
        assert_eq!(pixel(&frame, 0, 0), BOX_COLOR);
    }

    #[test]
    fn test_out_of_frame_box_is_clipped() {
        let mut frame = blank(10, 10);
        BoxRenderer::default()
            .render(&mut frame, &Roi::new(0, 0, 0, 0), &[drawable(-5, -5, 50, 50)])
            .unwrap();
        assert_eq!(pixel(&frame, 5, 0), [0, 0, 0]);

        let mut frame = blank(10, 10);
        BoxRenderer::default()
            .render(&mut frame, &Roi::new(0, 0, 0, 0), &[drawable(100, 100, 120, 120)])
            .unwrap();
        assert!(frame.data().iter().all(|v| *v == 0));
    }

    #[test]
    fn test_rejects_grayscale_frame() {
        let mut frame = Frame::new(vec![0u8; 16], 4, 4, 1, 0);
        assert!(BoxRenderer::default()
            .render(&mut frame, &Roi::new(0, 0, 2, 2), &[])
            .is_err());
    }
}
