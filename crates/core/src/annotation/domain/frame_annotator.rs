use crate::detection::domain::detection::Detection;
use crate::shared::roi::Roi;
use crate::tracking::domain::track_registry::{SmoothingConfig, TrackRegistry};

use super::drawable_box::DrawableBox;

/// Turns one frame's tracked detections into smoothed, frame-global boxes.
///
/// Owns the session's [`TrackRegistry`]; use one annotator per video.
pub struct FrameAnnotator {
    registry: TrackRegistry,
    class_names: Vec<String>,
}

impl FrameAnnotator {
    pub fn new(smoothing: SmoothingConfig, class_names: Vec<String>) -> Self {
        Self {
            registry: TrackRegistry::new(smoothing),
            class_names,
        }
    }

    /// Gates, smooths and translates `detections` (ROI-local boxes).
    ///
    /// Detections below `confidence_threshold` are dropped; one exactly at
    /// it is kept. Output order follows input order. Every reported track
    /// counts as seen, drawn or not, so only tracks the tracker stopped
    /// reporting are evicted afterwards.
    pub fn annotate(
        &mut self,
        frame_index: usize,
        detections: &[Detection],
        roi: &Roi,
        confidence_threshold: f64,
    ) -> Vec<DrawableBox> {
        let (ox, oy) = roi.offset();
        let mut boxes = Vec::with_capacity(detections.len());

        for det in detections {
            self.registry.touch(det.track_id, frame_index);
            if det.confidence < confidence_threshold {
                continue;
            }
            if !det.has_finite_bbox() {
                log::warn!(
                    "frame {frame_index}: dropping track {} with non-finite box {:?}",
                    det.track_id,
                    det.bbox
                );
                continue;
            }

            let smoothed = self
                .registry
                .get_or_insert(det.track_id, frame_index)
                .smooth(det.bbox);
            let class_name = self.class_name(det.class_id);

            boxes.push(DrawableBox {
                x1: (smoothed[0] + ox) as i32,
                y1: (smoothed[1] + oy) as i32,
                x2: (smoothed[2] + ox) as i32,
                y2: (smoothed[3] + oy) as i32,
                track_id: det.track_id,
                class_id: det.class_id,
                confidence: det.confidence,
                label: DrawableBox::label_for(det.track_id, &class_name, det.confidence),
            });
        }

        let evicted = self.registry.evict_stale(frame_index);
        if evicted > 0 {
            log::debug!("frame {frame_index}: evicted {evicted} idle tracks");
        }
        boxes
    }

    /// Name for a detector class id, `class{id}` when unnamed.
    pub fn class_name(&self, class_id: usize) -> String {
        self.class_names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class{class_id}"))
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }
}
