use crate::tracking::domain::track_registry::TrackId;

/// Detector output before identities are assigned.
///
/// `bbox` is `[x1, y1, x2, y2]` in the coordinates of the image that was
/// passed to the detector (ROI-local when the caller crops).
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetection {
    pub bbox: [f64; 4],
    pub confidence: f64,
    pub class_id: usize,
}

/// A detection carrying the tracker's identity for the object.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: [f64; 4],
    pub track_id: TrackId,
    pub confidence: f64,
    pub class_id: usize,
}

impl Detection {
    pub fn has_finite_bbox(&self) -> bool {
        self.bbox.iter().all(|v| v.is_finite())
    }
}
