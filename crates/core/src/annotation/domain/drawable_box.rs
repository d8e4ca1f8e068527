use serde::Serialize;

use crate::tracking::domain::track_registry::TrackId;

/// A smoothed box in frame-global integer pixels, ready to draw.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrawableBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub track_id: TrackId,
    pub class_id: usize,
    pub confidence: f64,
    pub label: String,
}

impl DrawableBox {
    pub fn label_for(track_id: TrackId, class_name: &str, confidence: f64) -> String {
        format!("ID {track_id}: {class_name} {confidence:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(3, "plate", 0.876, "ID 3: plate 0.88")]
    #[case(12, "class0", 0.5, "ID 12: class0 0.50")]
    #[case(1, "bowl", 1.0, "ID 1: bowl 1.00")]
    fn test_label_format(
        #[case] id: TrackId,
        #[case] name: &str,
        #[case] conf: f64,
        #[case] expected: &str,
    ) {
        assert_eq!(DrawableBox::label_for(id, name, conf), expected);
    }
}
