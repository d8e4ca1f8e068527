/// YOLOv8 object detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, and class-aware NMS.
/// Tracking is layered on top by `TrackingDetector`.
use std::path::Path;

use crate::detection::domain::detection::RawDetection;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::frame::Frame;

use super::execution_provider::preferred_execution_providers;
use super::math::{bbox_iou, cxcywh_to_xyxy};

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// YOLOv8 detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLOv8 ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!("Loaded detector {} (input {input_size}px)", model_path.display());

        Ok(Self {
            session,
            input_size,
        })
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(
        &mut self,
        image: &Frame,
        confidence: f64,
    ) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(image, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = decode_output(data, &shape, confidence)?;
        for det in &mut raw {
            det.bbox = unletterbox(det.bbox, scale, pad_x, pad_y, image.width(), image.height());
        }
        Ok(nms(&mut raw, NMS_IOU_THRESH))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padded with 114/255 gray, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize + copy into padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

/// Maps a letterboxed box back to source-image pixels, clipped to the image.
fn unletterbox(bbox: [f64; 4], scale: f64, pad_x: u32, pad_y: u32, w: u32, h: u32) -> [f64; 4] {
    let px = pad_x as f64;
    let py = pad_y as f64;
    [
        ((bbox[0] - px) / scale).clamp(0.0, w as f64),
        ((bbox[1] - py) / scale).clamp(0.0, h as f64),
        ((bbox[2] - px) / scale).clamp(0.0, w as f64),
        ((bbox[3] - py) / scale).clamp(0.0, h as f64),
    ]
}

// ---------------------------------------------------------------------------
// Output decoding
// ---------------------------------------------------------------------------

/// Parses a YOLOv8 head output into letterbox-space detections.
///
/// Accepts `[1, 4 + classes, anchors]` (the exporter's default) or the
/// transposed `[1, anchors, 4 + classes]`. Each anchor takes its best class.
fn decode_output(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_anchors, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 {
        return Err(format!("YOLO output has too few features: {shape:?}").into());
    }

    let value = |anchor: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_anchors + anchor] as f64
        } else {
            data[anchor * num_feats + feat] as f64
        }
    };

    let mut dets = Vec::new();
    for i in 0..num_anchors {
        let (class_id, score) = (4..num_feats)
            .map(|f| (f - 4, value(i, f)))
            .fold((0, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        if score < confidence {
            continue;
        }
        dets.push(RawDetection {
            bbox: cxcywh_to_xyxy(value(i, 0), value(i, 1), value(i, 2), value(i, 3)),
            confidence: score,
            class_id,
        });
    }
    Ok(dets)
}

/// Greedy per-class NMS: sort by confidence descending, suppress overlapping
/// boxes of the same class.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] || dets[j].class_id != dets[i].class_id {
                continue;
            }
            if bbox_iou(&dets[i].bbox, &dets[j].bbox) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn raw(bbox: [f64; 4], confidence: f64, class_id: usize) -> RawDetection {
        RawDetection {
            bbox,
            confidence,
            class_id,
        }
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → 640: scale 3.2, new 640x320, pad_y 160
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, scale, pad_x, pad_y) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(scale, 3.2, epsilon = 0.01);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, _, pad_x, pad_y) = letterbox(&frame, 640);

        let y = pad_y as usize + 1;
        let x = pad_x as usize + 1;
        assert_relative_eq!(tensor[[0, 0, y, x]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 114.0 / 255.0, epsilon = 0.01);
    }

    #[test]
    fn test_unletterbox_inverts_scale_and_padding() {
        let b = unletterbox([0.0, 160.0, 320.0, 480.0], 3.2, 0, 160, 200, 100);
        assert_relative_eq!(b[0], 0.0);
        assert_relative_eq!(b[1], 0.0);
        assert_relative_eq!(b[2], 100.0);
        assert_relative_eq!(b[3], 100.0);
    }

    #[test]
    fn test_decode_channels_first_picks_best_class() {
        // shape [1, 6, 2]: 4 box feats + 2 classes, 2 anchors
        #[rustfmt::skip]
        let data = [
            50.0, 10.0, // cx
            50.0, 10.0, // cy
            20.0, 4.0,  // w
            10.0, 4.0,  // h
            0.2,  0.05, // class 0
            0.9,  0.10, // class 1
        ];
        let dets = decode_output(&data, &[1, 6, 2], 0.25).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
        assert_relative_eq!(dets[0].confidence, 0.9, epsilon = 1e-6);
        assert_eq!(dets[0].bbox, [40.0, 45.0, 60.0, 55.0]);
    }

    #[test]
    fn test_decode_anchors_first_layout() {
        // shape [1, 8, 5]: 8 anchors, single class
        let mut data = vec![0.0f32; 8 * 5];
        data[..5].copy_from_slice(&[10.0, 10.0, 4.0, 4.0, 0.8]);
        let dets = decode_output(&data, &[1, 8, 5], 0.5).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox, [8.0, 8.0, 12.0, 12.0]);
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        assert!(decode_output(&[0.0; 4], &[4], 0.5).is_err());
    }

    #[test]
    fn test_nms_suppresses_overlapping_same_class() {
        let mut dets = vec![
            raw([0.0, 0.0, 100.0, 100.0], 0.8, 0),
            raw([5.0, 5.0, 105.0, 105.0], 0.9, 0),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_keeps_overlapping_different_classes() {
        let mut dets = vec![
            raw([0.0, 0.0, 100.0, 100.0], 0.9, 0),
            raw([5.0, 5.0, 105.0, 105.0], 0.8, 1),
        ];
        assert_eq!(nms(&mut dets, 0.3).len(), 2);
    }

    #[test]
    fn test_nms_empty_input() {
        let mut dets: Vec<RawDetection> = Vec::new();
        assert!(nms(&mut dets, 0.3).is_empty());
    }
}
