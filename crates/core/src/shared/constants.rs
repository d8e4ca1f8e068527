pub const DEFAULT_MODEL_PATH: &str = "models/best.onnx";

/// Dispatch-counter ROI in the reference camera layout (x1, y1, x2, y2).
pub const DEFAULT_ROI: (i32, i32, i32, i32) = (950, 50, 1500, 330);

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.30;

pub const DEFAULT_PROCESS_VARIANCE: f64 = 1e-4;
pub const DEFAULT_MEASUREMENT_VARIANCE: f64 = 0.1;

/// Max frames a track can be lost before removal (~1 second at 30 fps).
pub const TRACKER_MAX_LOST: usize = 30;

pub const DEFAULT_CANDIDATE_THRESHOLDS: &[f64] =
    &[0.15, 0.20, 0.25, 0.30, 0.35, 0.40, 0.45, 0.50, 0.55, 0.60];

pub const DEFAULT_EPISODES: usize = 50;
pub const DEFAULT_ALPHA: f64 = 0.1;
pub const DEFAULT_GAMMA: f64 = 0.6;
pub const DEFAULT_EPSILON: f64 = 0.1;

/// Ten minutes.
pub const DEFAULT_CLIP_SECONDS: f64 = 600.0;

pub const FEEDBACK_DIR: &str = "feedback_inbox";
