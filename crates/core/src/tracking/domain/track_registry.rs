use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    DEFAULT_MEASUREMENT_VARIANCE, DEFAULT_PROCESS_VARIANCE, TRACKER_MAX_LOST,
};

use super::scalar_kalman::ScalarKalmanFilter;

/// Stable identity assigned by the tracker to one physical item.
pub type TrackId = u32;

/// Noise model and retention policy for per-track smoothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub process_variance: f64,
    pub measurement_variance: f64,
    pub initial_estimate: f64,
    /// Frames a track may go without an update before it is evicted.
    /// `None` keeps every track for the whole session.
    pub max_idle_frames: Option<usize>,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            process_variance: DEFAULT_PROCESS_VARIANCE,
            measurement_variance: DEFAULT_MEASUREMENT_VARIANCE,
            initial_estimate: 0.0,
            max_idle_frames: Some(TRACKER_MAX_LOST),
        }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.process_variance.is_finite() && self.process_variance >= 0.0) {
            return Err(format!(
                "process variance must be finite and non-negative, got {}",
                self.process_variance
            ));
        }
        if !(self.measurement_variance.is_finite() && self.measurement_variance >= 0.0) {
            return Err(format!(
                "measurement variance must be finite and non-negative, got {}",
                self.measurement_variance
            ));
        }
        if self.process_variance + self.measurement_variance <= 0.0 {
            return Err("process and measurement variance cannot both be zero".into());
        }
        Ok(())
    }
}

/// Four filters smoothing the x1, y1, x2, y2 edges of one track's box.
#[derive(Clone, Debug)]
pub struct TrackCoordinateSet {
    filters: [ScalarKalmanFilter; 4],
    last_seen: usize,
}

impl TrackCoordinateSet {
    fn new(config: &SmoothingConfig, frame_index: usize) -> Self {
        let filter = ScalarKalmanFilter::new(
            config.process_variance,
            config.measurement_variance,
            config.initial_estimate,
        );
        Self {
            filters: [filter.clone(), filter.clone(), filter.clone(), filter],
            last_seen: frame_index,
        }
    }

    /// Feeds each raw edge into its own filter, in x1, y1, x2, y2 order.
    pub fn smooth(&mut self, bbox: [f64; 4]) -> [f64; 4] {
        let mut out = [0.0; 4];
        for (i, (filter, value)) in self.filters.iter_mut().zip(bbox).enumerate() {
            out[i] = filter.update(value);
        }
        out
    }

    pub fn filters(&self) -> &[ScalarKalmanFilter; 4] {
        &self.filters
    }

    pub fn last_seen(&self) -> usize {
        self.last_seen
    }
}

/// Per-session map from track identity to its coordinate filters.
///
/// Entries are only created through [`TrackRegistry::get_or_insert`];
/// lookups through [`TrackRegistry::get`] never allocate.
pub struct TrackRegistry {
    config: SmoothingConfig,
    tracks: HashMap<TrackId, TrackCoordinateSet>,
}

impl TrackRegistry {
    pub fn new(config: SmoothingConfig) -> Self {
        Self {
            config,
            tracks: HashMap::new(),
        }
    }

    /// Returns the track's filters, creating fresh ones on first sighting.
    /// Marks the track as seen at `frame_index`.
    pub fn get_or_insert(
        &mut self,
        track_id: TrackId,
        frame_index: usize,
    ) -> &mut TrackCoordinateSet {
        let config = &self.config;
        let set = self
            .tracks
            .entry(track_id)
            .or_insert_with(|| TrackCoordinateSet::new(config, frame_index));
        set.last_seen = frame_index;
        set
    }

    pub fn get(&self, track_id: TrackId) -> Option<&TrackCoordinateSet> {
        self.tracks.get(&track_id)
    }

    /// Marks an existing track as seen at `frame_index` without touching its
    /// filters. Unknown ids are ignored.
    pub fn touch(&mut self, track_id: TrackId, frame_index: usize) {
        if let Some(set) = self.tracks.get_mut(&track_id) {
            set.last_seen = frame_index;
        }
    }

    /// Drops tracks idle for longer than `max_idle_frames`. Returns how many
    /// were removed.
    pub fn evict_stale(&mut self, current_frame: usize) -> usize {
        let Some(max_idle) = self.config.max_idle_frames else {
            return 0;
        };
        let before = self.tracks.len();
        self.tracks
            .retain(|_, set| current_frame.saturating_sub(set.last_seen) <= max_idle);
        before - self.tracks.len()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn config(&self) -> &SmoothingConfig {
        &self.config
    }
}

impl Default for TrackRegistry {
    fn default() -> Self {
        Self::new(SmoothingConfig::default())
    }
}
