/// Simplified ByteTrack multi-object tracker.
///
/// Two-stage association strategy: high-confidence detections are matched
/// first, then low-confidence detections fill remaining unmatched tracks.
/// Only high-confidence detections may open a new track, so a dish that
/// flickers below the high threshold keeps its identity instead of
/// fragmenting into a new one.
use std::collections::HashSet;

use crate::detection::domain::detection::{Detection, RawDetection};
use crate::tracking::domain::track_registry::TrackId;

use super::math::bbox_iou;

pub const DEFAULT_HIGH_THRESH: f64 = 0.5;
pub const DEFAULT_MATCH_THRESH: f64 = 0.3;

#[derive(Clone, Debug)]
struct TrackState {
    id: TrackId,
    bbox: [f64; 4],
    class_id: usize,
    frames_lost: usize,
    matched: bool,
    confidence: f64,
}

pub struct ByteTracker {
    tracks: Vec<TrackState>,
    next_id: TrackId,
    max_lost: usize,
    high_thresh: f64,
    match_thresh: f64,
}

impl ByteTracker {
    pub fn new(max_lost: usize) -> Self {
        Self::with_thresholds(max_lost, DEFAULT_HIGH_THRESH, DEFAULT_MATCH_THRESH)
    }

    pub fn with_thresholds(max_lost: usize, high_thresh: f64, match_thresh: f64) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            max_lost,
            high_thresh,
            match_thresh,
        }
    }

    /// Associates this frame's detections with existing tracks and returns
    /// the tracks matched in this frame, each tagged with its identity.
    pub fn update(&mut self, detections: &[RawDetection]) -> Vec<Detection> {
        let (high, low) = self.split_by_confidence(detections);

        self.reset_match_flags();
        let num_existing = self.tracks.len();
        let matched_high = self.match_detections(&high, detections, false);
        self.match_detections(&low, detections, true);
        self.create_new_tracks(&high, &matched_high, detections);
        self.age_unmatched_tracks(num_existing);

        self.active_tracks()
    }

    /// Drops all tracks, e.g. when switching to another stream.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 1;
    }

    fn split_by_confidence<'a>(
        &self,
        detections: &'a [RawDetection],
    ) -> (IndexedDets<'a>, IndexedDets<'a>) {
        let mut high = Vec::new();
        let mut low = Vec::new();
        for (i, det) in detections.iter().enumerate() {
            if det.confidence >= self.high_thresh {
                high.push((i, det));
            } else {
                low.push((i, det));
            }
        }
        (high, low)
    }

    fn reset_match_flags(&mut self) {
        for track in &mut self.tracks {
            track.matched = false;
        }
    }

    fn match_detections(
        &mut self,
        dets: &[(usize, &RawDetection)],
        detections: &[RawDetection],
        unmatched_only: bool,
    ) -> HashSet<usize> {
        let track_refs: Vec<(usize, [f64; 4])> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| !unmatched_only || !t.matched)
            .map(|(i, t)| (i, t.bbox))
            .collect();

        let mut matched_det_indices = HashSet::new();
        for (ti, di) in greedy_match(&track_refs, dets, self.match_thresh) {
            self.apply_match(ti, &detections[di]);
            matched_det_indices.insert(di);
        }
        matched_det_indices
    }

    fn apply_match(&mut self, track_idx: usize, det: &RawDetection) {
        let track = &mut self.tracks[track_idx];
        track.bbox = det.bbox;
        track.class_id = det.class_id;
        track.confidence = det.confidence;
        track.frames_lost = 0;
        track.matched = true;
    }

    fn create_new_tracks(
        &mut self,
        high: &[(usize, &RawDetection)],
        matched: &HashSet<usize>,
        detections: &[RawDetection],
    ) {
        for (di, _) in high {
            if !matched.contains(di) {
                let det = &detections[*di];
                self.tracks.push(TrackState {
                    id: self.next_id,
                    bbox: det.bbox,
                    class_id: det.class_id,
                    frames_lost: 0,
                    matched: true,
                    confidence: det.confidence,
                });
                self.next_id += 1;
            }
        }
    }

    fn age_unmatched_tracks(&mut self, num_existing: usize) {
        for track in self.tracks.iter_mut().take(num_existing) {
            if !track.matched {
                track.frames_lost += 1;
            }
        }
        let max_lost = self.max_lost;
        self.tracks.retain(|t| t.frames_lost <= max_lost);
    }

    /// Lost tracks are kept internally for re-identification but produce
    /// no output for this frame.
    fn active_tracks(&self) -> Vec<Detection> {
        self.tracks
            .iter()
            .filter(|t| t.matched)
            .map(|t| Detection {
                bbox: t.bbox,
                track_id: t.id,
                confidence: t.confidence,
                class_id: t.class_id,
            })
            .collect()
    }
}

type IndexedDets<'a> = Vec<(usize, &'a RawDetection)>;

/// Greedy IoU matching: pairs sorted by descending IoU, each track/detection
/// used at most once.
fn greedy_match(
    tracks: &[(usize, [f64; 4])],
    dets: &[(usize, &RawDetection)],
    thresh: f64,
) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for (ti, bbox) in tracks {
        for (di, det) in dets {
            let score = bbox_iou(bbox, &det.bbox);
            if score >= thresh {
                pairs.push((*ti, *di, score));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut used_tracks = HashSet::new();
    let mut used_dets = HashSet::new();
    let mut matches = Vec::new();

    for (ti, di, _) in &pairs {
        if !used_tracks.contains(ti) && !used_dets.contains(di) {
            used_tracks.insert(*ti);
            used_dets.insert(*di);
            matches.push((*ti, *di));
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> RawDetection {
        RawDetection {
            bbox: [x1, y1, x2, y2],
            confidence,
            class_id: 0,
        }
    }

    #[test]
    fn test_new_detections_get_unique_ids() {
        let mut tracker = ByteTracker::new(5);
        let tracks = tracker.update(&[
            det(0.0, 0.0, 50.0, 50.0, 0.9),
            det(100.0, 100.0, 150.0, 150.0, 0.8),
        ]);
        assert_eq!(tracks.len(), 2);
        assert_ne!(tracks[0].track_id, tracks[1].track_id);
    }

    #[test]
    fn test_consistent_id_across_frames() {
        let mut tracker = ByteTracker::new(5);
        let id = tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)])[0].track_id;

        let t2 = tracker.update(&[det(12.0, 12.0, 62.0, 62.0, 0.9)]);
        assert_eq!(t2.len(), 1);
        assert_eq!(t2[0].track_id, id);
    }

    #[test]
    fn test_output_carries_current_box_confidence_and_class() {
        let mut tracker = ByteTracker::new(5);
        tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)]);

        let moved = RawDetection {
            bbox: [12.0, 12.0, 62.0, 62.0],
            confidence: 0.77,
            class_id: 3,
        };
        let t2 = tracker.update(&[moved.clone()]);
        assert_eq!(t2[0].bbox, moved.bbox);
        assert_eq!(t2[0].confidence, 0.77);
        assert_eq!(t2[0].class_id, 3);
    }

    #[test]
    fn test_lost_track_removal() {
        let mut tracker = ByteTracker::new(2);
        tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)]);

        tracker.update(&[]);
        tracker.update(&[]);
        tracker.update(&[]);
        let t = tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)]);
        assert_eq!(t[0].track_id, 2, "expired track must not be reused");
    }

    #[test]
    fn test_track_survives_within_max_lost() {
        let mut tracker = ByteTracker::new(3);
        let id = tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)])[0].track_id;

        tracker.update(&[]);
        tracker.update(&[]);

        let t2 = tracker.update(&[det(12.0, 12.0, 62.0, 62.0, 0.9)]);
        assert_eq!(t2.len(), 1);
        assert_eq!(t2[0].track_id, id);
    }

    #[test]
    fn test_empty_frame() {
        let mut tracker = ByteTracker::new(5);
        assert!(tracker.update(&[]).is_empty());
    }

    #[test]
    fn test_low_confidence_matches_existing_track() {
        let mut tracker = ByteTracker::new(5);
        let id = tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)])[0].track_id;

        let t2 = tracker.update(&[det(12.0, 12.0, 62.0, 62.0, 0.3)]);
        assert_eq!(t2.len(), 1);
        assert_eq!(t2[0].track_id, id);
    }

    #[test]
    fn test_low_confidence_does_not_start_new_track() {
        let mut tracker = ByteTracker::new(5);
        assert!(tracker
            .update(&[det(10.0, 10.0, 60.0, 60.0, 0.3)])
            .is_empty());
    }

    #[test]
    fn test_reset_restarts_ids() {
        let mut tracker = ByteTracker::new(5);
        tracker.update(&[det(0.0, 0.0, 50.0, 50.0, 0.9)]);
        tracker.reset();
        let t = tracker.update(&[det(200.0, 200.0, 250.0, 250.0, 0.9)]);
        assert_eq!(t[0].track_id, 1);
    }

    #[test]
    fn test_multiple_tracks_independent() {
        let mut tracker = ByteTracker::new(5);
        let t1 = tracker.update(&[
            det(0.0, 0.0, 50.0, 50.0, 0.9),
            det(200.0, 200.0, 250.0, 250.0, 0.9),
        ]);
        let id_a = t1[0].track_id;
        let id_b = t1[1].track_id;

        let t2 = tracker.update(&[
            det(2.0, 2.0, 52.0, 52.0, 0.9),
            det(202.0, 202.0, 252.0, 252.0, 0.9),
        ]);
        let ids: Vec<TrackId> = t2.iter().map(|t| t.track_id).collect();
        assert!(ids.contains(&id_a));
        assert!(ids.contains(&id_b));
    }
}
