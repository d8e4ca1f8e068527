use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::tracked_detector::TrackedDetector;
use crate::pipeline::annotation_stage::{detect_in_roi, AnnotationStage};
use crate::pipeline::pipeline_executor::{PipelineConfig, PipelineExecutor, PipelineStats};
use crate::shared::error::MonitorError;
use crate::shared::frame::Frame;
use crate::shared::roi::Roi;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type Tracked = (Frame, Vec<Detection>);

/// Executes the pipeline with dedicated threads for I/O and tracking.
///
/// Layout: `reader → track → main [annotate/render] → writer`
///
/// Each stage is a single thread, so frames reach the annotation stage in
/// decode order and per-track filters see their frames in sequence.
pub struct ThreadedPipelineExecutor {
    channel_capacity: usize,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        mut writer: Box<dyn VideoWriter>,
        detector: Box<dyn TrackedDetector>,
        mut stage: AnnotationStage,
        metadata: &VideoMetadata,
        output_path: &Path,
        config: PipelineConfig,
    ) -> Result<PipelineStats, Box<dyn std::error::Error>> {
        let cap = self.channel_capacity;

        writer.open(output_path, metadata).map_err(MonitorError::video)?;

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<Frame, MonitorError>>(cap);
        let (tracked_tx, tracked_rx) =
            crossbeam_channel::bounded::<Result<Tracked, MonitorError>>(cap);
        let (write_tx, write_rx) = crossbeam_channel::bounded::<Frame>(cap);

        let reader_handle = spawn_reader(reader, frame_tx, config.cancelled.clone());
        let track_handle = spawn_tracker(
            detector,
            config.roi,
            frame_rx,
            tracked_tx,
            config.cancelled.clone(),
        );
        let writer_handle = spawn_writer(writer, write_rx);

        let mut stats = PipelineStats::default();
        let main_error = run_main_loop(
            tracked_rx,
            &write_tx,
            &mut stage,
            metadata.total_frames,
            &config,
            &mut stats,
        );

        drop(write_tx);

        join_threads(reader_handle, track_handle, writer_handle, main_error)?;
        Ok(stats)
    }
}

fn spawn_reader(
    mut reader: Box<dyn VideoReader>,
    frame_tx: crossbeam_channel::Sender<Result<Frame, MonitorError>>,
    cancelled: Arc<AtomicBool>,
) -> std::thread::JoinHandle<Box<dyn VideoReader>> {
    std::thread::spawn(move || {
        for frame_result in reader.frames() {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let mapped = frame_result.map_err(MonitorError::video);
            if frame_tx.send(mapped).is_err() {
                break;
            }
        }
        reader.close();
        reader
    })
}

fn spawn_tracker(
    mut detector: Box<dyn TrackedDetector>,
    roi: Roi,
    frame_rx: crossbeam_channel::Receiver<Result<Frame, MonitorError>>,
    tracked_tx: crossbeam_channel::Sender<Result<Tracked, MonitorError>>,
    cancelled: Arc<AtomicBool>,
) -> std::thread::JoinHandle<Box<dyn TrackedDetector>> {
    std::thread::spawn(move || {
        for frame_result in frame_rx {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }

            let result = frame_result.and_then(|frame| {
                detect_in_roi(&mut *detector, &frame, &roi)
                    .map(|dets| (frame, dets))
                    .map_err(|e| MonitorError::from_boxed(e, MonitorError::Detector))
            });

            if tracked_tx.send(result).is_err() {
                break;
            }
        }
        detector
    })
}

fn spawn_writer(
    mut writer: Box<dyn VideoWriter>,
    write_rx: crossbeam_channel::Receiver<Frame>,
) -> std::thread::JoinHandle<Result<Box<dyn VideoWriter>, MonitorError>> {
    std::thread::spawn(move || {
        for frame in write_rx {
            writer.write(&frame).map_err(MonitorError::video)?;
        }
        Ok(writer)
    })
}

/// Receives tracked frames, annotates them in order and forwards them to
/// the writer.
fn run_main_loop(
    tracked_rx: crossbeam_channel::Receiver<Result<Tracked, MonitorError>>,
    write_tx: &crossbeam_channel::Sender<Frame>,
    stage: &mut AnnotationStage,
    total_frames: usize,
    config: &PipelineConfig,
    stats: &mut PipelineStats,
) -> Option<Box<dyn std::error::Error>> {
    for tracked in tracked_rx {
        if config.cancelled.load(Ordering::Relaxed) {
            return Some(MonitorError::Cancelled.into());
        }

        let (mut frame, detections) = match tracked {
            Ok(pair) => pair,
            Err(e) => return Some(e.into()),
        };

        match stage.process(&mut frame, &detections) {
            Ok(drawn) => stats.boxes += drawn,
            Err(e) => return Some(e),
        }

        if write_tx.send(frame).is_err() {
            return Some(MonitorError::video("writer channel closed unexpectedly").into());
        }
        stats.frames += 1;

        if let Some(ref callback) = config.on_progress {
            if !callback(stats.frames, total_frames) {
                config.cancelled.store(true, Ordering::Relaxed);
                return Some(MonitorError::Cancelled.into());
            }
        }
    }

    if config.cancelled.load(Ordering::Relaxed) {
        return Some(MonitorError::Cancelled.into());
    }
    stage.finish().err()
}

/// Joins all pipeline threads and coalesces the first error encountered.
fn join_threads(
    reader_handle: std::thread::JoinHandle<Box<dyn VideoReader>>,
    track_handle: std::thread::JoinHandle<Box<dyn TrackedDetector>>,
    writer_handle: std::thread::JoinHandle<Result<Box<dyn VideoWriter>, MonitorError>>,
    mut first_error: Option<Box<dyn std::error::Error>>,
) -> Result<(), Box<dyn std::error::Error>> {
    fn set_if_none(slot: &mut Option<Box<dyn std::error::Error>>, err: Box<dyn std::error::Error>) {
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    match reader_handle.join() {
        Ok(mut r) => r.close(),
        Err(_) => set_if_none(&mut first_error, "Reader thread panicked".into()),
    }

    if track_handle.join().is_err() {
        set_if_none(&mut first_error, "Tracking thread panicked".into());
    }

    match writer_handle.join() {
        Ok(Ok(mut w)) => {
            if let Err(e) = w.close() {
                set_if_none(&mut first_error, MonitorError::video(e).into());
            }
        }
        Ok(Err(e)) => set_if_none(&mut first_error, e.into()),
        Err(_) => set_if_none(&mut first_error, "Writer thread panicked".into()),
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
