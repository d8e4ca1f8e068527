use std::path::Path;
use std::sync::atomic::Ordering;

use crate::detection::domain::tracked_detector::TrackedDetector;
use crate::pipeline::annotation_stage::{detect_in_roi, AnnotationStage};
use crate::pipeline::pipeline_executor::{PipelineConfig, PipelineExecutor, PipelineStats};
use crate::shared::error::MonitorError;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// Runs every stage on the calling thread, one frame at a time.
#[derive(Default)]
pub struct SequentialPipelineExecutor;

impl SequentialPipelineExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineExecutor for SequentialPipelineExecutor {
    fn execute(
        &self,
        mut reader: Box<dyn VideoReader>,
        mut writer: Box<dyn VideoWriter>,
        mut detector: Box<dyn TrackedDetector>,
        mut stage: AnnotationStage,
        metadata: &VideoMetadata,
        output_path: &Path,
        config: PipelineConfig,
    ) -> Result<PipelineStats, Box<dyn std::error::Error>> {
        writer.open(output_path, metadata).map_err(MonitorError::video)?;

        let result = run_frames(
            &mut *reader,
            &mut *writer,
            &mut *detector,
            &mut stage,
            metadata,
            &config,
        );

        reader.close();
        let closed = writer.close().map_err(MonitorError::video);
        let stats = result?;
        closed?;
        Ok(stats)
    }
}

fn run_frames(
    reader: &mut dyn VideoReader,
    writer: &mut dyn VideoWriter,
    detector: &mut dyn TrackedDetector,
    stage: &mut AnnotationStage,
    metadata: &VideoMetadata,
    config: &PipelineConfig,
) -> Result<PipelineStats, Box<dyn std::error::Error>> {
    let mut stats = PipelineStats::default();

    for frame in reader.frames() {
        if config.cancelled.load(Ordering::Relaxed) {
            return Err(MonitorError::Cancelled.into());
        }
        let mut frame = frame.map_err(MonitorError::video)?;
        let detections = detect_in_roi(detector, &frame, &config.roi)?;
        stats.boxes += stage.process(&mut frame, &detections)?;
        writer.write(&frame).map_err(MonitorError::video)?;
        stats.frames += 1;

        if let Some(ref callback) = config.on_progress {
            if !callback(stats.frames, metadata.total_frames) {
                return Err(MonitorError::Cancelled.into());
            }
        }
    }

    stage.finish()?;
    Ok(stats)
}
