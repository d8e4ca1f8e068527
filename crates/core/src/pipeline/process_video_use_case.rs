use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::detection::domain::tracked_detector::TrackedDetector;
use crate::shared::error::MonitorError;
use crate::shared::roi::Roi;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::annotation_stage::AnnotationStage;
use super::pipeline_executor::{PipelineConfig, PipelineExecutor, PipelineStats};

/// Orchestrates the monitoring pipeline for one video.
///
/// Wires domain components together and delegates execution to a
/// `PipelineExecutor`. This is a single-use struct: `execute` consumes
/// the owned components, so calling it twice will fail.
pub struct ProcessVideoUseCase {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoWriter>>,
    detector: Option<Box<dyn TrackedDetector>>,
    stage: Option<AnnotationStage>,
    executor: Box<dyn PipelineExecutor>,
    on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    cancelled: Arc<AtomicBool>,
}

impl ProcessVideoUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        detector: Box<dyn TrackedDetector>,
        stage: AnnotationStage,
        executor: Box<dyn PipelineExecutor>,
        on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            detector: Some(detector),
            stage: Some(stage),
            executor,
            on_progress,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    /// Processes the already-opened reader's frames into `output_path`.
    pub fn execute(
        &mut self,
        metadata: &VideoMetadata,
        output_path: &Path,
    ) -> Result<PipelineStats, Box<dyn std::error::Error>> {
        let stage = self.stage.take().ok_or("Pipeline already executed")?;
        let roi = clamp_roi(&stage.roi(), metadata)?;
        if roi != stage.roi() {
            log::warn!(
                "ROI {} clamped to {roi} for {}x{} video",
                stage.roi(),
                metadata.width,
                metadata.height
            );
        }

        let config = PipelineConfig {
            roi,
            on_progress: self.on_progress.take(),
            cancelled: self.cancelled.clone(),
        };

        let stats = self.executor.execute(
            self.reader.take().ok_or("Pipeline already executed")?,
            self.writer.take().ok_or("Pipeline already executed")?,
            self.detector.take().ok_or("Pipeline already executed")?,
            stage,
            metadata,
            output_path,
            config,
        )?;
        log::info!(
            "Annotated {} frames with {} boxes into {}",
            stats.frames,
            stats.boxes,
            output_path.display()
        );
        Ok(stats)
    }
}

/// Intersects the ROI with the frame; an ROI entirely outside is a
/// configuration error.
pub fn clamp_roi(roi: &Roi, metadata: &VideoMetadata) -> Result<Roi, MonitorError> {
    roi.clamp_to(metadata.width, metadata.height).ok_or_else(|| {
        MonitorError::InvalidConfig(format!(
            "ROI {roi} lies outside the {}x{} frame",
            metadata.width, metadata.height
        ))
    })
}
