use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::detection::domain::tracked_detector::TrackedDetector;
use crate::shared::roi::Roi;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::annotation_stage::AnnotationStage;

/// Configuration for a pipeline execution run.
pub struct PipelineConfig {
    /// Detection region, already clamped to the frame.
    pub roi: Roi,
    pub on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    pub cancelled: Arc<AtomicBool>,
}

/// Counts reported after a completed run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames: usize,
    pub boxes: usize,
}

/// Abstracts how the read → track → annotate → write pipeline is executed.
///
/// This is a port (application-layer interface). Infrastructure provides
/// concrete implementations (threaded, sequential). Every implementation
/// feeds frames to the annotation stage in decode order.
pub trait PipelineExecutor: Send {
    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        detector: Box<dyn TrackedDetector>,
        stage: AnnotationStage,
        metadata: &VideoMetadata,
        output_path: &Path,
        config: PipelineConfig,
    ) -> Result<PipelineStats, Box<dyn std::error::Error>>;
}
