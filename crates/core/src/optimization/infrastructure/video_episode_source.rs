use std::path::{Path, PathBuf};

use crate::optimization::domain::episode_source::{EpisodeSource, FrameResult};
use crate::shared::error::MonitorError;
use crate::shared::roi::Roi;
use crate::video::domain::video_reader::VideoReader;

/// Re-opens and decodes the video for every pass, yielding ROI crops.
pub struct VideoEpisodeSource {
    reader: Box<dyn VideoReader>,
    path: PathBuf,
    roi: Roi,
    passes: usize,
}

impl VideoEpisodeSource {
    pub fn new(reader: Box<dyn VideoReader>, path: &Path, roi: Roi) -> Self {
        Self {
            reader,
            path: path.to_path_buf(),
            roi,
            passes: 0,
        }
    }

    /// Number of times the video has been opened.
    pub fn passes(&self) -> usize {
        self.passes
    }
}

impl EpisodeSource for VideoEpisodeSource {
    fn pass(
        &mut self,
    ) -> Result<Box<dyn Iterator<Item = FrameResult> + '_>, Box<dyn std::error::Error>> {
        self.reader.close();
        let metadata = self.reader.open(&self.path).map_err(MonitorError::video)?;
        if self.roi.clamp_to(metadata.width, metadata.height).is_none() {
            return Err(MonitorError::InvalidConfig(format!(
                "ROI {} lies outside the {}x{} frame",
                self.roi, metadata.width, metadata.height
            ))
            .into());
        }
        self.passes += 1;
        log::debug!("Opened {} for pass {}", self.path.display(), self.passes);

        let roi = self.roi;
        Ok(Box::new(self.reader.frames().map(move |frame| -> FrameResult {
            let frame = frame.map_err(|e| MonitorError::from_boxed(e, MonitorError::Video))?;
            frame.crop(&roi).ok_or_else(|| {
                MonitorError::Video(format!("frame {} does not overlap ROI {roi}", frame.index()))
                    .into()
            })
        })))
    }
}
