use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::annotation::domain::annotation_sink::AnnotationSink;
use crate::annotation::domain::drawable_box::DrawableBox;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Saves selected annotated frames as `flagged_frame_{index}.jpg` for review.
pub struct FlaggedFrameSink {
    writer: Box<dyn ImageWriter>,
    dir: PathBuf,
    frames: HashSet<usize>,
    saved: usize,
}

impl FlaggedFrameSink {
    pub fn new(
        writer: Box<dyn ImageWriter>,
        dir: &Path,
        frames: HashSet<usize>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            writer,
            dir: dir.to_path_buf(),
            frames,
            saved: 0,
        })
    }

    pub fn path_for(dir: &Path, index: usize) -> PathBuf {
        dir.join(format!("flagged_frame_{index}.jpg"))
    }
}

impl AnnotationSink for FlaggedFrameSink {
    fn record(
        &mut self,
        frame: &Frame,
        _boxes: &[DrawableBox],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.frames.contains(&frame.index()) {
            let path = Self::path_for(&self.dir, frame.index());
            self.writer.write(&path, frame)?;
            self.saved += 1;
            log::info!("Flagged frame {} saved to {}", frame.index(), path.display());
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let missing = self.frames.len().saturating_sub(self.saved);
        if missing > 0 {
            log::warn!("{missing} flagged frame(s) were past the end of the video");
        }
        Ok(())
    }
}
