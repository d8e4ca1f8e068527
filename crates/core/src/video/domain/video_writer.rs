use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Video encoding behind a codec-agnostic interface.
pub trait VideoWriter: Send {
    /// Starts a new output sized and timed after `metadata`.
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes and finalizes the output. Closing twice is a no-op.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
