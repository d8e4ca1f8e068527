use std::path::Path;

use crate::shared::error::MonitorError;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// Outcome of a clip run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipStats {
    /// Every `step`-th source frame was kept.
    pub step: usize,
    pub frames_read: usize,
    pub frames_written: usize,
}

/// Keep-every-Nth step that shortens the video to about `target_secs`.
///
/// Returns 1 (copy everything) when the source is already short enough.
pub fn sampling_step(metadata: &VideoMetadata, target_secs: f64) -> Result<usize, MonitorError> {
    if metadata.fps <= 0.0 || metadata.total_frames == 0 {
        return Err(MonitorError::InvalidConfig(format!(
            "cannot sample a video with {} fps and {} frames",
            metadata.fps, metadata.total_frames
        )));
    }
    if !(target_secs.is_finite() && target_secs > 0.0) {
        return Err(MonitorError::InvalidConfig(format!(
            "clip duration must be positive, got {target_secs}"
        )));
    }

    let keep_ratio = target_secs / metadata.duration_secs();
    if keep_ratio >= 1.0 {
        return Ok(1);
    }
    Ok(((1.0 / keep_ratio).floor() as usize).max(1))
}

/// Produces a short test clip by keeping evenly spaced frames.
///
/// The output keeps the source frame rate, so the clip plays back
/// sped up by the sampling step.
pub struct SampleClipUseCase {
    reader: Box<dyn VideoReader>,
    writer: Box<dyn VideoWriter>,
    target_secs: f64,
    on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
}

impl SampleClipUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        target_secs: f64,
        on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    ) -> Self {
        Self {
            reader,
            writer,
            target_secs,
            on_progress,
        }
    }

    pub fn execute(
        &mut self,
        input: &Path,
        output: &Path,
    ) -> Result<ClipStats, Box<dyn std::error::Error>> {
        if !input.exists() {
            return Err(MonitorError::MissingVideo(input.to_path_buf()).into());
        }
        let metadata = self.reader.open(input).map_err(MonitorError::video)?;
        let step = sampling_step(&metadata, self.target_secs)?;
        log::info!(
            "Sampling {:.0}s video down to ~{:.0}s: keeping every {step} frame(s)",
            metadata.duration_secs(),
            self.target_secs
        );

        self.writer.open(output, &metadata).map_err(MonitorError::video)?;
        let result = self.copy_frames(step, metadata.total_frames);
        self.reader.close();
        let closed = self.writer.close().map_err(MonitorError::video);

        let stats = result?;
        closed?;
        log::info!(
            "Clip written to {} ({} of {} frames)",
            output.display(),
            stats.frames_written,
            stats.frames_read
        );
        Ok(stats)
    }

    fn copy_frames(
        &mut self,
        step: usize,
        total: usize,
    ) -> Result<ClipStats, Box<dyn std::error::Error>> {
        let mut stats = ClipStats {
            step,
            frames_read: 0,
            frames_written: 0,
        };
        for frame in self.reader.frames() {
            let frame = frame.map_err(MonitorError::video)?;
            if stats.frames_read % step == 0 {
                self.writer.write(&frame).map_err(MonitorError::video)?;
                stats.frames_written += 1;
            }
            stats.frames_read += 1;

            if let Some(ref callback) = self.on_progress {
                if !callback(stats.frames_read, total) {
                    return Err(MonitorError::Cancelled.into());
                }
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::Frame;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    fn meta(fps: f64, total_frames: usize) -> VideoMetadata {
        VideoMetadata {
            width: 4,
            height: 4,
            fps,
            total_frames,
            codec: String::new(),
            source_path: None,
        }
    }

    #[rstest]
    // 10 min at 30 fps down to 60 s: ratio 0.1, every 10th frame
    #[case(30.0, 18_000, 60.0, 10)]
    // ratio 0.4 -> floor(2.5) = 2
    #[case(10.0, 250, 10.0, 2)]
    // already shorter than the target
    #[case(30.0, 300, 600.0, 1)]
    #[case(30.0, 300, 10.0, 1)]
    fn test_sampling_step(
        #[case] fps: f64,
        #[case] frames: usize,
        #[case] target: f64,
        #[case] expected: usize,
    ) {
        assert_eq!(sampling_step(&meta(fps, frames), target).unwrap(), expected);
    }

    #[rstest]
    #[case::no_fps(0.0, 100, 10.0)]
    #[case::no_frames(30.0, 0, 10.0)]
    #[case::no_target(30.0, 100, 0.0)]
    fn test_sampling_step_rejects_degenerate_input(
        #[case] fps: f64,
        #[case] frames: usize,
        #[case] target: f64,
    ) {
        assert_eq!(sampling_step(&meta(fps, frames), target).unwrap_err().exit_code(), 4);
    }

    struct StubReader {
        count: usize,
        fps: f64,
    }

    impl VideoReader for StubReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(meta(self.fps, self.count))
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new((0..self.count).map(|i| Ok(Frame::new(vec![0u8; 48], 4, 4, 3, i))))
        }

        fn close(&mut self) {}
    }

    struct StubWriter {
        written: Arc<Mutex<Vec<usize>>>,
    }

    impl VideoWriter for StubWriter {
        fn open(
            &mut self,
            _path: &Path,
            _metadata: &VideoMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written.lock().unwrap().push(frame.index());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
    }

    #[test]
    fn test_keeps_every_nth_frame() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"").unwrap();

        let written = Arc::new(Mutex::new(Vec::new()));
        // 25 frames at 10 fps = 2.5 s, target 1 s -> every 2nd frame
        let mut uc = SampleClipUseCase::new(
            Box::new(StubReader { count: 25, fps: 10.0 }),
            Box::new(StubWriter {
                written: written.clone(),
            }),
            1.0,
            None,
        );
        let stats = uc.execute(&input, &dir.path().join("out.mp4")).unwrap();

        assert_eq!(stats.step, 2);
        assert_eq!(stats.frames_read, 25);
        assert_eq!(stats.frames_written, 13);
        assert_eq!(written.lock().unwrap()[..3], [0, 2, 4]);
    }

    #[test]
    fn test_missing_input_is_reported() {
        let mut uc = SampleClipUseCase::new(
            Box::new(StubReader { count: 1, fps: 10.0 }),
            Box::new(StubWriter {
                written: Arc::new(Mutex::new(Vec::new())),
            }),
            1.0,
            None,
        );
        let err = uc
            .execute(Path::new("/nonexistent/in.mp4"), Path::new("/tmp/out.mp4"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MonitorError>(),
            Some(MonitorError::MissingVideo(_))
        ));
    }
}
