use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::Rational;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Frame rate used when the source does not report one.
const FALLBACK_FPS: i32 = 30;

/// Encodes annotated RGB frames to an MPEG-4 video via ffmpeg-next.
///
/// Timestamps count written frames, so a sampled clip plays back
/// continuously at the source frame rate.
pub struct FfmpegWriter {
    session: Option<EncodeSession>,
}

struct EncodeSession {
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: scaling::Context,
    width: u32,
    height: u32,
    time_base: Rational,
    written: i64,
}

// Safety: a writer is moved to its worker thread and only used there.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self { session: None }
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn output_fps(fps: f64) -> i32 {
    match fps.round() as i32 {
        n if n > 0 => n,
        _ => FALLBACK_FPS,
    }
}

impl EncodeSession {
    fn start(path: &Path, metadata: &VideoMetadata) -> Result<Self, Box<dyn std::error::Error>> {
        let mut octx = ffmpeg_next::format::output(path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG-4 encoder not available in this ffmpeg build")?;
        let mut stream = octx.add_stream(Some(codec))?;

        let fps = output_fps(metadata.fps);
        let time_base = Rational(1, fps);
        let mut ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        ctx.set_width(metadata.width);
        ctx.set_height(metadata.height);
        ctx.set_format(Pixel::YUV420P);
        ctx.set_time_base(time_base);
        ctx.set_frame_rate(Some(Rational(fps, 1)));
        if global_header {
            ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = ctx.open_with(ffmpeg_next::Dictionary::new())?;
        stream.set_parameters(&encoder);
        octx.write_header()?;

        let scaler = scaling::Context::get(
            Pixel::RGB24,
            metadata.width,
            metadata.height,
            Pixel::YUV420P,
            metadata.width,
            metadata.height,
            scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            octx,
            encoder,
            scaler,
            width: metadata.width,
            height: metadata.height,
            time_base,
            written: 0,
        })
    }

    fn encode(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if frame.width() != self.width || frame.height() != self.height || frame.channels() != 3 {
            return Err(format!(
                "frame {} is {}x{}x{}, writer expects {}x{}x3",
                frame.index(),
                frame.width(),
                frame.height(),
                frame.channels(),
                self.width,
                self.height
            )
            .into());
        }

        let mut rgb = Video::new(Pixel::RGB24, self.width, self.height);
        let stride = rgb.stride(0);
        let row_bytes = self.width as usize * 3;
        let dst = rgb.data_mut(0);
        for (row, src) in frame.data().chunks_exact(row_bytes).enumerate() {
            dst[row * stride..row * stride + row_bytes].copy_from_slice(src);
        }

        let mut yuv = Video::empty();
        self.scaler.run(&rgb, &mut yuv)?;
        yuv.set_pts(Some(self.written));
        self.encoder.send_frame(&yuv)?;
        self.drain()?;
        self.written += 1;
        Ok(())
    }

    fn drain(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let stream_tb = self
            .octx
            .stream(0)
            .ok_or("output has no video stream")?
            .time_base();
        let mut packet = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(self.time_base, stream_tb);
            packet.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.encoder.send_eof()?;
        self.drain()?;
        self.octx.write_trailer()?;
        Ok(())
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        self.session = Some(EncodeSession::start(path, metadata)?);
        log::debug!(
            "Encoding {}x{} @ {} fps to {}",
            metadata.width,
            metadata.height,
            output_fps(metadata.fps),
            path.display()
        );
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        self.session
            .as_mut()
            .ok_or("FfmpegWriter: not opened")?
            .encode(frame)
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        match self.session.take() {
            Some(session) => session.finish(),
            None => Ok(()),
        }
    }
}
