use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

type FrameResult = Result<Frame, Box<dyn std::error::Error>>;

/// Decodes the best video stream of a file into RGB24 frames via
/// ffmpeg-next.
///
/// Each call to [`VideoReader::frames`] decodes from the current read
/// position; re-open the file to start another pass.
pub struct FfmpegReader {
    input: Option<ffmpeg_next::format::context::Input>,
    stream_index: usize,
}

// Safety: a reader is moved to its worker thread and only used there.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input: None,
            stream_index: 0,
        }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

fn open_decoder(
    input: &ffmpeg_next::format::context::Input,
    stream_index: usize,
) -> Result<ffmpeg_next::decoder::Video, Box<dyn std::error::Error>> {
    let stream = input
        .stream(stream_index)
        .ok_or_else(|| format!("video stream {stream_index} disappeared"))?;
    let ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
    Ok(ctx.decoder().video()?)
}

/// Container frame count, or an estimate from duration when the
/// container does not record one.
fn frame_count(
    input: &ffmpeg_next::format::context::Input,
    stream: &ffmpeg_next::format::stream::Stream,
    fps: f64,
) -> usize {
    match stream.frames() {
        n if n > 0 => n as usize,
        _ if input.duration() > 0 && fps > 0.0 => {
            let secs = input.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE);
            (secs * fps).round() as usize
        }
        _ => 0,
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        let input = ffmpeg_next::format::input(path)?;

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| format!("{} has no video stream", path.display()))?;
        let stream_index = stream.index();
        let decoder = open_decoder(&input, stream_index)?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            f64::from(rate.numerator()) / f64::from(rate.denominator())
        } else {
            0.0
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames: frame_count(&input, &stream, fps),
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };
        log::debug!(
            "Opened {}: {}x{} @ {:.2} fps, {} frames ({})",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames,
            metadata.codec
        );

        self.stream_index = stream_index;
        self.input = Some(input);
        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_> {
        let Some(input) = self.input.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };

        let setup = open_decoder(input, self.stream_index).and_then(|decoder| {
            let scaler = scaling::Context::get(
                decoder.format(),
                decoder.width(),
                decoder.height(),
                Pixel::RGB24,
                decoder.width(),
                decoder.height(),
                scaling::Flags::BILINEAR,
            )?;
            Ok((decoder, scaler))
        });

        match setup {
            Ok((decoder, scaler)) => Box::new(DecodeIter {
                input,
                stream_index: self.stream_index,
                width: decoder.width(),
                height: decoder.height(),
                decoder,
                scaler,
                next_index: 0,
                state: DecodeState::Reading,
            }),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn close(&mut self) {
        self.input = None;
    }
}

#[derive(PartialEq)]
enum DecodeState {
    Reading,
    Draining,
    Done,
}

/// Pulls packets on demand so only one decoded frame is held at a time.
struct DecodeIter<'a> {
    input: &'a mut ffmpeg_next::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    width: u32,
    height: u32,
    next_index: usize,
    state: DecodeState,
}

impl DecodeIter<'_> {
    fn receive(&mut self) -> Option<FrameResult> {
        let mut decoded = Video::empty();
        self.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb = Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb) {
            return Some(Err(e.into()));
        }
        let frame = Frame::new(
            packed_rgb(&rgb, self.width, self.height),
            self.width,
            self.height,
            3,
            self.next_index,
        );
        self.next_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = FrameResult;

    fn next(&mut self) -> Option<FrameResult> {
        loop {
            if self.state == DecodeState::Done {
                return None;
            }
            if let Some(frame) = self.receive() {
                return Some(frame);
            }
            if self.state == DecodeState::Draining {
                self.state = DecodeState::Done;
                continue;
            }

            match self.input.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() == self.stream_index {
                        if let Err(e) = self.decoder.send_packet(&packet) {
                            log::debug!("Skipping undecodable packet: {e}");
                        }
                    }
                }
                None => {
                    let _ = self.decoder.send_eof();
                    self.state = DecodeState::Draining;
                }
            }
        }
    }
}

/// Strips row padding from an RGB24 frame.
fn packed_rgb(frame: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = frame.stride(0);
    let row_bytes = width as usize * 3;
    let data = frame.data(0);
    (0..height as usize)
        .flat_map(|row| &data[row * stride..row * stride + row_bytes])
        .copied()
        .collect()
}
