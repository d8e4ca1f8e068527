use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::annotation::domain::annotation_sink::AnnotationSink;
use crate::annotation::domain::drawable_box::DrawableBox;
use crate::shared::frame::Frame;

#[derive(Serialize)]
struct FrameRecord<'a> {
    frame: usize,
    boxes: &'a [DrawableBox],
}

/// Writes one JSON object per frame: `{"frame": n, "boxes": [...]}`.
pub struct JsonLinesLog<W: Write + Send> {
    out: W,
}

impl JsonLinesLog<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Send> JsonLinesLog<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> AnnotationSink for JsonLinesLog<W> {
    fn record(
        &mut self,
        frame: &Frame,
        boxes: &[DrawableBox],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let record = FrameRecord {
            frame: frame.index(),
            boxes,
        };
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.out.flush()?;
        Ok(())
    }
}
