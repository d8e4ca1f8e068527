use ndarray::{ArrayView3, ArrayViewMut3};

use crate::shared::roi::Roi;

/// A single video frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the ROI out into a new frame with the same index.
    ///
    /// The ROI is clamped to the frame first; returns `None` when nothing
    /// of it lies inside the frame.
    pub fn crop(&self, roi: &Roi) -> Option<Frame> {
        let r = roi.clamp_to(self.width, self.height)?;
        let fw = self.width as usize;
        let channels = self.channels as usize;
        let rx = r.x1 as usize;
        let ry = r.y1 as usize;
        let rw = r.width() as usize;
        let rh = r.height() as usize;

        let mut out = Vec::with_capacity(rw * rh * channels);
        for row in 0..rh {
            let start = ((ry + row) * fw + rx) * channels;
            out.extend_from_slice(&self.data[start..start + rw * channels]);
        }
        Some(Frame::new(out, rw as u32, rh as u32, self.channels, self.index))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frame whose red channel encodes the column and green the row.
    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        Frame::new(data, width, height, 3, 7)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_clone_is_independent() {
        let frame = Frame::new(vec![100u8; 12], 2, 2, 3, 0);
        let mut cloned = frame.clone();
        cloned.data_mut()[0] = 0;
        assert_eq!(frame.data()[0], 100);
        assert_eq!(cloned.data()[0], 0);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = Frame::new(vec![0u8; 24], 4, 2, 3, 0);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]);
    }

    #[test]
    fn test_as_ndarray_mut_modification() {
        let mut frame = Frame::new(vec![0u8; 12], 2, 2, 3, 0);
        frame.as_ndarray_mut()[[0, 1, 2]] = 128;
        assert_eq!(frame.as_ndarray()[[0, 1, 2]], 128);
    }

    #[test]
    fn test_crop_copies_roi_pixels() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&Roi::new(2, 3, 6, 5)).unwrap();

        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.index(), 7);
        let arr = crop.as_ndarray();
        // top-left of the crop is frame pixel (x=2, y=3)
        assert_eq!(arr[[0, 0, 0]], 2);
        assert_eq!(arr[[0, 0, 1]], 3);
        // bottom-right of the crop is frame pixel (x=5, y=4)
        assert_eq!(arr[[1, 3, 0]], 5);
        assert_eq!(arr[[1, 3, 1]], 4);
    }

    #[test]
    fn test_crop_clamps_to_frame() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&Roi::new(6, 4, 50, 50)).unwrap();
        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 4);
    }

    #[test]
    fn test_crop_outside_frame_is_none() {
        let frame = gradient_frame(10, 8);
        assert!(frame.crop(&Roi::new(20, 20, 30, 30)).is_none());
    }
}
