use crate::shared::frame::Frame;

pub type FrameResult = Result<Frame, Box<dyn std::error::Error>>;

/// Supplies the ROI images of one full pass over the video per episode.
pub trait EpisodeSource {
    /// Starts a fresh pass from the first frame. The pass ends when the
    /// iterator is exhausted.
    fn pass(
        &mut self,
    ) -> Result<Box<dyn Iterator<Item = FrameResult> + '_>, Box<dyn std::error::Error>>;
}

/// Replays frames held in memory.
pub struct CachedEpisodeSource {
    frames: Vec<Frame>,
}

impl CachedEpisodeSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    /// Drains one pass of `source` into memory.
    pub fn fill(source: &mut dyn EpisodeSource) -> Result<Self, Box<dyn std::error::Error>> {
        let frames = source.pass()?.collect::<Result<Vec<_>, _>>()?;
        log::info!("Cached {} ROI frames for replay", frames.len());
        Ok(Self::new(frames))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl EpisodeSource for CachedEpisodeSource {
    fn pass(
        &mut self,
    ) -> Result<Box<dyn Iterator<Item = FrameResult> + '_>, Box<dyn std::error::Error>> {
        Ok(Box::new(self.frames.iter().cloned().map(Ok)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::new(vec![i as u8; 2 * 2 * 3], 2, 2, 3, i))
            .collect()
    }

    #[test]
    fn test_every_pass_restarts_from_first_frame() {
        let mut source = CachedEpisodeSource::new(frames(3));
        for _ in 0..2 {
            let indices: Vec<usize> = source.pass().unwrap().map(|f| f.unwrap().index()).collect();
            assert_eq!(indices, vec![0, 1, 2]);
        }
    }

    #[test]
    fn test_fill_copies_one_pass() {
        let mut inner = CachedEpisodeSource::new(frames(4));
        let cached = CachedEpisodeSource::fill(&mut inner).unwrap();
        assert_eq!(cached.len(), 4);
    }

    #[test]
    fn test_fill_propagates_errors() {
        struct Broken;
        impl EpisodeSource for Broken {
            fn pass(
                &mut self,
            ) -> Result<Box<dyn Iterator<Item = FrameResult> + '_>, Box<dyn std::error::Error>> {
                Ok(Box::new(std::iter::once(Err("decode failed".into()))))
            }
        }
        assert!(CachedEpisodeSource::fill(&mut Broken).is_err());
    }
}
