//! In-memory video composed from a segment's intensity images.

use image::GrayImage;

use crate::error::{CellTrackError, Result};
use crate::tracker::FrameSource;

/// Frames of one segment, read in order like a decoded video.
///
/// Every frame must share the size of the first one; a mismatching frame is
/// reported as a decode failure.
#[derive(Debug)]
pub struct ArtifactVideo {
    frames: std::vec::IntoIter<GrayImage>,
    size: Option<(u32, u32)>,
    position: usize,
}

impl ArtifactVideo {
    pub fn new(frames: Vec<GrayImage>) -> Self {
        Self {
            frames: frames.into_iter(),
            size: None,
            position: 0,
        }
    }

    /// Frames not yet read.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FromIterator<GrayImage> for ArtifactVideo {
    fn from_iter<I: IntoIterator<Item = GrayImage>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl FrameSource for ArtifactVideo {
    fn read(&mut self) -> Result<Option<GrayImage>> {
        let Some(frame) = self.frames.next() else {
            return Ok(None);
        };
        let index = self.position;
        self.position += 1;

        let size = *self.size.get_or_insert(frame.dimensions());
        if frame.dimensions() != size {
            return Err(CellTrackError::FrameDecode {
                index,
                reason: format!(
                    "frame is {}x{}, video is {}x{}",
                    frame.width(),
                    frame.height(),
                    size.0,
                    size.1
                ),
            });
        }
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_in_order_then_ends() {
        let mut video: ArtifactVideo = (1..=3u8)
            .map(|v| GrayImage::from_pixel(4, 4, image::Luma([v])))
            .collect();
        assert_eq!(video.remaining(), 3);
        for expected in 1..=3u8 {
            let frame = video.read().unwrap().unwrap();
            assert_eq!(frame.get_pixel(0, 0).0[0], expected);
        }
        assert!(video.read().unwrap().is_none());
    }

    #[test]
    fn test_size_mismatch_is_decode_error() {
        let mut video = ArtifactVideo::new(vec![GrayImage::new(4, 4), GrayImage::new(4, 5)]);
        assert!(video.read().unwrap().is_some());
        let err = video.read().unwrap_err();
        assert!(matches!(err, CellTrackError::FrameDecode { index: 1, .. }));
    }
}
