//! Diagnostic rendering of live tracker boxes.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Rgb};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect as DrawRect;

use crate::error::{CellTrackError, Result};
use crate::tracker::{FrameObserver, TrackedBox};

/// Writes `frame_<k>.png` with every live tracker box drawn in its color.
#[derive(Debug, Clone)]
pub struct Annotator {
    dir: PathBuf,
    written: usize,
}

impl Annotator {
    /// Create `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|err| CellTrackError::io(&dir, err))?;
        Ok(Self { dir, written: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Frames written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl FrameObserver for Annotator {
    fn observe(&mut self, index: usize, frame: &GrayImage, boxes: &[TrackedBox]) -> Result<()> {
        let mut canvas = DynamicImage::ImageLuma8(frame.clone()).into_rgb8();
        for tracked in boxes {
            let ((x1, y1), (x2, y2)) = tracked.bbox.pixel_corners();
            let width = (x2 - x1).max(1) as u32;
            let height = (y2 - y1).max(1) as u32;
            draw_hollow_rect_mut(
                &mut canvas,
                DrawRect::at(x1, y1).of_size(width, height),
                Rgb(tracked.color),
            );
        }

        let path = self.dir.join(format!("frame_{index}.png"));
        canvas.save(&path)?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn test_writes_frame_with_box() {
        let dir = tempfile::tempdir().unwrap();
        let mut annotator = Annotator::new(dir.path().join("segment_0")).unwrap();
        let boxes = [TrackedBox {
            tracker: 0,
            bbox: Rect::new(2.0, 2.0, 5.0, 5.0),
            color: [255, 0, 0],
        }];

        annotator
            .observe(3, &GrayImage::new(12, 12), &boxes)
            .unwrap();

        let written = image::open(dir.path().join("segment_0/frame_3.png"))
            .unwrap()
            .into_rgb8();
        assert_eq!(written.get_pixel(2, 2), &Rgb([255, 0, 0]));
        assert_eq!(written.get_pixel(4, 4), &Rgb([0, 0, 0]));
        assert_eq!(annotator.written(), 1);
    }
}
