//! Mean-shift primitive: moves the box to the intensity centroid under it.

use image::GrayImage;

use super::primitive::TrackingPrimitive;
use crate::geometry::Rect;

/// Shift below which the window is considered converged.
const CONVERGENCE_PX: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct MeanShiftTracker {
    bbox: Rect,
    max_iterations: u32,
}

impl MeanShiftTracker {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            bbox: Rect::default(),
            max_iterations: max_iterations.max(1),
        }
    }
}

impl TrackingPrimitive for MeanShiftTracker {
    fn init(&mut self, frame: &GrayImage, bbox: Rect) -> bool {
        self.bbox = bbox;
        weighted_centroid(frame, &bbox).is_some()
    }

    fn update(&mut self, frame: &GrayImage) -> Option<Rect> {
        let mut window = self.bbox;
        for _ in 0..self.max_iterations {
            let (cx, cy) = weighted_centroid(frame, &window)?;
            let (wx, wy) = window.center();
            let (sx, sy) = (cx - wx, cy - wy);
            window = window.moved_to(window.x + sx, window.y + sy);
            if sx.hypot(sy) < CONVERGENCE_PX {
                break;
            }
        }
        weighted_centroid(frame, &window)?;
        self.bbox = window;
        Some(window)
    }
}

/// Intensity-weighted centroid over the pixels spanned by `window`.
///
/// `None` when the window leaves the frame or carries no intensity.
fn weighted_centroid(frame: &GrayImage, window: &Rect) -> Option<(f32, f32)> {
    let [x1, y1, x2, y2] = window.to_tlbr();
    let (x0, y0, x1, y1) = (
        x1.round() as i64,
        y1.round() as i64,
        x2.round() as i64,
        y2.round() as i64,
    );
    if x0 < 0 || y0 < 0 || x1 >= i64::from(frame.width()) || y1 >= i64::from(frame.height()) {
        return None;
    }

    let (mut mass, mut mx, mut my) = (0.0f64, 0.0f64, 0.0f64);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let weight = f64::from(frame.get_pixel(x as u32, y as u32)[0]);
            mass += weight;
            mx += weight * x as f64;
            my += weight * y as f64;
        }
    }
    if mass <= 0.0 {
        return None;
    }
    Some(((mx / mass) as f32, (my / mass) as f32))
}
