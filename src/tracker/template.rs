//! Template-matching primitives.

use image::GrayImage;
use nalgebra::{Matrix4, Vector4};
use ndarray::Array2;

use super::kalman_filter::KalmanFilter;
use super::primitive::TrackingPrimitive;
use crate::geometry::Rect;

/// Intensity patch cut from a frame, indexed `[[row, col]]`.
#[derive(Debug, Clone)]
struct Template {
    patch: Array2<f32>,
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    rect: Rect,
    error: f32,
}

impl Template {
    fn capture(frame: &GrayImage, rect: &Rect) -> Option<Self> {
        let (w, h) = patch_dims(rect);
        let x = rect.x.round() as i64;
        let y = rect.y.round() as i64;
        if !fits(frame, x, y, w, h) {
            return None;
        }
        let patch = Array2::from_shape_fn((h, w), |(r, c)| {
            f32::from(frame.get_pixel(x as u32 + c as u32, y as u32 + r as u32)[0])
        });
        Some(Self { patch })
    }

    /// Best whole-pixel placement within `radius` pixels of `origin`.
    ///
    /// Lower error wins; equal errors prefer the smaller displacement.
    fn locate(&self, frame: &GrayImage, origin: &Rect, radius: u32) -> Option<Placement> {
        let (h, w) = self.patch.dim();
        let ox = origin.x.round() as i64;
        let oy = origin.y.round() as i64;
        let r = i64::from(radius);
        let norm = (w * h) as f32 * 255.0;

        let mut best: Option<(f32, i64, i64, i64)> = None;
        for dy in -r..=r {
            for dx in -r..=r {
                let (x, y) = (ox + dx, oy + dy);
                if !fits(frame, x, y, w, h) {
                    continue;
                }
                let mut sum = 0.0f32;
                for ((row, col), &value) in self.patch.indexed_iter() {
                    let pixel = frame.get_pixel((x as usize + col) as u32, (y as usize + row) as u32);
                    sum += (f32::from(pixel[0]) - value).abs();
                }
                let error = sum / norm;
                let dist = dx * dx + dy * dy;
                let better = best.is_none_or(|(best_err, best_dist, _, _)| {
                    error < best_err || (error == best_err && dist < best_dist)
                });
                if better {
                    best = Some((error, dist, dx, dy));
                }
            }
        }

        best.map(|(error, _, dx, dy)| Placement {
            rect: origin.moved_to((ox + dx) as f32, (oy + dy) as f32),
            error,
        })
    }
}

fn patch_dims(rect: &Rect) -> (usize, usize) {
    (
        rect.width.round().max(1.0) as usize,
        rect.height.round().max(1.0) as usize,
    )
}

fn fits(frame: &GrayImage, x: i64, y: i64, w: usize, h: usize) -> bool {
    x >= 0
        && y >= 0
        && x + w as i64 <= i64::from(frame.width())
        && y + h as i64 <= i64::from(frame.height())
}

/// Tracks a box by matching its appearance in a window around the last position.
#[derive(Debug, Clone)]
pub struct TemplateTracker {
    template: Option<Template>,
    bbox: Rect,
    search_radius: u32,
    max_error: f32,
}

impl TemplateTracker {
    pub fn new(search_radius: u32, max_error: f32) -> Self {
        Self {
            template: None,
            bbox: Rect::default(),
            search_radius,
            max_error,
        }
    }
}

impl TrackingPrimitive for TemplateTracker {
    fn init(&mut self, frame: &GrayImage, bbox: Rect) -> bool {
        self.bbox = bbox;
        self.template = Template::capture(frame, &bbox);
        self.template.is_some()
    }

    fn update(&mut self, frame: &GrayImage) -> Option<Rect> {
        let placement = self
            .template
            .as_ref()?
            .locate(frame, &self.bbox, self.search_radius)?;
        if placement.error > self.max_error {
            return None;
        }
        self.bbox = placement.rect;
        self.template = Template::capture(frame, &placement.rect);
        Some(self.bbox)
    }
}

/// Template matching that searches around a Kalman-predicted center.
#[derive(Debug, Clone)]
pub struct KalmanTemplateTracker {
    inner: TemplateTracker,
    kalman_filter: KalmanFilter,
    mean: Vector4<f64>,
    covariance: Matrix4<f64>,
}

impl KalmanTemplateTracker {
    pub fn new(search_radius: u32, max_error: f32) -> Self {
        Self {
            inner: TemplateTracker::new(search_radius, max_error),
            kalman_filter: KalmanFilter::default(),
            mean: Vector4::zeros(),
            covariance: Matrix4::identity(),
        }
    }

    fn scale(&self) -> f64 {
        f64::from(self.inner.bbox.height.max(1.0))
    }
}

impl TrackingPrimitive for KalmanTemplateTracker {
    fn init(&mut self, frame: &GrayImage, bbox: Rect) -> bool {
        let (cx, cy) = bbox.center();
        let (mean, covariance) = self
            .kalman_filter
            .initiate([f64::from(cx), f64::from(cy)], f64::from(bbox.height.max(1.0)));
        self.mean = mean;
        self.covariance = covariance;
        self.inner.init(frame, bbox)
    }

    fn update(&mut self, frame: &GrayImage) -> Option<Rect> {
        let scale = self.scale();
        let (mean, covariance) = self
            .kalman_filter
            .predict(&self.mean, &self.covariance, scale);
        let current = self.inner.bbox;
        self.inner.bbox = Rect::from_center(mean[0] as f32, mean[1] as f32, current.width, current.height);

        let Some(measured) = self.inner.update(frame) else {
            self.inner.bbox = current;
            return None;
        };
        let (cx, cy) = measured.center();
        let (mean, covariance) = self.kalman_filter.update(
            &mean,
            &covariance,
            [f64::from(cx), f64::from(cy)],
            scale,
        );
        self.mean = mean;
        self.covariance = covariance;
        Some(measured)
    }
}
