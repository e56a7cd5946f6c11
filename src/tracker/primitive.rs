//! Single-object tracking primitives.

use std::fmt;
use std::str::FromStr;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::CellTrackError;
use crate::geometry::Rect;

use super::mean_shift::MeanShiftTracker;
use super::template::{KalmanTemplateTracker, TemplateTracker};

/// Capability interface of a single-object visual tracker.
///
/// Implement this trait to plug another tracking algorithm into
/// [`super::MultiTrackRunner`].
pub trait TrackingPrimitive {
    /// Prime the tracker on the reference frame. Returns `false` when the box
    /// cannot be tracked at all (e.g. it does not fit the frame).
    fn init(&mut self, frame: &GrayImage, bbox: Rect) -> bool;

    /// Follow the object into the next frame. `None` reports a tracking failure.
    fn update(&mut self, frame: &GrayImage) -> Option<Rect>;
}

/// Tuning shared by the built-in primitives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimitiveParams {
    /// Half-width (pixels) of the square template search window.
    pub search_radius: u32,
    /// Largest accepted mean absolute difference, normalized to [0, 1].
    pub max_match_error: f32,
    /// Iteration cap for mean shift.
    pub mean_shift_iterations: u32,
}

impl Default for PrimitiveParams {
    fn default() -> Self {
        Self {
            search_radius: 8,
            max_match_error: 0.25,
            mean_shift_iterations: 10,
        }
    }
}

/// Built-in tracking algorithms, chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackerAlgorithm {
    /// Template matching by mean absolute difference.
    #[default]
    Template,
    /// Intensity-weighted mean shift.
    MeanShift,
    /// Template matching around a Kalman-predicted center.
    KalmanTemplate,
}

impl TrackerAlgorithm {
    /// Create a fresh, uninitialized primitive of this kind.
    pub fn build(self, params: &PrimitiveParams) -> AnyTracker {
        match self {
            Self::Template => AnyTracker::Template(TemplateTracker::new(
                params.search_radius,
                params.max_match_error,
            )),
            Self::MeanShift => {
                AnyTracker::MeanShift(MeanShiftTracker::new(params.mean_shift_iterations))
            }
            Self::KalmanTemplate => AnyTracker::KalmanTemplate(KalmanTemplateTracker::new(
                params.search_radius,
                params.max_match_error,
            )),
        }
    }
}

impl fmt::Display for TrackerAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Template => "template",
            Self::MeanShift => "mean-shift",
            Self::KalmanTemplate => "kalman-template",
        };
        f.write_str(name)
    }
}

impl FromStr for TrackerAlgorithm {
    type Err = CellTrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "template" => Ok(Self::Template),
            "mean-shift" | "meanshift" => Ok(Self::MeanShift),
            "kalman-template" | "kalman" => Ok(Self::KalmanTemplate),
            other => Err(CellTrackError::Config(format!(
                "unknown tracker algorithm `{other}` (expected template, mean-shift or kalman-template)"
            ))),
        }
    }
}

/// Closed set of built-in primitives.
#[derive(Debug, Clone)]
pub enum AnyTracker {
    Template(TemplateTracker),
    MeanShift(MeanShiftTracker),
    KalmanTemplate(KalmanTemplateTracker),
}

impl TrackingPrimitive for AnyTracker {
    fn init(&mut self, frame: &GrayImage, bbox: Rect) -> bool {
        match self {
            Self::Template(t) => t.init(frame, bbox),
            Self::MeanShift(t) => t.init(frame, bbox),
            Self::KalmanTemplate(t) => t.init(frame, bbox),
        }
    }

    fn update(&mut self, frame: &GrayImage) -> Option<Rect> {
        match self {
            Self::Template(t) => t.update(frame),
            Self::MeanShift(t) => t.update(frame),
            Self::KalmanTemplate(t) => t.update(frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!(
            "Template".parse::<TrackerAlgorithm>().unwrap(),
            TrackerAlgorithm::Template
        );
        assert_eq!(
            "mean_shift".parse::<TrackerAlgorithm>().unwrap(),
            TrackerAlgorithm::MeanShift
        );
        assert_eq!(
            "kalman".parse::<TrackerAlgorithm>().unwrap(),
            TrackerAlgorithm::KalmanTemplate
        );
        assert!("csrt".parse::<TrackerAlgorithm>().is_err());
    }

    #[test]
    fn test_algorithm_display_round_trips() {
        for algo in [
            TrackerAlgorithm::Template,
            TrackerAlgorithm::MeanShift,
            TrackerAlgorithm::KalmanTemplate,
        ] {
            assert_eq!(algo.to_string().parse::<TrackerAlgorithm>().unwrap(), algo);
        }
    }

    #[test]
    fn test_build_matches_variant() {
        let params = PrimitiveParams::default();
        assert!(matches!(
            TrackerAlgorithm::MeanShift.build(&params),
            AnyTracker::MeanShift(_)
        ));
        assert!(matches!(
            TrackerAlgorithm::KalmanTemplate.build(&params),
            AnyTracker::KalmanTemplate(_)
        ));
    }
}
