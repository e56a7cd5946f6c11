mod kalman_filter;
mod mean_shift;
mod primitive;
mod runner;
mod template;
mod track_state;
mod tracker_state;

pub use kalman_filter::KalmanFilter;
pub use mean_shift::MeanShiftTracker;
pub use primitive::{AnyTracker, PrimitiveParams, TrackerAlgorithm, TrackingPrimitive};
pub use runner::{
    FrameObserver, FrameSource, MultiTrackRunner, RunnerConfig, SegmentOutcome, SegmentTracks,
    TrackedBox,
};
pub use template::{KalmanTemplateTracker, TemplateTracker};
pub use track_state::{RemovalReason, TrackState};
pub use tracker_state::{TrackerState, Trajectory};
