//! Per-tracker record for one video segment.

use image::GrayImage;

use crate::geometry::{Center, Rect};
use crate::tracker::primitive::TrackingPrimitive;
use crate::tracker::track_state::{RemovalReason, TrackState};

/// One slot per processed frame; `None` when the tracker had no position.
pub type Trajectory = Vec<Option<Center>>;

/// A tracking primitive plus its trajectory and lifecycle flags.
#[derive(Debug, Clone)]
pub struct TrackerState<P> {
    primitive: P,
    /// Latest box reported by the primitive
    bbox: Rect,
    trajectory: Trajectory,
    /// Display color for annotated frames
    color: [u8; 3],
    state: TrackState,
    removal: Option<(usize, RemovalReason)>,
}

impl<P: TrackingPrimitive> TrackerState<P> {
    /// Prime `primitive` on the reference frame and record the seed center.
    ///
    /// A primitive that refuses the box starts out removed at frame 0.
    pub fn init(
        mut primitive: P,
        reference: &GrayImage,
        initial: Rect,
        color: [u8; 3],
        keep_history: bool,
    ) -> Self {
        let accepted = primitive.init(reference, initial);
        let mut tracker = Self {
            primitive,
            bbox: initial,
            trajectory: vec![Some(initial.center())],
            color,
            state: TrackState::Active,
            removal: None,
        };
        if !accepted {
            tracker.mark_removed(0, RemovalReason::PrimitiveFailure, keep_history);
        }
        tracker
    }

    /// Slot for a seed cell without an outline: removed before it starts.
    pub fn placeholder(primitive: P, color: [u8; 3]) -> Self {
        Self {
            primitive,
            bbox: Rect::default(),
            trajectory: Vec::new(),
            color,
            state: TrackState::Removed,
            removal: Some((0, RemovalReason::EmptySeed)),
        }
    }

    /// Delegate to the primitive. Removed trackers are never updated.
    pub fn update(&mut self, frame: &GrayImage) -> Option<Rect> {
        if !self.is_active() {
            return None;
        }
        let bbox = self.primitive.update(frame)?;
        self.bbox = bbox;
        Some(bbox)
    }

    pub fn record_center(&mut self, center: Option<Center>) {
        self.trajectory.push(center);
    }

    /// Whether the last two recorded centers are further apart than `limit`.
    ///
    /// Fewer than two recorded centers is never a jump.
    pub fn check_jump(&self, limit: f32) -> bool {
        self.last_step().is_some_and(|distance| distance > limit)
    }

    /// Euclidean distance between the last two recorded centers.
    pub fn last_step(&self) -> Option<f32> {
        let mut recorded = self.trajectory.iter().rev().flatten();
        let (x1, y1) = recorded.next()?;
        let (x0, y0) = recorded.next()?;
        Some((x1 - x0).hypot(y1 - y0))
    }

    /// Enter the Removed state at `frame`.
    ///
    /// With `keep_history` the slot for `frame` becomes `None` (replacing a
    /// center already recorded for it); otherwise the trajectory is discarded.
    pub fn mark_removed(&mut self, frame: usize, reason: RemovalReason, keep_history: bool) {
        self.state = TrackState::Removed;
        self.removal = Some((frame, reason));
        if keep_history {
            self.trajectory.truncate(frame);
            self.trajectory.push(None);
        } else {
            self.trajectory.clear();
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == TrackState::Active
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    pub fn color(&self) -> [u8; 3] {
        self.color
    }

    pub fn trajectory(&self) -> &[Option<Center>] {
        &self.trajectory
    }

    /// Frame index and reason of the removal, if removed.
    pub fn removal(&self) -> Option<(usize, RemovalReason)> {
        self.removal
    }

    /// Consume the tracker, padding a kept trajectory with `None` to `frames` slots.
    pub fn into_trajectory(mut self, frames: usize) -> Trajectory {
        if !self.trajectory.is_empty() && self.trajectory.len() < frames {
            self.trajectory.resize(frames, None);
        }
        self.trajectory
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    /// Primitive replaying a fixed list of boxes.
    struct Scripted {
        boxes: std::vec::IntoIter<Option<Rect>>,
    }

    impl Scripted {
        fn new(boxes: Vec<Option<Rect>>) -> Self {
            Self {
                boxes: boxes.into_iter(),
            }
        }
    }

    impl TrackingPrimitive for Scripted {
        fn init(&mut self, _frame: &GrayImage, _bbox: Rect) -> bool {
            true
        }

        fn update(&mut self, _frame: &GrayImage) -> Option<Rect> {
            self.boxes.next().flatten()
        }
    }

    fn frame() -> GrayImage {
        GrayImage::new(200, 200)
    }

    #[test]
    fn test_init_records_seed_center() {
        let tracker = TrackerState::init(
            Scripted::new(vec![]),
            &frame(),
            Rect::from_tlbr(0.0, 0.0, 4.0, 2.0),
            [1, 2, 3],
            true,
        );
        assert!(tracker.is_active());
        assert_eq!(tracker.trajectory(), &[Some((2.0, 1.0))]);
        assert_eq!(tracker.color(), [1, 2, 3]);
    }

    #[test]
    fn test_check_jump_needs_two_centers() {
        let mut tracker = TrackerState::placeholder(Scripted::new(vec![]), [0; 3]);
        assert!(!tracker.check_jump(0.0));
        tracker.record_center(Some((0.0, 0.0)));
        assert!(!tracker.check_jump(0.0));
        tracker.record_center(None);
        tracker.record_center(Some((3.0, 4.0)));
        assert_eq!(tracker.last_step(), Some(5.0));
        assert!(tracker.check_jump(4.9));
        assert!(!tracker.check_jump(5.0));
    }

    #[test]
    fn test_jump_removes_with_history_kept() {
        let frame = frame();
        let mut tracker = TrackerState::init(
            Scripted::new(vec![
                Some(Rect::from_center(10.0, 10.0, 4.0, 4.0)),
                Some(Rect::from_center(100.0, 100.0, 4.0, 4.0)),
            ]),
            &frame,
            Rect::from_center(10.0, 10.0, 4.0, 4.0),
            [0; 3],
            true,
        );
        for index in 1..=2 {
            let bbox = tracker.update(&frame).unwrap();
            tracker.record_center(Some(bbox.center()));
            if tracker.check_jump(15.0) {
                let distance = tracker.last_step().unwrap();
                assert_abs_diff_eq!(distance, 127.279, epsilon = 1e-2);
                tracker.mark_removed(index, RemovalReason::Jump { distance }, true);
            }
        }
        assert_eq!(tracker.state(), TrackState::Removed);
        assert!(matches!(
            tracker.removal(),
            Some((2, RemovalReason::Jump { .. }))
        ));
        assert_eq!(
            tracker.trajectory(),
            &[Some((10.0, 10.0)), Some((10.0, 10.0)), None]
        );
    }

    #[test]
    fn test_removed_tracker_is_not_updated() {
        let frame = frame();
        let mut tracker = TrackerState::init(
            Scripted::new(vec![Some(Rect::new(1.0, 1.0, 2.0, 2.0))]),
            &frame,
            Rect::new(0.0, 0.0, 2.0, 2.0),
            [0; 3],
            true,
        );
        tracker.mark_removed(1, RemovalReason::LeftFrame, true);
        assert_eq!(tracker.update(&frame), None);
        assert_eq!(tracker.into_trajectory(4), vec![Some((1.0, 1.0)), None, None, None]);
    }

    #[test]
    fn test_discarded_history() {
        let mut tracker = TrackerState::init(
            Scripted::new(vec![]),
            &frame(),
            Rect::new(0.0, 0.0, 2.0, 2.0),
            [0; 3],
            false,
        );
        tracker.mark_removed(1, RemovalReason::PrimitiveFailure, false);
        assert!(tracker.trajectory().is_empty());
        assert!(tracker.into_trajectory(3).is_empty());
    }
}
