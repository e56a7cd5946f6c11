//! Drives all trackers of one video segment frame by frame.

use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{CellTrackError, Result};
use crate::geometry::{CellFrame, Rect};
use crate::integration::CancelToken;
use crate::tracker::primitive::TrackingPrimitive;
use crate::tracker::track_state::RemovalReason;
use crate::tracker::tracker_state::{TrackerState, Trajectory};

/// Removal policy for the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Largest allowed center displacement (pixels) between consecutive frames.
    pub jump_limit: f32,
    /// Keep the trajectory of removed trackers (padded with `None`) instead of discarding it.
    pub keep_removed_history: bool,
    /// Seed for tracker display colors.
    pub color_seed: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            jump_limit: 15.0,
            keep_removed_history: true,
            color_seed: 0,
        }
    }
}

/// Sequential frame reader, in the manner of a video capture.
pub trait FrameSource {
    /// Next frame, `Ok(None)` once the video is exhausted.
    fn read(&mut self) -> Result<Option<GrayImage>>;
}

/// Live tracker box handed to a [`FrameObserver`].
#[derive(Debug, Clone, Copy)]
pub struct TrackedBox {
    pub tracker: usize,
    pub bbox: Rect,
    pub color: [u8; 3],
}

/// Diagnostic hook called after every processed frame.
pub trait FrameObserver {
    fn observe(&mut self, index: usize, frame: &GrayImage, boxes: &[TrackedBox]) -> Result<()>;
}

/// How a segment's frame loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentOutcome {
    /// Every frame of the video was processed
    Completed,
    /// The cancel token was raised
    Interrupted,
    /// A frame could not be decoded
    Halted(String),
}

/// Per-tracker results of one segment, ordered by seed cell index.
#[derive(Debug, Clone)]
pub struct SegmentTracks {
    pub trajectories: Vec<Trajectory>,
    /// Frame index and reason for every removed tracker.
    pub removals: Vec<Option<(usize, RemovalReason)>>,
    /// Frames processed, the reference frame included.
    pub frames_processed: usize,
    pub outcome: SegmentOutcome,
}

impl SegmentTracks {
    pub fn active_count(&self) -> usize {
        self.removals.iter().filter(|r| r.is_none()).count()
    }
}

/// Multi-object runner: one [`TrackerState`] per seed cell.
pub struct MultiTrackRunner<F> {
    config: RunnerConfig,
    factory: F,
    cancel: CancelToken,
}

impl<P, F> MultiTrackRunner<F>
where
    P: TrackingPrimitive,
    F: FnMut() -> P,
{
    /// `factory` creates one uninitialized primitive per seed cell.
    pub fn new(config: RunnerConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            cancel: CancelToken::default(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Track every cell of `seed` through `video`.
    ///
    /// The first frame read is the reference frame matching `seed`. A decode
    /// failure or a raised cancel token stops the loop early; the trajectories
    /// gathered so far are still returned.
    pub fn run(
        &mut self,
        seed: &CellFrame,
        video: &mut dyn FrameSource,
        mut observer: Option<&mut dyn FrameObserver>,
    ) -> Result<SegmentTracks> {
        let reference = video
            .read()?
            .ok_or_else(|| CellTrackError::FrameDecode {
                index: 0,
                reason: "video has no frames".to_string(),
            })?;

        let mut trackers = self.seed_trackers(seed, &reference);
        notify(&mut observer, 0, &reference, &trackers);

        let mut frames = 1;
        let mut outcome = SegmentOutcome::Completed;
        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("frame loop interrupted after {} frames", frames);
                outcome = SegmentOutcome::Interrupted;
                break;
            }
            let frame = match video.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!("halting segment at frame {}: {}", frames, err);
                    outcome = SegmentOutcome::Halted(err.to_string());
                    break;
                }
            };

            for (slot, tracker) in trackers.iter_mut().enumerate() {
                if tracker.is_active() {
                    self.step(slot, tracker, frames, &frame, seed);
                }
            }
            notify(&mut observer, frames, &frame, &trackers);
            frames += 1;
        }

        let removals = trackers.iter().map(TrackerState::removal).collect();
        let trajectories = trackers
            .into_iter()
            .map(|tracker| tracker.into_trajectory(frames))
            .collect();

        Ok(SegmentTracks {
            trajectories,
            removals,
            frames_processed: frames,
            outcome,
        })
    }

    fn seed_trackers(&mut self, seed: &CellFrame, reference: &GrayImage) -> Vec<TrackerState<P>> {
        let keep = self.config.keep_removed_history;
        let mut rng = StdRng::seed_from_u64(self.config.color_seed);
        let mut trackers = Vec::with_capacity(seed.len());

        for (slot, bbox) in seed.bounding_boxes().into_iter().enumerate() {
            let color = [rng.random(), rng.random(), rng.random()];
            let primitive = (self.factory)();
            let Some(bbox) = bbox else {
                trackers.push(TrackerState::placeholder(primitive, color));
                continue;
            };
            let rect = bbox.to_rect();
            let mut tracker = TrackerState::init(primitive, reference, rect, color, keep);
            if tracker.is_active() && leaves_region(seed, &rect) {
                tracker.mark_removed(0, RemovalReason::LeftRegion, keep);
            }
            if let Some((_, reason)) = tracker.removal() {
                tracing::debug!("tracker {} not started: {}", slot, reason);
            }
            trackers.push(tracker);
        }
        trackers
    }

    /// Update one live tracker and apply the removal checks in order:
    /// primitive failure, frame bounds, region, jump.
    fn step(
        &self,
        slot: usize,
        tracker: &mut TrackerState<P>,
        index: usize,
        frame: &GrayImage,
        seed: &CellFrame,
    ) {
        let keep = self.config.keep_removed_history;
        let reason = match tracker.update(frame) {
            None => Some(RemovalReason::PrimitiveFailure),
            Some(bbox) if !bbox.is_within_frame(frame.width(), frame.height()) => {
                Some(RemovalReason::LeftFrame)
            }
            Some(bbox) if leaves_region(seed, &bbox) => Some(RemovalReason::LeftRegion),
            Some(bbox) => {
                tracker.record_center(Some(bbox.center()));
                if tracker.check_jump(self.config.jump_limit) {
                    tracker
                        .last_step()
                        .map(|distance| RemovalReason::Jump { distance })
                } else {
                    None
                }
            }
        };

        if let Some(reason) = reason {
            tracing::debug!("tracker {} removed at frame {}: {}", slot, index, reason);
            tracker.mark_removed(index, reason, keep);
        }
    }
}

/// True only when a region is set and the box is not inside it.
fn leaves_region(seed: &CellFrame, bbox: &Rect) -> bool {
    let (c1, c2) = bbox.pixel_corners();
    seed.contains_region(c1, c2) == Ok(false)
}

fn notify<P: TrackingPrimitive>(
    observer: &mut Option<&mut dyn FrameObserver>,
    index: usize,
    frame: &GrayImage,
    trackers: &[TrackerState<P>],
) {
    let Some(observer) = observer.as_deref_mut() else {
        return;
    };
    let boxes: Vec<TrackedBox> = trackers
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_active())
        .map(|(tracker, t)| TrackedBox {
            tracker,
            bbox: t.bbox(),
            color: t.color(),
        })
        .collect();
    if let Err(err) = observer.observe(index, frame, &boxes) {
        tracing::warn!("frame {} observer failed: {}", index, err);
    }
}
