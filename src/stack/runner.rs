//! Runs every segment of a stack in order and fills the identity table.

use crate::error::{CellTrackError, Result};
use crate::geometry::CellFrame;
use crate::identity::{GlobalIdentityTable, IdentityMatcher, MatchReport};
use crate::integration::{
    Annotator, ArtifactVideo, CancelToken, FixedRegion, MaskArtifact, RegionSelector,
    StdinRegionSelector, write_csv, write_summary,
};
use crate::tracker::{FrameObserver, MultiTrackRunner, SegmentOutcome};

use super::config::RunConfig;
use super::grid::StackGrid;
use super::partitioner::{SegmentAxis, SegmentDescriptor, StackPartitioner};

/// What happened to one segment.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentStatus {
    Tracked {
        outcome: SegmentOutcome,
        frames_processed: usize,
        /// Trackers still active at the end of the frame loop.
        active: usize,
        matches: MatchReport,
    },
    /// The segment could not be loaded or started.
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentReport {
    pub index: usize,
    pub segment: SegmentDescriptor,
    pub status: SegmentStatus,
}

/// Result of a whole stack run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub table: GlobalIdentityTable,
    pub segments: Vec<SegmentReport>,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.segments
            .iter()
            .filter(|report| matches!(report.status, SegmentStatus::Skipped(_)))
            .count()
    }
}

/// Sequential orchestration: partition, track, reconcile, write.
///
/// Segments run strictly in partition order because every depth sweep links
/// its trackers through cells stored by an earlier segment.
pub struct StackRunner {
    config: RunConfig,
    cancel: CancelToken,
    selector: Option<Box<dyn RegionSelector>>,
}

impl StackRunner {
    /// A configured `region` is applied to every segment; otherwise
    /// `select_region` asks on standard input before each segment.
    pub fn new(config: RunConfig) -> Self {
        let selector: Option<Box<dyn RegionSelector>> = match config.region_box() {
            Some(region) => Some(Box::new(FixedRegion(region))),
            None if config.select_region => Some(Box::new(StdinRegionSelector::stdin())),
            None => None,
        };
        Self {
            config,
            cancel: CancelToken::default(),
            selector,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_region_selector(mut self, selector: impl RegionSelector + 'static) -> Self {
        self.selector = Some(Box::new(selector));
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Token interrupting the segment currently being tracked.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Discover the artifacts in `input_dir`, track every segment and write
    /// both CSV files once the table is complete.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.config.validate()?;
        let grid = StackGrid::discover(&self.config.input_dir)?;
        if grid.is_empty() {
            return Err(CellTrackError::input(
                &self.config.input_dir,
                "no *_masks artifacts found",
            ));
        }

        let summary = self.track(&grid);
        write_csv(&summary.table, &self.config.output_csv_path())?;
        write_summary(
            &summary.table,
            &self.config.timepoints,
            &self.config.summary_csv_path(),
        )?;
        Ok(summary)
    }

    /// Track every segment of `grid` without writing any output.
    ///
    /// A segment that fails to load is reported and skipped.
    pub fn track(&mut self, grid: &StackGrid) -> RunSummary {
        let segments =
            StackPartitioner::new(self.config.z_pivot, self.config.timepoints.clone()).partition(grid);
        let matcher = IdentityMatcher::new(self.config.matcher_config());
        let mut table = GlobalIdentityTable::new();
        let mut reports = Vec::with_capacity(segments.len());

        for (index, segment) in segments.into_iter().enumerate() {
            tracing::info!("segment {}: {}", index, segment);
            let status = match self.run_segment(index, &segment, &matcher, &mut table) {
                Ok(status) => status,
                Err(err) => {
                    tracing::warn!("skipping segment {}: {}", index, err);
                    SegmentStatus::Skipped(err.to_string())
                }
            };
            reports.push(SegmentReport {
                index,
                segment,
                status,
            });
        }

        RunSummary {
            table,
            segments: reports,
        }
    }

    fn run_segment(
        &mut self,
        index: usize,
        segment: &SegmentDescriptor,
        matcher: &IdentityMatcher,
        table: &mut GlobalIdentityTable,
    ) -> Result<SegmentStatus> {
        let artifacts = load_artifacts(segment)?;
        let mut frames: Vec<CellFrame> = artifacts.iter().map(MaskArtifact::cell_frame).collect();
        let Some(seed) = frames.first_mut() else {
            return Ok(SegmentStatus::Skipped("segment has no frames".to_string()));
        };
        if let Some(selector) = self.selector.as_mut()
            && let Some(region) = selector.select(seed)?
        {
            seed.set_region(region.min, region.max)?;
        }

        let mut video: ArtifactVideo = artifacts
            .into_iter()
            .map(MaskArtifact::into_intensity)
            .collect();
        let mut annotator = if self.config.annotate {
            let dir = self.config.output_dir.join(format!("segment_{index}"));
            Some(Annotator::new(dir)?)
        } else {
            None
        };

        let algorithm = self.config.algorithm;
        let params = self.config.primitive_params();
        let mut runner = MultiTrackRunner::new(self.config.runner_config(), || {
            algorithm.build(&params)
        })
        .with_cancel(self.cancel.clone());
        let tracks = runner.run(
            &frames[0],
            &mut video,
            annotator
                .as_mut()
                .map(|annotator| annotator as &mut dyn FrameObserver),
        )?;
        if tracks.outcome == SegmentOutcome::Interrupted {
            // Only the current segment is abandoned.
            self.cancel.reset();
        }

        let processed = &frames[..tracks.frames_processed.min(frames.len())];
        let canonical = segment.axis == SegmentAxis::Time;
        let matches = matcher.match_segment(processed, &tracks.trajectories, table, canonical);
        tracing::info!(
            "segment {} done: {} frames, {} trackers active, {} linked, {} missed, {} cells recorded",
            index,
            tracks.frames_processed,
            tracks.active_count(),
            matches.linked,
            matches.missed,
            matches.recorded
        );

        Ok(SegmentStatus::Tracked {
            active: tracks.active_count(),
            frames_processed: tracks.frames_processed,
            outcome: tracks.outcome,
            matches,
        })
    }
}

/// Load every artifact of `segment` in order.
///
/// A malformed artifact after the seed is dropped from the segment. A
/// malformed seed, or a file that cannot be read or decoded, fails the
/// whole segment.
fn load_artifacts(segment: &SegmentDescriptor) -> Result<Vec<MaskArtifact>> {
    let mut artifacts = Vec::with_capacity(segment.len());
    for (position, path) in segment.files.iter().enumerate() {
        match MaskArtifact::load(path) {
            Ok(artifact) => artifacts.push(artifact),
            Err(err @ CellTrackError::InputFormat { .. }) if position > 0 => {
                tracing::warn!("dropping frame {}: {}", segment.frames[position], err);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(artifacts)
}
