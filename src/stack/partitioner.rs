//! Splits the (z, t) grid into independently tracked video segments.

use std::fmt;
use std::path::PathBuf;

use super::grid::{FrameId, StackGrid};

/// Axis a segment sweeps along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentAxis {
    /// Fixed depth, increasing time.
    Time,
    /// Fixed time, depth moving away from the pivot.
    Depth,
}

/// One video segment: mask files in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDescriptor {
    pub axis: SegmentAxis,
    pub frames: Vec<FrameId>,
    pub files: Vec<PathBuf>,
    /// Traversal runs against increasing index order.
    pub reversed: bool,
}

impl SegmentDescriptor {
    /// Frame supplying the initial tracker boxes.
    pub fn seed(&self) -> Option<FrameId> {
        self.frames.first().copied()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl fmt::Display for SegmentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axis = match self.axis {
            SegmentAxis::Time => "time",
            SegmentAxis::Depth => "depth",
        };
        match (self.frames.first(), self.frames.last()) {
            (Some(first), Some(last)) => write!(
                f,
                "{} segment {} -> {} ({} frames)",
                axis,
                first,
                last,
                self.frames.len()
            ),
            _ => write!(f, "empty {axis} segment"),
        }
    }
}

/// Emits segments in processing order.
///
/// The first segment is the time sweep at the pivot depth and defines the
/// global identities. For every timepoint of interest two depth sweeps follow,
/// both seeded at the pivot frame of that timepoint, which the time sweep has
/// already visited.
#[derive(Debug, Clone)]
pub struct StackPartitioner {
    z_pivot: u32,
    timepoints: Vec<u32>,
}

impl StackPartitioner {
    pub fn new(z_pivot: u32, timepoints: Vec<u32>) -> Self {
        Self {
            z_pivot,
            timepoints,
        }
    }

    pub fn partition(&self, grid: &StackGrid) -> Vec<SegmentDescriptor> {
        let depths = grid.depths();
        let mut segments = Vec::with_capacity(1 + 2 * self.timepoints.len());

        let time_sweep = grid
            .timepoints()
            .into_iter()
            .map(|t| FrameId::new(self.z_pivot, t));
        segments.push(Self::segment(grid, SegmentAxis::Time, time_sweep, false));

        for &t in &self.timepoints {
            let upward = depths
                .range(..=self.z_pivot)
                .rev()
                .map(|&z| FrameId::new(z, t));
            segments.push(Self::segment(grid, SegmentAxis::Depth, upward, true));

            let downward = depths.range(self.z_pivot..).map(|&z| FrameId::new(z, t));
            segments.push(Self::segment(grid, SegmentAxis::Depth, downward, false));
        }

        segments.retain(|segment| !segment.is_empty());
        segments
    }

    fn segment(
        grid: &StackGrid,
        axis: SegmentAxis,
        ids: impl Iterator<Item = FrameId>,
        reversed: bool,
    ) -> SegmentDescriptor {
        let (frames, files): (Vec<_>, Vec<_>) = ids
            .filter_map(|id| grid.get(id).map(|path| (id, path.to_path_buf())))
            .unzip();
        SegmentDescriptor {
            axis,
            frames,
            files,
            reversed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(depths: &[u32], times: &[u32]) -> StackGrid {
        let paths = depths.iter().flat_map(|&z| {
            times
                .iter()
                .map(move |&t| PathBuf::from(format!("s_t{t:03}_z{z:03}_masks.png")))
        });
        let (grid, rejected) = StackGrid::from_paths(paths);
        assert!(rejected.is_empty());
        grid
    }

    #[test]
    fn test_partition_order() {
        let grid = grid(&[1, 2, 3, 4], &[1, 2, 3]);
        let segments = StackPartitioner::new(2, vec![1, 3]).partition(&grid);
        assert_eq!(segments.len(), 5);

        let time = &segments[0];
        assert_eq!(time.axis, SegmentAxis::Time);
        assert_eq!(
            time.frames,
            vec![FrameId::new(2, 1), FrameId::new(2, 2), FrameId::new(2, 3)]
        );

        assert_eq!(segments[1].frames, vec![FrameId::new(2, 1), FrameId::new(1, 1)]);
        assert!(segments[1].reversed);
        assert_eq!(
            segments[2].frames,
            vec![FrameId::new(2, 1), FrameId::new(3, 1), FrameId::new(4, 1)]
        );
        assert!(!segments[2].reversed);
        assert_eq!(segments[3].seed(), Some(FrameId::new(2, 3)));
        assert_eq!(segments[4].seed(), Some(FrameId::new(2, 3)));
    }

    #[test]
    fn test_every_depth_seed_is_in_time_segment() {
        let grid = grid(&[1, 2, 3], &[1, 2, 3, 4]);
        let segments = StackPartitioner::new(2, vec![2, 4]).partition(&grid);
        let time = &segments[0];
        for segment in &segments[1..] {
            let seed = segment.seed().unwrap();
            assert!(time.frames.contains(&seed), "{seed}");
        }
    }

    #[test]
    fn test_files_follow_frames() {
        let grid = grid(&[1, 2], &[1]);
        let segments = StackPartitioner::new(1, vec![1]).partition(&grid);
        for segment in &segments {
            assert_eq!(segment.frames.len(), segment.files.len());
            for (id, file) in segment.frames.iter().zip(&segment.files) {
                assert_eq!(grid.get(*id), Some(file.as_path()));
            }
        }
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let grid = grid(&[1, 2], &[1, 2]);
        // Timepoint 7 does not exist and the pivot depth 5 has no files at all.
        assert!(StackPartitioner::new(5, vec![7]).partition(&grid).is_empty());

        let segments = StackPartitioner::new(1, vec![7]).partition(&grid);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].axis, SegmentAxis::Time);
    }

    #[test]
    fn test_display() {
        let grid = grid(&[1], &[1, 2]);
        let segments = StackPartitioner::new(1, vec![]).partition(&grid);
        assert_eq!(
            segments[0].to_string(),
            "time segment t001_z001 -> t002_z001 (2 frames)"
        );
    }
}
