//! Geometric reconciliation of tracker output with segmented cells.

use serde::{Deserialize, Serialize};

use super::table::{CellGeometry, GlobalId, GlobalIdentityTable};
use crate::geometry::{CellFrame, Center, first_containing};
use crate::tracker::Trajectory;

/// Matcher tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Largest distance (pixels) between a seed center and a stored center
    /// for the two to be the same cell.
    pub tolerance: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { tolerance: 5.0 }
    }
}

/// Counters describing one segment's reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    /// The segment defined the global ids.
    pub canonical: bool,
    /// Trackers linked to a global id.
    pub linked: usize,
    /// Seed centers with no stored counterpart within tolerance.
    pub missed: usize,
    /// (global id, frame) entries written.
    pub recorded: usize,
    /// Tracker centers that fell inside no cell outline.
    pub unassigned: usize,
}

/// Assigns tracker centers to cell outlines and links tracker slots to global ids.
#[derive(Debug, Clone, Default)]
pub struct IdentityMatcher {
    config: MatcherConfig,
}

impl IdentityMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Reconcile one finished segment into `table`.
    ///
    /// `frames[i]` is the geometry of frame `i` of the segment and
    /// `trajectories[slot][i]` the center of tracker `slot` at that frame.
    /// A `canonical` segment registers one new global id per tracker; any
    /// other segment only links to ids already stored at its seed frame.
    pub fn match_segment(
        &self,
        frames: &[CellFrame],
        trajectories: &[Trajectory],
        table: &mut GlobalIdentityTable,
        canonical: bool,
    ) -> MatchReport {
        let mut report = MatchReport::default();
        let Some(seed) = frames.first() else {
            return report;
        };

        let ids: Vec<Option<GlobalId>> = if canonical {
            report.canonical = true;
            (0..trajectories.len())
                .map(|_| Some(table.register()))
                .collect()
        } else {
            self.link(table, seed, trajectories)
        };
        report.linked = ids.iter().flatten().count();
        report.missed = ids.len() - report.linked;

        let (recorded, unassigned) = self.assign(frames, trajectories, &ids, table);
        report.recorded = recorded;
        report.unassigned = unassigned;
        report
    }

    /// Link each tracker's seed center to a global id already stored for the seed frame.
    ///
    /// Stored entries are tried in global-id order and the first one within
    /// tolerance wins. An id claimed by one tracker is not offered to later
    /// trackers of the same segment. Unmatched trackers get `None`.
    pub fn link(
        &self,
        table: &GlobalIdentityTable,
        seed: &CellFrame,
        trajectories: &[Trajectory],
    ) -> Vec<Option<GlobalId>> {
        let stored: Vec<(GlobalId, Center)> = table
            .cells_in_frame(seed.frame_id())
            .map(|(id, geometry)| (id, geometry.center))
            .collect();
        if stored.is_empty() {
            tracing::warn!(
                "seed frame {} has no stored cells; segment cannot be linked",
                seed.frame_id()
            );
        }

        let mut claimed = vec![false; table.len()];
        let mut ids = Vec::with_capacity(trajectories.len());
        for (slot, trajectory) in trajectories.iter().enumerate() {
            let Some(center) = trajectory.first().copied().flatten() else {
                ids.push(None);
                continue;
            };
            let hit = stored
                .iter()
                .find(|&&(id, stored_center)| {
                    !claimed[id] && distance(center, stored_center) <= self.config.tolerance
                })
                .map(|&(id, _)| id);
            match hit {
                Some(id) => claimed[id] = true,
                None => tracing::debug!(
                    "tracker {} at ({:.1}, {:.1}) has no match in {}",
                    slot,
                    center.0,
                    center.1,
                    seed.frame_id()
                ),
            }
            ids.push(hit);
        }
        ids
    }

    /// Record, for each frame, the outline containing every linked tracker's center.
    ///
    /// Returns `(recorded, unassigned)` counts.
    fn assign(
        &self,
        frames: &[CellFrame],
        trajectories: &[Trajectory],
        ids: &[Option<GlobalId>],
        table: &mut GlobalIdentityTable,
    ) -> (usize, usize) {
        let (mut recorded, mut unassigned) = (0, 0);
        for (index, frame) in frames.iter().enumerate() {
            let polygons = frame.polygons();
            for (trajectory, id) in trajectories.iter().zip(ids) {
                let Some(id) = *id else {
                    continue;
                };
                let Some(center) = trajectory.get(index).copied().flatten() else {
                    continue;
                };
                match first_containing(&polygons, center) {
                    Some(cell) => {
                        let geometry = CellGeometry {
                            center,
                            outline: frame.outlines()[cell].clone(),
                        };
                        table.record(id, frame.frame_id(), geometry);
                        recorded += 1;
                    }
                    None => unassigned += 1,
                }
            }
        }
        (recorded, unassigned)
    }
}

#[inline]
fn distance(a: Center, b: Center) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::FrameId;

    fn square(cx: i32, cy: i32, r: i32) -> Vec<(i32, i32)> {
        vec![
            (cx - r, cy - r),
            (cx + r, cy - r),
            (cx + r, cy + r),
            (cx - r, cy + r),
        ]
    }

    fn frame(z: u32, t: u32, outlines: Vec<Vec<(i32, i32)>>) -> CellFrame {
        CellFrame::build(outlines, (600, 600), FrameId::new(z, t))
    }

    fn stored_table(seed: FrameId) -> GlobalIdentityTable {
        let mut table = GlobalIdentityTable::new();
        for center in [(5.0, 5.0), (20.0, 20.0)] {
            let id = table.register();
            table.record(
                id,
                seed,
                CellGeometry {
                    center,
                    outline: Vec::new(),
                },
            );
        }
        table
    }

    #[test]
    fn test_canonical_segment_defines_ids_by_seed_order() {
        let frames = vec![
            frame(2, 1, vec![square(10, 10, 3), square(40, 40, 3)]),
            frame(2, 2, vec![square(40, 41, 3), square(11, 10, 3)]),
        ];
        let trajectories = vec![
            vec![Some((10.0, 10.0)), Some((11.0, 10.0))],
            vec![Some((40.0, 40.0)), Some((40.0, 41.0))],
        ];
        let mut table = GlobalIdentityTable::new();
        let report = IdentityMatcher::default().match_segment(&frames, &trajectories, &mut table, true);

        assert!(report.canonical);
        assert_eq!(report.linked, 2);
        assert_eq!(report.recorded, 4);
        assert_eq!(table.len(), 2);
        let second = &table.frames_for(0).unwrap()[&FrameId::new(2, 2)];
        assert_eq!(second.outline, square(11, 10, 3));
        let second = &table.frames_for(1).unwrap()[&FrameId::new(2, 2)];
        assert_eq!(second.outline, square(40, 41, 3));
    }

    #[test]
    fn test_seed_centers_link_within_tolerance() {
        let seed = FrameId::new(2, 1);
        let table = stored_table(seed);
        let seed_frame = frame(2, 1, vec![square(6, 6, 2), square(500, 500, 2)]);
        let trajectories = vec![vec![Some((6.0, 6.0))], vec![Some((500.0, 500.0))]];

        let ids = IdentityMatcher::default().link(&table, &seed_frame, &trajectories);
        assert_eq!(ids, vec![Some(0), None]);
    }

    #[test]
    fn test_missed_tracker_is_not_merged() {
        let seed = FrameId::new(2, 1);
        let mut table = stored_table(seed);
        let frames = vec![
            frame(2, 1, vec![square(6, 6, 2), square(500, 500, 2)]),
            frame(3, 1, vec![square(6, 7, 2), square(500, 501, 2)]),
        ];
        let trajectories = vec![
            vec![Some((6.0, 6.0)), Some((6.0, 7.0))],
            vec![Some((500.0, 500.0)), Some((500.0, 501.0))],
        ];
        let report = IdentityMatcher::default().match_segment(&frames, &trajectories, &mut table, false);

        assert!(!report.canonical);
        assert_eq!(report.linked, 1);
        assert_eq!(report.missed, 1);
        assert_eq!(table.len(), 2);
        assert!(table.frames_for(0).unwrap().contains_key(&FrameId::new(3, 1)));
        assert!(!table.frames_for(1).unwrap().contains_key(&FrameId::new(3, 1)));
        assert_eq!(table.cells_in_frame(FrameId::new(3, 1)).count(), 1);
    }

    #[test]
    fn test_depth_segment_without_canonical_ids_records_nothing() {
        let frames = vec![
            frame(2, 3, vec![square(10, 10, 3)]),
            frame(3, 3, vec![square(10, 10, 3)]),
        ];
        let trajectories = vec![vec![Some((10.0, 10.0)), Some((10.0, 10.0))]];
        let mut table = GlobalIdentityTable::new();
        let report = IdentityMatcher::default().match_segment(&frames, &trajectories, &mut table, false);

        assert!(!report.canonical);
        assert_eq!(report.linked, 0);
        assert_eq!(report.missed, 1);
        assert_eq!(report.recorded, 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_linking_is_deterministic() {
        let seed = FrameId::new(2, 1);
        let table = stored_table(seed);
        let seed_frame = frame(2, 1, Vec::new());
        let trajectories = vec![
            vec![Some((21.0, 19.0))],
            vec![Some((4.0, 5.0))],
            vec![None],
        ];
        let matcher = IdentityMatcher::default();
        let first = matcher.link(&table, &seed_frame, &trajectories);
        assert_eq!(first, vec![Some(1), Some(0), None]);
        assert_eq!(matcher.link(&table, &seed_frame, &trajectories), first);
    }

    #[test]
    fn test_claimed_id_is_not_reused() {
        let seed = FrameId::new(2, 1);
        let table = stored_table(seed);
        let trajectories = vec![vec![Some((5.0, 6.0))], vec![Some((6.0, 5.0))]];
        let ids = IdentityMatcher::default().link(&table, &frame(2, 1, Vec::new()), &trajectories);
        assert_eq!(ids, vec![Some(0), None]);
    }

    #[test]
    fn test_center_outside_outlines_is_unassigned() {
        let frames = vec![frame(1, 1, vec![square(10, 10, 3)])];
        let trajectories = vec![vec![Some((10.0, 10.0))], vec![Some((13.0, 10.0))]];
        let mut table = GlobalIdentityTable::new();
        let report = IdentityMatcher::default().match_segment(&frames, &trajectories, &mut table, true);

        assert_eq!(report.recorded, 1);
        assert_eq!(report.unassigned, 1);
        assert_eq!(table.len(), 2);
        assert!(table.frames_for(1).unwrap().is_empty());
    }

    #[test]
    fn test_first_containing_outline_wins() {
        let frames = vec![frame(1, 1, vec![square(10, 10, 5), square(12, 12, 5)])];
        let trajectories = vec![vec![Some((11.0, 11.0))]];
        let mut table = GlobalIdentityTable::new();
        IdentityMatcher::default().match_segment(&frames, &trajectories, &mut table, true);
        let geometry = &table.frames_for(0).unwrap()[&FrameId::new(1, 1)];
        assert_eq!(geometry.outline, square(10, 10, 5));
    }

    #[test]
    fn test_short_trajectory_skips_missing_frames() {
        let frames = vec![
            frame(1, 1, vec![square(10, 10, 3)]),
            frame(1, 2, vec![square(10, 10, 3)]),
        ];
        let trajectories = vec![vec![Some((10.0, 10.0))]];
        let mut table = GlobalIdentityTable::new();
        let report = IdentityMatcher::default().match_segment(&frames, &trajectories, &mut table, true);
        assert_eq!(report.recorded, 1);
    }
}
