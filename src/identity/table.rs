//! Accumulator of matched cell geometry keyed by global identity.

use std::fmt;

use indexmap::IndexMap;

use crate::geometry::{Center, Pixel};
use crate::stack::FrameId;

/// Dense global cell identifier, assigned in insertion order from 0.
pub type GlobalId = usize;

/// Geometry matched to a global cell in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGeometry {
    /// Tracker center that selected the cell
    pub center: Center,
    /// Outline of the segmented cell containing the center
    pub outline: Vec<Pixel>,
}

/// Global id -> (frame id -> matched geometry), kept for the whole run.
///
/// Ids are never reassigned and the frames recorded for an id only grow.
#[derive(Debug, Clone, Default)]
pub struct GlobalIdentityTable {
    cells: Vec<IndexMap<FrameId, CellGeometry>>,
}

impl GlobalIdentityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next global id.
    pub fn register(&mut self) -> GlobalId {
        self.cells.push(IndexMap::new());
        self.cells.len() - 1
    }

    /// Store `geometry` for `id` at `frame`; a second write to the same key replaces the first.
    ///
    /// Recording under an id past the end allocates every id up to it.
    pub fn record(&mut self, id: GlobalId, frame: FrameId, geometry: CellGeometry) {
        if id >= self.cells.len() {
            self.cells.resize_with(id + 1, IndexMap::new);
        }
        self.cells[id].insert(frame, geometry);
    }

    /// Frames recorded for `id`, in first-recorded order.
    pub fn frames_for(&self, id: GlobalId) -> Option<&IndexMap<FrameId, CellGeometry>> {
        self.cells.get(id)
    }

    /// Every global id with an entry for `frame`, in global-id order.
    pub fn cells_in_frame(&self, frame: FrameId) -> impl Iterator<Item = (GlobalId, &CellGeometry)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(id, frames)| frames.get(&frame).map(|geometry| (id, geometry)))
    }

    /// Number of global ids allocated.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GlobalId, &IndexMap<FrameId, CellGeometry>)> {
        self.cells.iter().enumerate()
    }
}

impl fmt::Display for GlobalIdentityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, frames) in self.iter() {
            write!(f, "cell {id}:")?;
            for (frame, geometry) in frames {
                write!(
                    f,
                    " {frame}@({:.1}, {:.1})[{}]",
                    geometry.center.0,
                    geometry.center.1,
                    geometry.outline.len()
                )?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(x: f32) -> CellGeometry {
        CellGeometry {
            center: (x, x),
            outline: vec![(0, 0), (1, 0), (1, 1), (0, 1)],
        }
    }

    #[test]
    fn test_record_grows_ids_densely() {
        let mut table = GlobalIdentityTable::new();
        assert!(table.is_empty());
        table.record(2, FrameId::new(1, 1), geometry(1.0));
        assert_eq!(table.len(), 3);
        assert!(table.frames_for(0).unwrap().is_empty());
        assert_eq!(table.register(), 3);
    }

    #[test]
    fn test_same_key_overwrites_other_frames_accumulate() {
        let mut table = GlobalIdentityTable::new();
        let id = table.register();
        table.record(id, FrameId::new(1, 1), geometry(1.0));
        table.record(id, FrameId::new(1, 2), geometry(2.0));
        table.record(id, FrameId::new(1, 1), geometry(3.0));

        let frames = table.frames_for(id).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[&FrameId::new(1, 1)].center, (3.0, 3.0));
        assert_eq!(frames[&FrameId::new(1, 2)].center, (2.0, 2.0));
    }

    #[test]
    fn test_cells_in_frame_in_id_order() {
        let mut table = GlobalIdentityTable::new();
        let frame = FrameId::new(2, 5);
        table.record(3, frame, geometry(3.0));
        table.record(0, frame, geometry(0.0));
        table.record(1, FrameId::new(2, 6), geometry(1.0));

        let ids: Vec<GlobalId> = table.cells_in_frame(frame).map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 3]);
    }

    #[test]
    fn test_display_lists_every_cell() {
        let mut table = GlobalIdentityTable::new();
        table.record(1, FrameId::new(1, 1), geometry(1.0));
        let text = table.to_string();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("cell 1: t001_z001@(1.0, 1.0)[4]"));
    }
}
