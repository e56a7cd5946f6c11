//! Per-mask geometry index.

use std::fmt;

use ndarray::Array2;

use super::{Pixel, Polygon, Rect};
use crate::error::GeometryError;
use crate::stack::FrameId;

/// Outlines shorter than this are degenerate and kept as empty placeholders.
pub const MIN_OUTLINE_POINTS: usize = 4;

/// Axis-aligned box given by its inclusive min and max pixel corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min: Pixel,
    pub max: Pixel,
}

impl BoundingBox {
    /// Box spanned by two opposite corners given in any order.
    pub fn from_corners(c1: Pixel, c2: Pixel) -> Self {
        Self {
            min: (c1.0.min(c2.0), c1.1.min(c2.1)),
            max: (c1.0.max(c2.0), c1.1.max(c2.1)),
        }
    }

    /// Tight box around a set of points, `None` for an empty set.
    pub fn enclosing(points: &[Pixel]) -> Option<Self> {
        let (&first, rest) = points.split_first()?;
        let mut bbox = Self {
            min: first,
            max: first,
        };
        for &(x, y) in rest {
            bbox.min = (bbox.min.0.min(x), bbox.min.1.min(y));
            bbox.max = (bbox.max.0.max(x), bbox.max.1.max(y));
        }
        Some(bbox)
    }

    pub fn contains(&self, (x, y): Pixel) -> bool {
        x >= self.min.0 && x <= self.max.0 && y >= self.min.1 && y <= self.max.1
    }

    /// Tracker box spanning the corner coordinates.
    pub fn to_rect(&self) -> Rect {
        Rect::from_tlbr(
            self.min.0 as f32,
            self.min.1 as f32,
            self.max.0 as f32,
            self.max.1 as f32,
        )
    }
}

/// Result of a pixel-to-cell lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellLookup {
    /// Local index of the owning cell.
    Cell(usize),
    /// Inside the frame but on no cell outline.
    NotFound,
    /// Outside the frame size.
    OutOfBounds,
    /// The frame holds no cells at all.
    Empty,
}

/// Geometry of one segmentation mask: cell outlines, a dense pixel lookup
/// table and an optional region of interest.
///
/// Local cell indices are positions in the outline list and only mean
/// something within this frame.
#[derive(Debug, Clone)]
pub struct CellFrame {
    frame_id: FrameId,
    width: u32,
    height: u32,
    cells: Vec<Vec<Pixel>>,
    /// Indexed `[[y, x]]`; `-1` is background.
    lookup: Array2<i32>,
    region: Option<BoundingBox>,
    degenerate: Vec<usize>,
}

impl CellFrame {
    /// Index the outlines of one mask.
    ///
    /// Outlines with fewer than [`MIN_OUTLINE_POINTS`] points are replaced by
    /// empty placeholders so that indices stay aligned with the input order.
    /// Where outlines overlap, the later cell owns the pixel (last write wins).
    pub fn build(outlines: Vec<Vec<Pixel>>, size: (u32, u32), frame_id: FrameId) -> Self {
        let (width, height) = size;
        let mut degenerate = Vec::new();
        let cells: Vec<Vec<Pixel>> = outlines
            .into_iter()
            .enumerate()
            .map(|(index, outline)| match validate_outline(index, &outline) {
                Ok(()) => outline,
                Err(err) => {
                    tracing::debug!("frame {}: {}", frame_id, err);
                    degenerate.push(index);
                    Vec::new()
                }
            })
            .collect();

        let mut lookup = Array2::from_elem((height as usize, width as usize), -1);
        for (index, cell) in cells.iter().enumerate() {
            for &(x, y) in cell {
                if in_bounds((x, y), width, height) {
                    lookup[[y as usize, x as usize]] = index as i32;
                }
            }
        }

        Self {
            frame_id,
            width,
            height,
            cells,
            lookup,
            region: None,
            degenerate,
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Frame size as `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn outlines(&self) -> &[Vec<Pixel>] {
        &self.cells
    }

    /// Indices of cells stored as empty placeholders.
    pub fn degenerate_cells(&self) -> &[usize] {
        &self.degenerate
    }

    pub fn cell_outline(&self, index: usize) -> Option<&[Pixel]> {
        self.cells.get(index).map(Vec::as_slice)
    }

    /// Min/max corners over the outline; `None` for placeholders and unknown indices.
    pub fn cell_bounding_box(&self, index: usize) -> Option<BoundingBox> {
        self.cells
            .get(index)
            .and_then(|cell| BoundingBox::enclosing(cell))
    }

    /// Bounding box of every cell in outline order.
    pub fn bounding_boxes(&self) -> Vec<Option<BoundingBox>> {
        (0..self.cells.len())
            .map(|index| self.cell_bounding_box(index))
            .collect()
    }

    /// Owning cell of a pixel according to the last-write-wins lookup table.
    pub fn cell_at(&self, point: Pixel) -> CellLookup {
        if !in_bounds(point, self.width, self.height) {
            return CellLookup::OutOfBounds;
        }
        if self.cells.is_empty() {
            return CellLookup::Empty;
        }
        match self.lookup[[point.1 as usize, point.0 as usize]] {
            -1 => CellLookup::NotFound,
            index => CellLookup::Cell(index as usize),
        }
    }

    /// Polygons of every cell in outline order; placeholders are degenerate.
    pub fn polygons(&self) -> Vec<Polygon> {
        self.cells
            .iter()
            .map(|cell| Polygon::from_outline(cell))
            .collect()
    }

    /// Set the region of interest. Allowed once per frame.
    pub fn set_region(&mut self, c1: Pixel, c2: Pixel) -> Result<(), GeometryError> {
        if self.region.is_some() {
            return Err(GeometryError::RegionAlreadySet);
        }
        if c1.0 == c2.0 || c1.1 == c2.1 {
            return Err(GeometryError::InvalidRegion {
                x1: c1.0,
                y1: c1.1,
                x2: c2.0,
                y2: c2.1,
            });
        }
        self.region = Some(BoundingBox::from_corners(c1, c2));
        Ok(())
    }

    pub fn region(&self) -> Option<BoundingBox> {
        self.region
    }

    /// Whether both corners of the queried box lie inside the region.
    ///
    /// Errors with [`GeometryError::RegionUnset`] when no region was set.
    pub fn contains_region(&self, c1: Pixel, c2: Pixel) -> Result<bool, GeometryError> {
        let region = self.region.ok_or(GeometryError::RegionUnset)?;
        Ok(region.contains(c1) && region.contains(c2))
    }
}

impl fmt::Display for CellFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "CellFrame {} is {}x{} with {} cells",
            self.frame_id,
            self.width,
            self.height,
            self.cells.len()
        )?;
        for (index, cell) in self.cells.iter().enumerate() {
            write!(f, "{index}:")?;
            for (x, y) in cell {
                write!(f, " ({x}, {y})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn validate_outline(cell: usize, outline: &[Pixel]) -> Result<(), GeometryError> {
    if outline.len() < MIN_OUTLINE_POINTS {
        return Err(GeometryError::DegenerateOutline {
            cell,
            points: outline.len(),
        });
    }
    Ok(())
}

#[inline]
fn in_bounds((x, y): Pixel, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_id() -> FrameId {
        FrameId::new(1, 1)
    }

    fn two_blocks() -> CellFrame {
        CellFrame::build(
            vec![
                vec![(0, 0), (1, 0), (1, 1), (0, 1)],
                vec![(3, 3), (4, 3), (4, 4), (3, 4)],
            ],
            (5, 5),
            frame_id(),
        )
    }

    #[test]
    fn test_two_disjoint_blocks_bounding_boxes() {
        let frame = two_blocks();
        let boxes = frame.bounding_boxes();
        assert_eq!(
            boxes,
            vec![
                Some(BoundingBox {
                    min: (0, 0),
                    max: (1, 1)
                }),
                Some(BoundingBox {
                    min: (3, 3),
                    max: (4, 4)
                }),
            ]
        );
        let a = boxes[0].unwrap();
        let b = boxes[1].unwrap();
        assert!(a.max.0 < b.min.0 && a.max.1 < b.min.1);
    }

    #[test]
    fn test_bounding_box_encloses_outline() {
        let frame = CellFrame::build(
            vec![
                vec![(2, 7), (5, 3), (9, 4), (8, 8), (3, 9)],
                vec![(0, 0), (1, 0), (1, 1), (0, 1)],
                vec![(12, 2), (15, 2), (15, 6), (12, 6), (11, 4)],
            ],
            (20, 20),
            frame_id(),
        );
        for index in 0..frame.len() {
            let bbox = frame.cell_bounding_box(index).unwrap();
            for &point in frame.cell_outline(index).unwrap() {
                assert!(bbox.contains(point), "cell {index} point {point:?}");
            }
        }
    }

    #[test]
    fn test_lookup_maps_outline_back_to_cell() {
        let frame = two_blocks();
        for index in 0..frame.len() {
            for &point in frame.cell_outline(index).unwrap() {
                assert_eq!(frame.cell_at(point), CellLookup::Cell(index));
            }
        }
        assert_eq!(frame.cell_at((2, 2)), CellLookup::NotFound);
        assert_eq!(frame.cell_at((5, 0)), CellLookup::OutOfBounds);
        assert_eq!(frame.cell_at((-1, 0)), CellLookup::OutOfBounds);
    }

    #[test]
    fn test_overlapping_outlines_last_write_wins() {
        let frame = CellFrame::build(
            vec![
                vec![(0, 0), (2, 0), (2, 2), (0, 2)],
                vec![(2, 2), (4, 2), (4, 4), (2, 4)],
            ],
            (5, 5),
            frame_id(),
        );
        assert_eq!(frame.cell_at((2, 2)), CellLookup::Cell(1));
        assert_eq!(frame.cell_at((0, 0)), CellLookup::Cell(0));
    }

    #[test]
    fn test_empty_frame_lookup() {
        let frame = CellFrame::build(Vec::new(), (3, 3), frame_id());
        assert_eq!(frame.cell_at((1, 1)), CellLookup::Empty);
        assert_eq!(frame.cell_at((3, 1)), CellLookup::OutOfBounds);
    }

    #[test]
    fn test_degenerate_outline_kept_as_placeholder() {
        let frame = CellFrame::build(
            vec![
                vec![(0, 0), (1, 0), (1, 1)],
                vec![(3, 3), (4, 3), (4, 4), (3, 4)],
            ],
            (5, 5),
            frame_id(),
        );
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.degenerate_cells(), &[0]);
        assert_eq!(frame.cell_outline(0), Some(&[][..]));
        assert_eq!(frame.cell_bounding_box(0), None);
        assert_eq!(frame.cell_at((4, 4)), CellLookup::Cell(1));
        assert_eq!(frame.cell_at((0, 0)), CellLookup::NotFound);
    }

    #[test]
    fn test_region_is_fail_closed() {
        let mut frame = two_blocks();
        assert_eq!(
            frame.contains_region((0, 0), (1, 1)),
            Err(GeometryError::RegionUnset)
        );
        frame.set_region((4, 4), (1, 1)).unwrap();
        assert_eq!(frame.contains_region((1, 1), (3, 3)), Ok(true));
        assert_eq!(frame.contains_region((0, 1), (3, 3)), Ok(false));
        assert_eq!(frame.contains_region((1, 1), (3, 5)), Ok(false));
    }

    #[test]
    fn test_region_set_once() {
        let mut frame = two_blocks();
        frame.set_region((0, 0), (4, 4)).unwrap();
        assert_eq!(
            frame.set_region((0, 0), (2, 2)),
            Err(GeometryError::RegionAlreadySet)
        );
    }

    #[test]
    fn test_region_rejects_flat_box() {
        let mut frame = two_blocks();
        assert!(matches!(
            frame.set_region((0, 2), (4, 2)),
            Err(GeometryError::InvalidRegion { .. })
        ));
        assert!(frame.region().is_none());
    }
}
