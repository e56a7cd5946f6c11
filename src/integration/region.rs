//! Region-of-interest selection before a segment starts.

use std::io::{BufRead, StdinLock};

use crate::error::{CellTrackError, Result};
use crate::geometry::{BoundingBox, CellFrame};

/// Supplies the region of interest for a segment's seed frame.
pub trait RegionSelector {
    /// `Ok(None)` leaves the segment unrestricted.
    fn select(&mut self, seed: &CellFrame) -> Result<Option<BoundingBox>>;
}

/// Same region for every segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRegion(pub BoundingBox);

impl RegionSelector for FixedRegion {
    fn select(&mut self, _seed: &CellFrame) -> Result<Option<BoundingBox>> {
        Ok(Some(self.0))
    }
}

/// Reads `x1 y1 x2 y2` lines, blocking until a valid one arrives.
///
/// An empty line or end of input selects no region.
#[derive(Debug)]
pub struct StdinRegionSelector<R> {
    input: R,
}

impl StdinRegionSelector<StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin().lock())
    }
}

impl<R: BufRead> StdinRegionSelector<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> RegionSelector for StdinRegionSelector<R> {
    fn select(&mut self, seed: &CellFrame) -> Result<Option<BoundingBox>> {
        let (width, height) = seed.size();
        loop {
            eprintln!(
                "region of interest for {} ({}x{}) as `x1 y1 x2 y2`, empty for none:",
                seed.frame_id(),
                width,
                height
            );
            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .map_err(|err| CellTrackError::io("<stdin>", err))?;
            if read == 0 || line.trim().is_empty() {
                return Ok(None);
            }
            match parse_region(&line) {
                Some(region) => return Ok(Some(region)),
                None => tracing::warn!("could not parse region {:?}", line.trim()),
            }
        }
    }
}

/// Four integers separated by whitespace or commas, spanning a non-flat box.
pub fn parse_region(text: &str) -> Option<BoundingBox> {
    let values: Vec<i32> = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(str::parse::<i32>)
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    let &[x1, y1, x2, y2] = values.as_slice() else {
        return None;
    };
    (x1 != x2 && y1 != y2).then(|| BoundingBox::from_corners((x1, y1), (x2, y2)))
}
