//! CSV writers for the populated identity table.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{CellTrackError, Result};
use crate::identity::{GlobalId, GlobalIdentityTable};

/// Write one `cell,x,y,z,t` row per outline pixel per recorded frame.
///
/// Rows follow global id, then recording order, then outline order; `cell`
/// is the 1-based global id. No header row. Returns the number of rows.
pub fn write_rows<W: Write>(table: &GlobalIdentityTable, mut out: W) -> std::io::Result<usize> {
    let mut rows = 0;
    for (id, frames) in table.iter() {
        for (frame, geometry) in frames {
            for &(x, y) in &geometry.outline {
                writeln!(out, "{},{},{},{},{}", id + 1, x, y, frame.z, frame.t)?;
                rows += 1;
            }
        }
    }
    out.flush()?;
    Ok(rows)
}

/// Write the per-pixel table to `path`.
///
/// The rows go to a sibling `.partial` file that is renamed into place once
/// complete, so `path` never holds a truncated table.
pub fn write_csv(table: &GlobalIdentityTable, path: &Path) -> Result<usize> {
    let rows = write_atomically(path, |out| write_rows(table, out))?;
    tracing::info!("wrote {} rows for {} cells to {}", rows, table.len(), path.display());
    Ok(rows)
}

/// Observed extent of one global cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSummary {
    pub cell: GlobalId,
    pub t_min: u32,
    pub t_max: u32,
    /// `(t, z_max - z_min)` for each requested timepoint the cell was seen at, ascending.
    pub depth_ranges: Vec<(u32, u32)>,
}

impl fmt::Display for CellSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.cell + 1, self.t_min, self.t_max)?;
        for (t, range) in &self.depth_ranges {
            write!(f, ", {t}:{range}")?;
        }
        Ok(())
    }
}

/// Summaries of every global cell with at least one recorded frame.
///
/// `t_min`/`t_max` span every recorded frame; depth ranges are reported only
/// for the timepoints listed in `timepoints`.
pub fn summarize(table: &GlobalIdentityTable, timepoints: &[u32]) -> Vec<CellSummary> {
    table
        .iter()
        .filter_map(|(cell, frames)| {
            let mut depths: BTreeMap<u32, (u32, u32)> = BTreeMap::new();
            for frame in frames.keys() {
                depths
                    .entry(frame.t)
                    .and_modify(|(lo, hi)| {
                        *lo = (*lo).min(frame.z);
                        *hi = (*hi).max(frame.z);
                    })
                    .or_insert((frame.z, frame.z));
            }
            let t_min = *depths.keys().next()?;
            let t_max = *depths.keys().next_back()?;
            Some(CellSummary {
                cell,
                t_min,
                t_max,
                depth_ranges: depths
                    .into_iter()
                    .filter(|(t, _)| timepoints.contains(t))
                    .map(|(t, (lo, hi))| (t, hi - lo))
                    .collect(),
            })
        })
        .collect()
}

/// Write one summary line per cell: `cell, t_min, t_max, t:range, ...`.
pub fn write_summary(
    table: &GlobalIdentityTable,
    timepoints: &[u32],
    path: &Path,
) -> Result<usize> {
    let summaries = summarize(table, timepoints);
    write_atomically(path, |out| {
        for summary in &summaries {
            writeln!(out, "{summary}")?;
        }
        out.flush()
    })?;
    tracing::info!("wrote summary of {} cells to {}", summaries.len(), path.display());
    Ok(summaries.len())
}

fn write_atomically<T>(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<T>,
) -> Result<T> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| CellTrackError::io(parent, err))?;
    }
    let partial = partial_path(path);
    let file = File::create(&partial).map_err(|err| CellTrackError::io(&partial, err))?;
    let mut out = BufWriter::new(file);
    let value = write(&mut out).map_err(|err| CellTrackError::io(&partial, err))?;
    drop(out);
    std::fs::rename(&partial, path).map_err(|err| CellTrackError::io(path, err))?;
    Ok(value)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}
