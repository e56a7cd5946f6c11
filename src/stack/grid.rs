//! (z, t) grid of segmentation artifacts discovered on disk.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CellTrackError, Result};

static FRAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)t(\d{3})_z(\d{3})").expect("frame pattern is a valid regex")
});

/// Stem suffix marking a label-mask artifact.
pub const MASK_SUFFIX: &str = "_masks";

/// Grid position of one mask, numbered as in the artifact file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId {
    pub z: u32,
    pub t: u32,
}

impl FrameId {
    pub fn new(z: u32, t: u32) -> Self {
        Self { z, t }
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{:03}_z{:03}", self.t, self.z)
    }
}

/// Extract the `t###_z###` position from a file name.
pub fn parse_frame_id(path: &Path) -> Result<FrameId> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CellTrackError::input(path, "file name is not valid UTF-8"))?;
    let captures = FRAME_PATTERN.captures(name).ok_or_else(|| {
        CellTrackError::input(
            path,
            "file name does not contain the pattern t###_z### (e.g. stack_t001_z004_masks.png)",
        )
    })?;
    let number = |index: usize| -> Result<u32> {
        captures[index]
            .parse()
            .map_err(|_| CellTrackError::input(path, "grid index is not a number"))
    };
    Ok(FrameId::new(number(2)?, number(1)?))
}

/// Whether `path` names a label-mask artifact (stem ends with `_masks`).
pub fn is_mask_file(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.to_ascii_lowercase().ends_with(MASK_SUFFIX))
}

/// Every usable mask artifact keyed by its grid position.
#[derive(Debug, Clone, Default)]
pub struct StackGrid {
    files: BTreeMap<FrameId, PathBuf>,
}

impl StackGrid {
    /// Scan `dir` for mask artifacts.
    ///
    /// Files with malformed names are reported and left out of the grid.
    pub fn discover(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|err| CellTrackError::io(dir, err))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| CellTrackError::io(dir, err))?;
            let path = entry.path();
            if path.is_file() && is_mask_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let (grid, rejected) = Self::from_paths(paths);
        for err in &rejected {
            tracing::warn!("excluding file: {}", err);
        }
        tracing::info!(
            "discovered {} masks ({} depths x {} timepoints) in {}",
            grid.len(),
            grid.depths().len(),
            grid.timepoints().len(),
            dir.display()
        );
        Ok(grid)
    }

    /// Build a grid from mask paths, returning the rejected ones as errors.
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> (Self, Vec<CellTrackError>) {
        let mut files = BTreeMap::new();
        let mut rejected = Vec::new();
        for path in paths {
            match parse_frame_id(&path) {
                Ok(id) if files.contains_key(&id) => rejected.push(CellTrackError::input(
                    &path,
                    format!("duplicate mask for {id}"),
                )),
                Ok(id) => {
                    files.insert(id, path);
                }
                Err(err) => rejected.push(err),
            }
        }
        (Self { files }, rejected)
    }

    pub fn get(&self, id: FrameId) -> Option<&Path> {
        self.files.get(&id).map(PathBuf::as_path)
    }

    pub fn contains(&self, id: FrameId) -> bool {
        self.files.contains_key(&id)
    }

    /// Distinct depth indices, ascending.
    pub fn depths(&self) -> BTreeSet<u32> {
        self.files.keys().map(|id| id.z).collect()
    }

    /// Distinct time indices, ascending.
    pub fn timepoints(&self) -> BTreeSet<u32> {
        self.files.keys().map(|id| id.t).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_id() {
        let id = parse_frame_id(Path::new("data/embryo_T012_Z003_masks.png")).unwrap();
        assert_eq!(id, FrameId::new(3, 12));
        assert_eq!(id.to_string(), "t012_z003");
    }

    #[test]
    fn test_parse_rejects_bad_names() {
        for name in ["z003t012_masks.png", "t12_z3_masks.png", "t012-z003_masks.png"] {
            let err = parse_frame_id(Path::new(name)).unwrap_err();
            assert!(matches!(err, CellTrackError::InputFormat { .. }), "{name}");
        }
    }

    #[test]
    fn test_is_mask_file() {
        assert!(is_mask_file(Path::new("a_t001_z001_masks.png")));
        assert!(is_mask_file(Path::new("a_t001_z001_MASKS.tif")));
        assert!(!is_mask_file(Path::new("a_t001_z001_img.png")));
    }

    #[test]
    fn test_from_paths_excludes_bad_and_duplicate_files() {
        let (grid, rejected) = StackGrid::from_paths(vec![
            PathBuf::from("s_t001_z001_masks.png"),
            PathBuf::from("s_t002_z001_masks.png"),
            PathBuf::from("s_t001_z002_masks.png"),
            PathBuf::from("bad_masks.png"),
            PathBuf::from("copy_t001_z001_masks.png"),
        ]);
        assert_eq!(grid.len(), 3);
        assert_eq!(rejected.len(), 2);
        assert_eq!(grid.depths().into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(grid.timepoints().into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(
            grid.get(FrameId::new(1, 1)),
            Some(Path::new("s_t001_z001_masks.png"))
        );
    }
}
