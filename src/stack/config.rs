//! Run configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CellTrackError, Result};
use crate::geometry::BoundingBox;
use crate::identity::MatcherConfig;
use crate::tracker::{PrimitiveParams, RunnerConfig, TrackerAlgorithm};

/// Everything a stack run needs, passed explicitly to [`super::StackRunner`].
///
/// Start from [`RunConfig::default()`] or a JSON file and override fields as
/// needed; every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory holding the `*_masks` / `*_img` artifacts.
    pub input_dir: PathBuf,
    /// Directory receiving the CSV files and annotated frames.
    pub output_dir: PathBuf,
    /// Depth of the identity-defining time sweep.
    pub z_pivot: u32,
    /// Timepoints swept along depth.
    pub timepoints: Vec<u32>,
    pub algorithm: TrackerAlgorithm,
    /// Largest center displacement (pixels) between consecutive frames.
    pub jump_limit: f32,
    /// Distance (pixels) within which seed centers are the same cell.
    pub match_tolerance: f32,
    pub keep_removed_history: bool,
    /// Region of interest `[x1, y1, x2, y2]` applied to every segment.
    pub region: Option<[i32; 4]>,
    /// Ask for a region on standard input before each segment.
    pub select_region: bool,
    /// Write annotated frames under `output_dir/segment_<n>/`.
    pub annotate: bool,
    pub color_seed: u64,
    pub search_radius: u32,
    pub max_match_error: f32,
    pub mean_shift_iterations: u32,
    /// Per-pixel table file name, relative to `output_dir`.
    pub output_csv: String,
    /// Per-cell summary file name, relative to `output_dir`.
    pub summary_csv: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        let runner = RunnerConfig::default();
        let primitive = PrimitiveParams::default();
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            z_pivot: 1,
            timepoints: Vec::new(),
            algorithm: TrackerAlgorithm::default(),
            jump_limit: runner.jump_limit,
            match_tolerance: MatcherConfig::default().tolerance,
            keep_removed_history: runner.keep_removed_history,
            region: None,
            select_region: false,
            annotate: false,
            color_seed: runner.color_seed,
            search_radius: primitive.search_radius,
            max_match_error: primitive.max_match_error,
            mean_shift_iterations: primitive.mean_shift_iterations,
            output_csv: "cell_tracks.csv".to_string(),
            summary_csv: "cell_summary.csv".to_string(),
        }
    }
}

impl RunConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|err| CellTrackError::io(path, err))?;
        let config: RunConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|err| CellTrackError::io(path, err))
    }

    pub fn validate(&self) -> Result<()> {
        if self.jump_limit.is_nan() || self.jump_limit <= 0.0 {
            return Err(CellTrackError::Config("jump_limit must be > 0".into()));
        }
        if self.match_tolerance.is_nan() || self.match_tolerance < 0.0 {
            return Err(CellTrackError::Config("match_tolerance must be >= 0".into()));
        }
        if !(0.0..=1.0).contains(&self.max_match_error) {
            return Err(CellTrackError::Config(
                "max_match_error must lie in [0, 1]".into(),
            ));
        }
        if self.search_radius == 0 {
            return Err(CellTrackError::Config("search_radius must be > 0".into()));
        }
        if self.mean_shift_iterations == 0 {
            return Err(CellTrackError::Config(
                "mean_shift_iterations must be > 0".into(),
            ));
        }
        if let Some([x1, y1, x2, y2]) = self.region
            && (x1 == x2 || y1 == y2)
        {
            return Err(CellTrackError::Config(format!(
                "region [{x1}, {y1}, {x2}, {y2}] is empty"
            )));
        }
        if self.output_csv.is_empty() || self.summary_csv.is_empty() {
            return Err(CellTrackError::Config("output file names must not be empty".into()));
        }
        Ok(())
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            jump_limit: self.jump_limit,
            keep_removed_history: self.keep_removed_history,
            color_seed: self.color_seed,
        }
    }

    pub fn primitive_params(&self) -> PrimitiveParams {
        PrimitiveParams {
            search_radius: self.search_radius,
            max_match_error: self.max_match_error,
            mean_shift_iterations: self.mean_shift_iterations,
        }
    }

    pub fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            tolerance: self.match_tolerance,
        }
    }

    /// Configured region as a corner box.
    pub fn region_box(&self) -> Option<BoundingBox> {
        self.region
            .map(|[x1, y1, x2, y2]| BoundingBox::from_corners((x1, y1), (x2, y2)))
    }

    pub fn output_csv_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_csv)
    }

    pub fn summary_csv_path(&self) -> PathBuf {
        self.output_dir.join(&self.summary_csv)
    }
}
