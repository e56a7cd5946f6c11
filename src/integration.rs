//! External collaborators of the tracking core.
//!
//! Mask artifacts on disk, the composed per-segment video, diagnostic
//! rendering, interactive region selection, cancellation and the CSV outputs.

mod annotate;
mod artifact;
mod cancel;
mod output;
mod region;
mod video;

pub use annotate::Annotator;
pub use artifact::{INTENSITY_SUFFIX, LabelImage, MaskArtifact, intensity_path};
pub use cancel::CancelToken;
pub use output::{CellSummary, summarize, write_csv, write_rows, write_summary};
pub use region::{FixedRegion, RegionSelector, StdinRegionSelector, parse_region};
pub use video::ArtifactVideo;
