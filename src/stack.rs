//! Stack layout, segment partitioning and run orchestration.

mod config;
mod grid;
mod partitioner;
mod runner;

pub use config::RunConfig;
pub use grid::{FrameId, MASK_SUFFIX, StackGrid, is_mask_file, parse_frame_id};
pub use partitioner::{SegmentAxis, SegmentDescriptor, StackPartitioner};
pub use runner::{RunSummary, SegmentReport, SegmentStatus, StackRunner};
