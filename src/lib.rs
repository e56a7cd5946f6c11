//! 4D cell identity tracking across segmented (z, t) microscopy stacks.
//!
//! The stack is cut into video segments: one time sweep at a pivot depth
//! that defines the global cell identities, then depth sweeps at chosen
//! timepoints. Each segment is tracked with a visual tracking primitive per
//! seed cell, and the tracked centers are matched back to the segmented
//! cell outlines of every frame.

pub mod error;
pub mod geometry;
pub mod identity;
pub mod integration;
pub mod stack;
pub mod tracker;

pub use error::{CellTrackError, GeometryError, Result};
pub use geometry::{BoundingBox, CellFrame, CellLookup, Polygon, Rect};
pub use identity::{GlobalId, GlobalIdentityTable, IdentityMatcher, MatchReport};
pub use integration::{CancelToken, MaskArtifact, write_csv, write_summary};
pub use stack::{FrameId, RunConfig, StackGrid, StackPartitioner, StackRunner};
pub use tracker::{MultiTrackRunner, TrackerAlgorithm, TrackerState, TrackingPrimitive};
