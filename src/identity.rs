//! Global cell identities across video segments.

mod matcher;
mod table;

pub use matcher::{IdentityMatcher, MatchReport, MatcherConfig};
pub use table::{CellGeometry, GlobalId, GlobalIdentityTable};
