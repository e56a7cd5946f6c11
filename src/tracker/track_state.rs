/// Tracker lifecycle within one video segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Updated every frame
    #[default]
    Active,
    /// Terminal for the segment; no further updates are attempted
    Removed,
}

/// Why a tracker left the Active state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemovalReason {
    /// The seed cell had no usable outline
    EmptySeed,
    /// The tracking primitive reported failure
    PrimitiveFailure,
    /// The updated box left the frame
    LeftFrame,
    /// The updated box left the region of interest
    LeftRegion,
    /// The center moved further than the jump limit between two frames
    Jump { distance: f32 },
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySeed => write!(f, "empty seed outline"),
            Self::PrimitiveFailure => write!(f, "tracking failure"),
            Self::LeftFrame => write!(f, "box left the frame"),
            Self::LeftRegion => write!(f, "box left the region of interest"),
            Self::Jump { distance } => write!(f, "jumped {distance:.1}px"),
        }
    }
}
