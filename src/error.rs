/// Errors raised at the sequencer boundary.
///
/// Every error is recoverable: the offending operation is rejected and the
/// previous state is kept.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SequencerError {
    #[error("track {track} out of range (sequencer has {tracks} tracks)")]
    TrackOutOfRange { track: usize, tracks: usize },

    #[error("step {step} out of range (grid has {steps} steps)")]
    StepOutOfRange { step: usize, steps: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl SequencerError {
    /// True for the `OutOfRange` family (bad track id or step index).
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            SequencerError::TrackOutOfRange { .. } | SequencerError::StepOutOfRange { .. }
        )
    }
}
