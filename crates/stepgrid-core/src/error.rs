//! Error types for stepgrid-core

use thiserror::Error;

use crate::pattern::ChannelId;

/// Result type alias for strict pattern operations
pub type Result<T> = std::result::Result<T, PatternError>;

/// Why a pattern edit was ignored.
///
/// Event handlers never surface these; they are returned by the `try_*`
/// variants on [`PatternStore`](crate::store::PatternStore) and logged at
/// debug level by the absorbing handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// No channel is registered under this id
    #[error("Unknown channel {0}")]
    UnknownChannel(ChannelId),

    /// Step index outside the channel's row
    #[error("Step {step} out of range for channel {channel} ({len} steps)")]
    StepOutOfRange {
        channel: ChannelId,
        step: usize,
        len: usize,
    },
}
