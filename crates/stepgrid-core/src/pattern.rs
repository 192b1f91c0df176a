//! Per-channel step grids.
//!
//! A [`ChannelPattern`] is one instrument's loop: a fixed-length row of
//! on/off flags, indexed by step. The length is owned by the store, not by
//! the pattern, so every row in a store always has the same width.

use std::fmt;

/// Opaque, caller-supplied channel identifier.
///
/// Ids are never generated by the store. They only need to be unique among
/// the channels currently registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub u32);

impl ChannelId {
    /// Create a channel id from its raw value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw id value.
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for ChannelId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One instrument's step grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelPattern {
    /// Stable id of the channel this row belongs to.
    pub channel_id: ChannelId,
    /// Step flags. `steps[i]` means "fire when the cursor is at step `i`".
    pub steps: Vec<bool>,
}

impl ChannelPattern {
    /// Create a pattern with `width` steps, all off.
    pub fn new(channel_id: ChannelId, width: usize) -> Self {
        Self {
            channel_id,
            steps: vec![false; width],
        }
    }

    /// Replace the steps with a fresh all-off row of `width` steps.
    pub fn reset(&mut self, width: usize) {
        self.steps = vec![false; width];
    }

    /// Grow or truncate to `width` steps.
    ///
    /// New steps are off. Truncated steps are discarded.
    pub fn resize(&mut self, width: usize) {
        self.steps.resize(width, false);
    }

    /// Whether the step at `step` is on. Out-of-range steps read as off.
    pub fn is_active(&self, step: usize) -> bool {
        self.steps.get(step).copied().unwrap_or(false)
    }

    /// Set a step. Returns `false` without touching the row if `step` is out
    /// of range; the row never grows here.
    pub fn set(&mut self, step: usize, on: bool) -> bool {
        match self.steps.get_mut(step) {
            Some(slot) => {
                *slot = on;
                true
            }
            None => false,
        }
    }

    /// Number of steps that are on.
    pub fn active_count(&self) -> usize {
        self.steps.iter().filter(|&&on| on).count()
    }
}
