//! Pattern storage and playback.
//!
//! - [`PatternStore`] - step grids, channel index and playback cursor
//! - [`SharedPatternStore`] - the handle event handlers share
//! - [`tick`] - one playback step, published on a bus

mod model;
mod shared;

pub use model::{PatternStore, TickOutcome, DEFAULT_STEPS_PER_CHANNEL};
pub use shared::{tick, SharedPatternStore};
