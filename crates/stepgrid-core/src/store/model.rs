//! The pattern store state machine.

use std::collections::HashMap;

use crate::error::{PatternError, Result};
use crate::pattern::{ChannelId, ChannelPattern};

/// Step grid width of a freshly constructed store.
pub const DEFAULT_STEPS_PER_CHANNEL: usize = 16;

/// Result of advancing the cursor by one tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickOutcome {
    /// Step the cursor landed on.
    pub step: usize,
    /// Channels whose flag is on at `step`, in pattern order.
    pub triggered: Vec<ChannelId>,
}

/// Per-channel step grids plus the shared playback cursor.
///
/// Invariants, holding after every method returns:
///
/// - every row has exactly `steps_per_channel` steps
/// - at most one row per channel id
/// - `channel_index` maps each id to its row's position
#[derive(Clone, Debug)]
pub struct PatternStore {
    /// Rows in insertion order.
    patterns: Vec<ChannelPattern>,
    /// Derived id -> position cache. Rebuilt on membership changes only.
    channel_index: HashMap<ChannelId, usize>,
    /// Width shared by every row.
    steps_per_channel: usize,
    /// Playback cursor. `None` until the first tick after construction or
    /// a reset.
    current_step: Option<usize>,
}

impl Default for PatternStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternStore {
    /// Create an empty, unshared store of the default width.
    pub fn new() -> Self {
        Self::with_steps(DEFAULT_STEPS_PER_CHANNEL)
    }

    /// Create an empty, unshared store of the given width.
    pub fn with_steps(steps_per_channel: usize) -> Self {
        Self {
            patterns: Vec::new(),
            channel_index: HashMap::new(),
            steps_per_channel,
            current_step: None,
        }
    }

    // === Index ===

    /// Recompute the id -> position cache from `patterns`.
    ///
    /// Always a full rebuild: a removal shifts every later position.
    fn rebuild_index(&mut self) {
        self.channel_index = self
            .patterns
            .iter()
            .enumerate()
            .map(|(position, pattern)| (pattern.channel_id, position))
            .collect();
    }

    fn position_of(&self, channel_id: ChannelId) -> Option<usize> {
        self.channel_index
            .get(&channel_id)
            .copied()
            .filter(|&position| position < self.patterns.len())
    }

    /// Find a channel's row. Also `None` if the index points past the end.
    pub fn lookup(&self, channel_id: ChannelId) -> Option<&ChannelPattern> {
        let position = self.position_of(channel_id)?;
        self.patterns.get(position)
    }

    /// Mutable variant of [`lookup`](Self::lookup).
    pub fn lookup_mut(&mut self, channel_id: ChannelId) -> Option<&mut ChannelPattern> {
        let position = self.position_of(channel_id)?;
        self.patterns.get_mut(position)
    }

    // === Width ===

    /// Resize every row to `desired` steps.
    ///
    /// Growing appends off steps. Shrinking discards the tail for good. The
    /// cursor is left alone even if it is now out of range; the next tick
    /// wraps it.
    pub fn set_steps_per_channel(&mut self, desired: usize) {
        if desired == self.steps_per_channel {
            return;
        }

        for pattern in &mut self.patterns {
            pattern.resize(desired);
        }

        log::debug!(
            "Steps per channel {} -> {} ({} channels)",
            self.steps_per_channel,
            desired,
            self.patterns.len()
        );
        self.steps_per_channel = desired;
    }

    // === Membership ===

    /// Register a channel with an all-off row.
    ///
    /// Re-adding an id that is already registered resets its row in place
    /// and keeps its position.
    pub fn add_channel(&mut self, channel_id: ChannelId) {
        let width = self.steps_per_channel;
        if let Some(pattern) = self.lookup_mut(channel_id) {
            log::debug!("Channel {} re-added, resetting its steps", channel_id);
            pattern.reset(width);
            return;
        }

        self.patterns.push(ChannelPattern::new(channel_id, width));
        self.rebuild_index();
        log::debug!("Channel {} added ({} channels)", channel_id, self.patterns.len());
    }

    /// Drop a channel. Unknown ids are ignored.
    pub fn remove_channel(&mut self, channel_id: ChannelId) {
        if let Err(e) = self.try_remove_channel(channel_id) {
            log::debug!("Ignored channel removal: {}", e);
        }
    }

    /// Drop a channel, reporting unknown ids.
    pub fn try_remove_channel(&mut self, channel_id: ChannelId) -> Result<()> {
        let position = self
            .position_of(channel_id)
            .ok_or(PatternError::UnknownChannel(channel_id))?;

        self.patterns.remove(position);
        self.rebuild_index();
        log::debug!("Channel {} removed ({} channels)", channel_id, self.patterns.len());
        Ok(())
    }

    // === Steps ===

    /// Set one step. Unknown channels and out-of-range steps are ignored.
    pub fn set_step(&mut self, channel_id: ChannelId, step: usize, on: bool) {
        if let Err(e) = self.try_set_step(channel_id, step, on) {
            log::debug!("Ignored step toggle: {}", e);
        }
    }

    /// Set one step, reporting why an edit could not be applied.
    pub fn try_set_step(&mut self, channel_id: ChannelId, step: usize, on: bool) -> Result<()> {
        let pattern = self
            .lookup_mut(channel_id)
            .ok_or(PatternError::UnknownChannel(channel_id))?;

        if pattern.set(step, on) {
            Ok(())
        } else {
            Err(PatternError::StepOutOfRange {
                channel: channel_id,
                step,
                len: pattern.steps.len(),
            })
        }
    }

    /// Switch every step of every channel off.
    pub fn clear_all(&mut self) {
        let width = self.steps_per_channel;
        for pattern in &mut self.patterns {
            pattern.reset(width);
        }
    }

    // === Playback ===

    /// Rewind so that the next tick plays step 0.
    pub fn reset_cursor(&mut self) {
        self.current_step = None;
    }

    /// Move the cursor one step forward, wrapping past the last step.
    ///
    /// A cursor left out of range by a shrink also wraps to 0 here.
    pub fn advance_cursor(&mut self) -> usize {
        let mut next = self.current_step.map_or(0, |step| step + 1);
        if next >= self.steps_per_channel {
            next = 0;
        }
        self.current_step = Some(next);
        next
    }

    /// Channels whose flag is on at `step`, in pattern order.
    pub fn active_channels(&self, step: usize) -> Vec<ChannelId> {
        self.patterns
            .iter()
            .filter(|pattern| pattern.is_active(step))
            .map(|pattern| pattern.channel_id)
            .collect()
    }

    /// Advance the cursor and select the channels that fire on the new step.
    ///
    /// This is the whole tick transition without publishing anything.
    pub fn advance(&mut self) -> TickOutcome {
        let step = self.advance_cursor();
        TickOutcome {
            step,
            triggered: self.active_channels(step),
        }
    }

    // === Accessors ===

    /// Width shared by every row.
    pub fn steps_per_channel(&self) -> usize {
        self.steps_per_channel
    }

    /// Current cursor, `None` before the first tick.
    pub fn current_step(&self) -> Option<usize> {
        self.current_step
    }

    pub fn channel_count(&self) -> usize {
        self.patterns.len()
    }

    /// Registered ids in pattern order.
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.patterns.iter().map(|p| p.channel_id).collect()
    }

    pub fn patterns(&self) -> &[ChannelPattern] {
        &self.patterns
    }

    /// Whether a step is on. Unknown channels and steps read as off.
    pub fn is_step_on(&self, channel_id: ChannelId, step: usize) -> bool {
        self.lookup(channel_id)
            .is_some_and(|pattern| pattern.is_active(step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ChannelId = ChannelId(1);
    const B: ChannelId = ChannelId(2);
    const C: ChannelId = ChannelId(3);

    fn assert_invariants(store: &PatternStore) {
        for pattern in store.patterns() {
            assert_eq!(pattern.steps.len(), store.steps_per_channel());
        }
        assert_eq!(store.channel_index.len(), store.patterns.len());
        for (id, position) in &store.channel_index {
            assert_eq!(store.patterns[*position].channel_id, *id);
            assert_eq!(store.lookup(*id).map(|p| p.channel_id), Some(*id));
        }
    }

    fn store_with(width: usize, ids: &[ChannelId]) -> PatternStore {
        let mut store = PatternStore::with_steps(width);
        for id in ids {
            store.add_channel(*id);
        }
        store
    }

    #[test]
    fn test_store_defaults() {
        let store = PatternStore::new();
        assert_eq!(store.steps_per_channel(), 16);
        assert_eq!(store.current_step(), None);
        assert_eq!(store.channel_count(), 0);
    }

    #[test]
    fn test_add_channel_appends_silent_row() {
        let store = store_with(16, &[A, B]);
        assert_eq!(store.channel_ids(), vec![A, B]);
        assert_eq!(store.lookup(B).map(|p| p.active_count()), Some(0));
        assert_invariants(&store);
    }

    #[test]
    fn test_readd_resets_only_that_channel() {
        let mut store = store_with(16, &[A, B]);
        store.set_step(A, 0, true);
        store.set_step(A, 5, true);
        store.set_step(B, 3, true);

        store.add_channel(A);

        assert_eq!(store.lookup(A).map(|p| p.steps.clone()), Some(vec![false; 16]));
        assert!(store.is_step_on(B, 3));
        assert_eq!(store.channel_ids(), vec![A, B]);
        assert_invariants(&store);
    }

    #[test]
    fn test_remove_channel_rebuilds_index() {
        let mut store = store_with(8, &[A, B, C]);
        store.set_step(C, 2, true);

        store.remove_channel(A);

        assert_eq!(store.channel_ids(), vec![B, C]);
        assert!(store.lookup(A).is_none());
        assert!(store.is_step_on(C, 2));
        assert_invariants(&store);
    }

    #[test]
    fn test_remove_then_add_different_channel() {
        let mut store = store_with(4, &[A, B]);
        store.set_step(B, 1, true);

        store.remove_channel(A);
        store.add_channel(C);

        assert_eq!(store.channel_ids(), vec![B, C]);
        assert!(store.lookup(A).is_none());
        assert!(store.is_step_on(B, 1));
        assert!(!store.is_step_on(C, 1));
        assert_eq!(store.channel_index.get(&C), Some(&1));
        assert_invariants(&store);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut store = store_with(4, &[A]);
        store.remove_channel(B);
        store.remove_channel(A);
        store.remove_channel(A);
        assert_eq!(store.channel_count(), 0);
        assert_eq!(store.try_remove_channel(A), Err(PatternError::UnknownChannel(A)));
        assert_invariants(&store);
    }

    #[test]
    fn test_lookup_guards_stale_index() {
        let mut store = store_with(4, &[A]);
        store.channel_index.insert(B, 5);
        assert!(store.lookup(B).is_none());
        assert!(store.lookup_mut(B).is_none());
        store.set_step(B, 0, true);
        assert_eq!(store.channel_count(), 1);
    }

    #[test]
    fn test_grow_preserves_existing_steps() {
        let mut store = store_with(16, &[A]);
        store.set_step(A, 0, true);
        store.set_step(A, 15, true);
        let before = store.lookup(A).map(|p| p.steps.clone()).unwrap_or_default();

        store.set_steps_per_channel(20);

        let after = store.lookup(A).map(|p| p.steps.clone()).unwrap_or_default();
        assert_eq!(after.len(), 20);
        assert_eq!(&after[..16], &before[..]);
        assert_eq!(&after[16..], &[false; 4]);
        assert_invariants(&store);
    }

    #[test]
    fn test_shrink_is_lossy() {
        let mut store = store_with(16, &[A, B]);
        for step in 0..16 {
            store.set_step(A, step, true);
        }
        store.set_step(B, 12, true);

        store.set_steps_per_channel(8);
        assert_invariants(&store);
        store.set_steps_per_channel(16);

        let a = store.lookup(A).map(|p| p.steps.clone()).unwrap_or_default();
        assert!(a[..8].iter().all(|&on| on));
        assert!(a[8..].iter().all(|&on| !on));
        assert!(!store.is_step_on(B, 12));
        assert_invariants(&store);
    }

    #[test]
    fn test_resize_leaves_cursor_alone() {
        let mut store = store_with(8, &[A]);
        for _ in 0..7 {
            store.advance_cursor();
        }
        assert_eq!(store.current_step(), Some(6));

        store.set_steps_per_channel(4);
        assert_eq!(store.current_step(), Some(6));

        assert_eq!(store.advance().step, 0);
    }

    #[test]
    fn test_set_steps_same_width_is_noop() {
        let mut store = store_with(4, &[A]);
        store.set_step(A, 3, true);
        store.set_steps_per_channel(4);
        assert!(store.is_step_on(A, 3));
    }

    #[test]
    fn test_new_channel_uses_current_width() {
        let mut store = store_with(4, &[A]);
        store.set_steps_per_channel(12);
        store.add_channel(B);
        assert_eq!(store.lookup(B).map(|p| p.steps.len()), Some(12));
        assert_invariants(&store);
    }

    #[test]
    fn test_set_step_ignores_bad_input() {
        let mut store = store_with(4, &[A]);

        store.set_step(B, 0, true);
        store.set_step(A, 4, true);

        assert_eq!(store.lookup(A).map(|p| p.steps.len()), Some(4));
        assert_eq!(store.lookup(A).map(|p| p.active_count()), Some(0));
        assert_eq!(
            store.try_set_step(A, 9, true),
            Err(PatternError::StepOutOfRange { channel: A, step: 9, len: 4 })
        );
        assert_eq!(store.try_set_step(B, 0, true), Err(PatternError::UnknownChannel(B)));
    }

    #[test]
    fn test_set_step_on_and_off() {
        let mut store = store_with(4, &[A]);
        store.set_step(A, 2, true);
        assert!(store.is_step_on(A, 2));
        store.set_step(A, 2, false);
        assert!(!store.is_step_on(A, 2));
    }

    #[test]
    fn test_clear_all_is_idempotent() {
        let mut store = store_with(4, &[A, B]);
        store.set_step(A, 0, true);
        store.set_step(B, 3, true);
        store.advance_cursor();

        store.clear_all();
        let once: Vec<_> = store.patterns().to_vec();
        store.clear_all();

        assert_eq!(store.patterns(), &once[..]);
        assert!(once.iter().all(|p| p.active_count() == 0));
        assert_eq!(store.channel_ids(), vec![A, B]);
        assert_eq!(store.current_step(), Some(0));
        assert_invariants(&store);
    }

    #[test]
    fn test_tick_wraparound() {
        let mut store = store_with(4, &[A]);
        for expected in 0..4 {
            assert_eq!(store.advance().step, expected);
        }
        assert_eq!(store.current_step(), Some(3));

        assert_eq!(store.advance().step, 0);
        assert_eq!(store.current_step(), Some(0));
    }

    #[test]
    fn test_tick_trigger_selection() {
        let mut store = store_with(2, &[A, B]);
        store.set_step(A, 0, true);
        store.set_step(B, 1, true);

        assert_eq!(store.advance(), TickOutcome { step: 0, triggered: vec![A] });
        assert_eq!(store.advance(), TickOutcome { step: 1, triggered: vec![B] });
    }

    #[test]
    fn test_triggers_follow_pattern_order() {
        let mut store = store_with(1, &[C, A, B]);
        store.set_step(A, 0, true);
        store.set_step(B, 0, true);
        store.set_step(C, 0, true);

        assert_eq!(store.advance().triggered, vec![C, A, B]);
    }

    #[test]
    fn test_reset_cursor_lands_on_zero() {
        let mut store = store_with(8, &[A]);
        for _ in 0..5 {
            store.advance();
        }
        store.reset_cursor();
        assert_eq!(store.current_step(), None);
        assert_eq!(store.advance().step, 0);
    }

    #[test]
    fn test_zero_width_ticks_harmlessly() {
        let mut store = store_with(4, &[A]);
        store.set_step(A, 0, true);
        store.set_steps_per_channel(0);
        assert_invariants(&store);

        for _ in 0..3 {
            assert_eq!(store.advance(), TickOutcome { step: 0, triggered: vec![] });
        }
    }

    #[test]
    fn test_invariants_after_mixed_operations() {
        let mut store = PatternStore::new();
        store.add_channel(A);
        store.add_channel(B);
        store.set_steps_per_channel(5);
        store.add_channel(C);
        store.set_step(C, 4, true);
        store.remove_channel(B);
        store.set_steps_per_channel(3);
        store.add_channel(B);
        store.add_channel(A);
        store.clear_all();
        store.set_steps_per_channel(7);
        store.remove_channel(C);
        assert_eq!(store.channel_ids(), vec![A, B]);
        assert_invariants(&store);
    }
}
