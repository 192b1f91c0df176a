//! Events exchanged between the pattern store and the rest of the sequencer.
//!
//! Every event carries its own payload. Its [`Topic`] is what subscribers
//! register for:
//!
//! - Consumed by the store: [`SequencerEvent::StepsPerChannelUpdate`],
//!   [`SequencerEvent::ChannelAdded`], [`SequencerEvent::ChannelRemoved`],
//!   [`SequencerEvent::UiStepToggled`], [`SequencerEvent::UiPatternClear`],
//!   [`SequencerEvent::UiTransportReset`], [`SequencerEvent::TempoStep`]
//! - Published by the store: [`SequencerEvent::StepTick`] and the
//!   per-channel [`SequencerEvent::ChannelTriggered`]

use std::fmt;

use crate::pattern::ChannelId;

/// Name of an event stream on the bus.
///
/// Triggers are routed per channel, so a subscriber can listen to exactly
/// one channel's hits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The step grid width changed.
    StepsPerChannelUpdate,
    /// A channel was created upstream.
    ChannelAdded,
    /// A channel was deleted upstream.
    ChannelRemoved,
    /// A step was switched on or off in the UI.
    UiStepToggled,
    /// The UI asked to clear every step.
    UiPatternClear,
    /// The UI rewound the transport.
    UiTransportReset,
    /// One timing pulse from the tempo clock.
    TempoStep,
    /// The step cursor moved.
    StepTick,
    /// A specific channel fires on the current step.
    ChannelTriggered(ChannelId),
}

impl Topic {
    /// Whether the store publishes this topic (as opposed to consuming it).
    pub fn is_notification(&self) -> bool {
        matches!(self, Topic::StepTick | Topic::ChannelTriggered(_))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::StepsPerChannelUpdate => f.write_str("steps-per-channel-update"),
            Topic::ChannelAdded => f.write_str("channel-added"),
            Topic::ChannelRemoved => f.write_str("channel-removed"),
            Topic::UiStepToggled => f.write_str("ui-step-toggled"),
            Topic::UiPatternClear => f.write_str("ui-pattern-clear"),
            Topic::UiTransportReset => f.write_str("ui-transport-reset"),
            Topic::TempoStep => f.write_str("tempo-step"),
            Topic::StepTick => f.write_str("step-tick"),
            Topic::ChannelTriggered(id) => write!(f, "channel-{}-triggered", id),
        }
    }
}

/// An event with its payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SequencerEvent {
    // === Consumed ===
    /// Resize every channel to this many steps.
    StepsPerChannelUpdate(usize),

    /// Register a channel, or reset it if it already exists.
    ChannelAdded(ChannelId),

    /// Drop a channel.
    ChannelRemoved(ChannelId),

    /// Set one step of one channel.
    UiStepToggled {
        channel: ChannelId,
        step: usize,
        on: bool,
    },

    /// Switch every step of every channel off.
    UiPatternClear,

    /// Rewind the cursor so the next tick plays step 0.
    UiTransportReset,

    /// Advance playback by one step.
    TempoStep,

    // === Published ===
    /// The cursor now points at this step.
    StepTick(usize),

    /// This channel fires on the current step.
    ChannelTriggered(ChannelId),
}

impl SequencerEvent {
    /// The topic this event is delivered on.
    pub fn topic(&self) -> Topic {
        match self {
            SequencerEvent::StepsPerChannelUpdate(_) => Topic::StepsPerChannelUpdate,
            SequencerEvent::ChannelAdded(_) => Topic::ChannelAdded,
            SequencerEvent::ChannelRemoved(_) => Topic::ChannelRemoved,
            SequencerEvent::UiStepToggled { .. } => Topic::UiStepToggled,
            SequencerEvent::UiPatternClear => Topic::UiPatternClear,
            SequencerEvent::UiTransportReset => Topic::UiTransportReset,
            SequencerEvent::TempoStep => Topic::TempoStep,
            SequencerEvent::StepTick(_) => Topic::StepTick,
            SequencerEvent::ChannelTriggered(id) => Topic::ChannelTriggered(*id),
        }
    }

    /// Whether this is an outbound notification published by the store.
    pub fn is_notification(&self) -> bool {
        self.topic().is_notification()
    }
}
