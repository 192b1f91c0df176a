//! stepgrid core - pattern storage and tick-driven playback for a step sequencer.
//!
//! This crate provides:
//!
//! - **Patterns** - per-channel rows of on/off steps
//! - **Events** - the events the store consumes and publishes
//! - **Bus** - the publish/subscribe capability the store is wired to
//! - **Store** - the pattern store, its shared instance and event wiring
//!
//! # Architecture
//!
//! The store never returns anything to the outside world. Every behaviour is
//! an event handler invoked synchronously by the bus; results go back out as
//! [`SequencerEvent::StepTick`] and per-channel
//! [`SequencerEvent::ChannelTriggered`] notifications. Invalid input (unknown
//! channels, out-of-range steps) is absorbed, never reported to the publisher.
//!
//! ```
//! use stepgrid_core::{ChannelId, EventBus, LocalBus, PatternStore, SequencerEvent, Topic};
//!
//! let bus = LocalBus::new();
//! let store = PatternStore::shared();
//! PatternStore::attach(&store, &bus);
//!
//! let kick = ChannelId(1);
//! bus.subscribe(Topic::ChannelTriggered(kick), |_| println!("kick!"));
//!
//! bus.publish(SequencerEvent::ChannelAdded(kick));
//! bus.publish(SequencerEvent::UiStepToggled { channel: kick, step: 0, on: true });
//! bus.publish(SequencerEvent::TempoStep);
//! ```

pub mod bus;
pub mod error;
pub mod events;
pub mod pattern;
pub mod store;

pub use bus::{forward_notifications, EventBus, Handler, LocalBus, SubscriptionId};
pub use error::{PatternError, Result};
pub use events::{SequencerEvent, Topic};
pub use pattern::{ChannelId, ChannelPattern};
pub use store::{tick, PatternStore, SharedPatternStore, TickOutcome, DEFAULT_STEPS_PER_CHANNEL};
