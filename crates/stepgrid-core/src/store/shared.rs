//! The shared store instance and its event wiring.
//!
//! The store is single-threaded, so the shared instance lives in
//! thread-local storage: the thread that drives the sequencer owns it for
//! the lifetime of the process. Handlers get their store handle injected by
//! [`PatternStore::attach`] instead of reaching for the global themselves.

use std::cell::RefCell;
use std::rc::Rc;

use super::model::{PatternStore, TickOutcome};
use crate::bus::{EventBus, SubscriptionId};
use crate::events::{SequencerEvent, Topic};

/// Handle to a pattern store shared between event handlers.
pub type SharedPatternStore = Rc<RefCell<PatternStore>>;

thread_local! {
    static SHARED_STORE: RefCell<Option<SharedPatternStore>> = const { RefCell::new(None) };
}

impl PatternStore {
    /// Get the shared store, creating it on first use.
    ///
    /// Every call returns a handle to the same instance, no matter how many
    /// handles were created or dropped before.
    pub fn shared() -> SharedPatternStore {
        SHARED_STORE.with(|slot| {
            slot.borrow_mut()
                .get_or_insert_with(|| {
                    log::debug!("Creating shared pattern store");
                    Rc::new(RefCell::new(PatternStore::new()))
                })
                .clone()
        })
    }

    /// Wrap an unshared store so it can be attached to a bus.
    pub fn into_shared(self) -> SharedPatternStore {
        Rc::new(RefCell::new(self))
    }

    /// Subscribe `store` to every event it consumes on `bus`.
    ///
    /// Each handler borrows the store only for its own state change and
    /// releases it before anything is published, so subscribers to the
    /// store's notifications may publish consumed events synchronously.
    pub fn attach<B>(store: &SharedPatternStore, bus: &B) -> Vec<SubscriptionId>
    where
        B: EventBus + Clone + 'static,
    {
        let mut subscriptions = vec![
            handle(bus, store, Topic::StepsPerChannelUpdate, |store, event| {
                if let SequencerEvent::StepsPerChannelUpdate(count) = event {
                    store.set_steps_per_channel(*count);
                }
            }),
            handle(bus, store, Topic::ChannelAdded, |store, event| {
                if let SequencerEvent::ChannelAdded(channel) = event {
                    store.add_channel(*channel);
                }
            }),
            handle(bus, store, Topic::ChannelRemoved, |store, event| {
                if let SequencerEvent::ChannelRemoved(channel) = event {
                    store.remove_channel(*channel);
                }
            }),
            handle(bus, store, Topic::UiStepToggled, |store, event| {
                if let SequencerEvent::UiStepToggled { channel, step, on } = event {
                    store.set_step(*channel, *step, *on);
                }
            }),
            handle(bus, store, Topic::UiPatternClear, |store, _| store.clear_all()),
            handle(bus, store, Topic::UiTransportReset, |store, _| store.reset_cursor()),
        ];

        let ticking = store.clone();
        let publisher = bus.clone();
        subscriptions.push(bus.subscribe(Topic::TempoStep, move |_| {
            tick(&ticking, &publisher);
        }));

        log::debug!("Pattern store attached ({} handlers)", subscriptions.len());
        subscriptions
    }
}

fn handle<B, F>(bus: &B, store: &SharedPatternStore, topic: Topic, apply: F) -> SubscriptionId
where
    B: EventBus,
    F: Fn(&mut PatternStore, &SequencerEvent) + 'static,
{
    let store = store.clone();
    bus.subscribe(topic, move |event| apply(&mut store.borrow_mut(), event))
}

/// Advance playback by one step and publish the result on `bus`.
///
/// Publishes [`SequencerEvent::StepTick`] first, then one
/// [`SequencerEvent::ChannelTriggered`] per active channel in pattern order.
/// The active channels are selected after the step tick has been delivered,
/// and before the first trigger goes out. Changes made by trigger
/// subscribers therefore show up on the next tick.
pub fn tick<B: EventBus>(store: &SharedPatternStore, bus: &B) -> TickOutcome {
    let step = store.borrow_mut().advance_cursor();
    bus.publish(SequencerEvent::StepTick(step));

    let triggered = store.borrow().active_channels(step);
    for channel in &triggered {
        bus.publish(SequencerEvent::ChannelTriggered(*channel));
    }

    TickOutcome { step, triggered }
}
