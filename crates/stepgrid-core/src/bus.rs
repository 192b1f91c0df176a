//! Publish/subscribe plumbing.
//!
//! The store only needs two capabilities from its transport: subscribe a
//! handler to a [`Topic`] and publish a [`SequencerEvent`]. [`EventBus`] is
//! that capability. Implementations must honour this contract:
//!
//! - `publish` is synchronous. Every handler subscribed to the event's topic
//!   has run to completion before `publish` returns.
//! - Handlers of one topic run in subscription order.
//! - Handlers may publish or subscribe from inside a handler (reentrancy).
//!   Ordering of such nested events relative to the remaining handlers of the
//!   outer event is the caller's concern.
//!
//! [`LocalBus`] is the in-process implementation. [`forward_notifications`]
//! bridges the store's outbound notifications to another thread.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crossbeam_channel::Sender;

use crate::events::{SequencerEvent, Topic};

/// A subscribed event handler.
pub type Handler = Rc<dyn Fn(&SequencerEvent)>;

/// Token returned by a subscription, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The publish/subscribe capability consumed by the pattern store.
pub trait EventBus {
    /// Register a handler for `topic`.
    fn subscribe_handler(&self, topic: Topic, handler: Handler) -> SubscriptionId;

    /// Remove a subscription. Returns `false` if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Deliver `event` to every subscriber of its topic.
    fn publish(&self, event: SequencerEvent);

    /// Register a closure for `topic`.
    fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&SequencerEvent) + 'static,
        Self: Sized,
    {
        self.subscribe_handler(topic, Rc::new(handler))
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    topics: HashMap<Topic, Vec<(SubscriptionId, Handler)>>,
    observers: Vec<(SubscriptionId, Handler)>,
}

impl Registry {
    fn allocate(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Single-threaded, synchronous in-process bus.
///
/// Cloning yields another handle to the same subscriber registry.
#[derive(Clone, Default)]
pub struct LocalBus {
    registry: Rc<RefCell<Registry>>,
}

impl LocalBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler that sees every published event, regardless of
    /// topic. Observers run before the topic's subscribers.
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&SequencerEvent) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = registry.allocate();
        registry.observers.push((id, Rc::new(handler)));
        id
    }

    /// Number of handlers subscribed to `topic` (observers excluded).
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.registry
            .borrow()
            .topics
            .get(&topic)
            .map_or(0, |handlers| handlers.len())
    }

    /// Log every published event at `trace` level.
    pub fn trace_events(&self) -> SubscriptionId {
        self.subscribe_all(|event| log::trace!("[bus] {} {:?}", event.topic(), event))
    }
}

impl EventBus for LocalBus {
    fn subscribe_handler(&self, topic: Topic, handler: Handler) -> SubscriptionId {
        let mut registry = self.registry.borrow_mut();
        let id = registry.allocate();
        registry.topics.entry(topic).or_default().push((id, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.borrow_mut();

        let before = registry.observers.len();
        registry.observers.retain(|(sub, _)| *sub != id);
        if registry.observers.len() != before {
            return true;
        }

        let mut removed = false;
        registry.topics.retain(|_, handlers| {
            let len = handlers.len();
            handlers.retain(|(sub, _)| *sub != id);
            removed |= handlers.len() != len;
            !handlers.is_empty()
        });
        removed
    }

    fn publish(&self, event: SequencerEvent) {
        // Snapshot so handlers can subscribe or publish without a borrow conflict.
        let (observers, handlers): (Vec<Handler>, Vec<Handler>) = {
            let registry = self.registry.borrow();
            let observers = registry.observers.iter().map(|(_, h)| h.clone()).collect();
            let handlers = registry
                .topics
                .get(&event.topic())
                .map(|hs| hs.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default();
            (observers, handlers)
        };

        for observer in &observers {
            observer(&event);
        }
        for handler in &handlers {
            handler(&event);
        }
    }
}

impl std::fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("LocalBus")
            .field("topics", &registry.topics.len())
            .field("observers", &registry.observers.len())
            .finish_non_exhaustive()
    }
}

/// Forward the store's outbound notifications ([`SequencerEvent::StepTick`]
/// and [`SequencerEvent::ChannelTriggered`]) into a crossbeam channel.
///
/// The receiving end may live on another thread. Once the receiver is
/// dropped, forwarding stops silently after a single warning.
pub fn forward_notifications(bus: &LocalBus, tx: Sender<SequencerEvent>) -> SubscriptionId {
    let disconnected = Cell::new(false);
    bus.subscribe_all(move |event| {
        if !event.is_notification() || disconnected.get() {
            return;
        }
        if tx.send(event.clone()).is_err() {
            log::warn!("Notification receiver disconnected, no longer forwarding");
            disconnected.set(true);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::ChannelId;

    fn recorder(bus: &LocalBus, topic: Topic, log: &Rc<RefCell<Vec<String>>>, tag: &str) {
        let log = log.clone();
        let tag = tag.to_string();
        bus.subscribe(topic, move |event| {
            log.borrow_mut().push(format!("{}:{}", tag, event.topic()));
        });
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let bus = LocalBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        recorder(&bus, Topic::TempoStep, &log, "a");
        recorder(&bus, Topic::TempoStep, &log, "b");
        recorder(&bus, Topic::StepTick, &log, "c");

        bus.publish(SequencerEvent::TempoStep);

        assert_eq!(*log.borrow(), vec!["a:tempo-step", "b:tempo-step"]);
    }

    #[test]
    fn test_per_channel_topics_are_isolated() {
        let bus = LocalBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        recorder(&bus, Topic::ChannelTriggered(ChannelId(1)), &log, "one");
        recorder(&bus, Topic::ChannelTriggered(ChannelId(2)), &log, "two");

        bus.publish(SequencerEvent::ChannelTriggered(ChannelId(2)));

        assert_eq!(*log.borrow(), vec!["two:channel-2-triggered"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = LocalBus::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let id = bus.subscribe(Topic::TempoStep, move |_| counter.set(counter.get() + 1));

        bus.publish(SequencerEvent::TempoStep);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(SequencerEvent::TempoStep);

        assert_eq!(hits.get(), 1);
        assert_eq!(bus.subscriber_count(Topic::TempoStep), 0);
    }

    #[test]
    fn test_reentrant_publish_is_delivered() {
        let bus = LocalBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let inner = bus.clone();
        bus.subscribe(Topic::TempoStep, move |_| {
            inner.publish(SequencerEvent::StepTick(0));
        });
        recorder(&bus, Topic::StepTick, &log, "tick");

        bus.publish(SequencerEvent::TempoStep);

        assert_eq!(*log.borrow(), vec!["tick:step-tick"]);
    }

    #[test]
    fn test_observers_see_everything() {
        let bus = LocalBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe_all(move |event| sink.borrow_mut().push(event.clone()));

        bus.publish(SequencerEvent::UiPatternClear);
        bus.publish(SequencerEvent::StepTick(3));

        assert_eq!(
            *seen.borrow(),
            vec![SequencerEvent::UiPatternClear, SequencerEvent::StepTick(3)]
        );
    }

    #[test]
    fn test_forward_notifications_only() {
        let bus = LocalBus::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        forward_notifications(&bus, tx);

        bus.publish(SequencerEvent::TempoStep);
        bus.publish(SequencerEvent::StepTick(1));
        bus.publish(SequencerEvent::ChannelTriggered(ChannelId(4)));

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                SequencerEvent::StepTick(1),
                SequencerEvent::ChannelTriggered(ChannelId(4)),
            ]
        );
    }

    #[test]
    fn test_forward_survives_dropped_receiver() {
        let bus = LocalBus::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        forward_notifications(&bus, tx);
        drop(rx);

        bus.publish(SequencerEvent::StepTick(0));
        bus.publish(SequencerEvent::StepTick(1));
    }
}
