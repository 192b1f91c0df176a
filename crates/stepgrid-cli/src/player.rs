//! Headless playback driver.
//!
//! Wires the shared pattern store to a [`LocalBus`], replays a session's
//! setup events and then turns clock pulses into `tempo-step` events. What
//! the store publishes back is collected per step and rendered as one line
//! of text.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use anyhow::Result;
use stepgrid_core::{
    ChannelId, EventBus, LocalBus, PatternStore, SequencerEvent, SharedPatternStore, Topic,
};

use crate::clock::StepClock;
use crate::config::Config;

/// What happened on one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    /// Cursor position announced by the store.
    pub step: usize,
    /// Channels that fired, in the order the store announced them. This
    /// includes channels added through the bus after the session loaded.
    pub triggered: Vec<ChannelId>,
}

pub struct Player {
    bus: LocalBus,
    store: SharedPatternStore,
    names: HashMap<ChannelId, String>,
    last_step: Rc<Cell<Option<usize>>>,
    hits: Rc<RefCell<Vec<ChannelId>>>,
}

impl Player {
    /// Attach the shared store to a fresh bus and load `config` into it.
    ///
    /// The store is the thread's shared instance. Channels left over from an
    /// earlier player on the same thread are removed and the cursor is
    /// rewound before the session is replayed.
    pub fn new(config: &Config) -> Result<Self> {
        let bus = LocalBus::new();
        bus.trace_events();

        let store = PatternStore::shared();
        {
            let mut state = store.borrow_mut();
            for id in state.channel_ids() {
                state.remove_channel(id);
            }
            state.reset_cursor();
        }
        PatternStore::attach(&store, &bus);

        let last_step = Rc::new(Cell::new(None));
        let cursor = last_step.clone();
        bus.subscribe(Topic::StepTick, move |event| {
            if let SequencerEvent::StepTick(step) = event {
                cursor.set(Some(*step));
            }
        });

        let hits = Rc::new(RefCell::new(Vec::new()));
        let sink = hits.clone();
        bus.subscribe_all(move |event| {
            if let SequencerEvent::ChannelTriggered(id) = event {
                sink.borrow_mut().push(*id);
            }
        });

        let names = config
            .channels
            .iter()
            .map(|channel| (channel.channel_id(), channel.display_name()))
            .collect();

        for event in config.setup_events()? {
            bus.publish(event);
        }

        log::info!(
            "Session loaded: {} channels, {} steps",
            config.channels.len(),
            store.borrow().steps_per_channel()
        );

        Ok(Self {
            bus,
            store,
            names,
            last_step,
            hits,
        })
    }

    /// Publish one tempo pulse and collect the store's answer.
    pub fn step(&self) -> StepReport {
        self.bus.publish(SequencerEvent::TempoStep);

        StepReport {
            step: self.last_step.get().unwrap_or(0),
            triggered: self.hits.borrow_mut().drain(..).collect(),
        }
    }

    /// Render a step as `" 4 ....>........... kick hat"`.
    pub fn render(&self, report: &StepReport) -> String {
        let width = self.store.borrow().steps_per_channel();
        let cursor: String = (0..width)
            .map(|i| if i == report.step { '>' } else { '.' })
            .collect();

        let names: Vec<String> = report
            .triggered
            .iter()
            .map(|id| {
                self.names
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| format!("ch{}", id))
            })
            .collect();

        format!("{:>3} {} {}", report.step, cursor, names.join(" "))
            .trim_end()
            .to_string()
    }

    /// Play `steps` steps at the clock's tempo, writing one line per step.
    pub fn run<W: Write>(&self, clock: &StepClock, steps: u64, out: &mut W) -> Result<()> {
        log::info!(
            "Playing {} steps at {:.1} BPM ({:?} per step)",
            steps,
            clock.bpm(),
            clock.interval()
        );

        let pulses = clock.start();
        for _ in 0..steps {
            pulses.recv()?;
            let report = self.step();
            writeln!(out, "{}", self.render(&report))?;
        }
        out.flush()?;

        self.bus.publish(SequencerEvent::UiTransportReset);
        log::info!("Playback finished");
        Ok(())
    }
}
