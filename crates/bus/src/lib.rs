//! Event plumbing between a capture session and whoever assembles the
//! recording timeline.

use capture::{FullSnapshot, IncrementalRecord, Record, RecordSink};
use core_types::{Timestamp, now_millis};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, Sender, channel};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    FullCapture(FullSnapshot),
    IncrementalCapture(IncrementalRecord),
}

/// A record stamped with its emission time.
///
/// Serializes as `{"type": ..., "data": ..., "timestamp": ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecorderEvent {
    #[serde(flatten)]
    pub payload: EventPayload,
    pub timestamp: Timestamp,
}

impl RecorderEvent {
    pub fn new(record: Record, timestamp: Timestamp) -> Self {
        let payload = match record {
            Record::Full(snapshot) => EventPayload::FullCapture(snapshot),
            Record::Incremental(record) => EventPayload::IncrementalCapture(record),
        };
        Self { payload, timestamp }
    }

    pub fn is_full(&self) -> bool {
        matches!(self.payload, EventPayload::FullCapture(_))
    }
}

/// Sink forwarding records over a channel, stamped with the wall clock.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: Sender<RecorderEvent>,
}

impl EventSender {
    pub fn new(tx: Sender<RecorderEvent>) -> Self {
        Self { tx }
    }
}

impl RecordSink for EventSender {
    fn emit(&mut self, record: Record) {
        // a receiver that hung up just stops listening
        let _ = self.tx.send(RecorderEvent::new(record, now_millis()));
    }
}

pub struct Bus {
    pub evt_tx: Sender<RecorderEvent>,
    pub evt_rx: Receiver<RecorderEvent>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    pub fn new() -> Self {
        let (evt_tx, evt_rx) = channel();
        Self { evt_tx, evt_rx }
    }

    /// A sink for one capture session; sessions can share the bus.
    pub fn sender(&self) -> EventSender {
        EventSender::new(self.evt_tx.clone())
    }

    /// Events received so far, without blocking.
    pub fn drain(&self) -> Vec<RecorderEvent> {
        self.evt_rx.try_iter().collect()
    }
}

/// In-memory timeline. Clones share the same event list.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    events: Rc<RefCell<Vec<RecorderEvent>>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecorderEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Events from the most recent full capture onwards: enough to rebuild
    /// the current state.
    pub fn since_last_full(&self) -> Vec<RecorderEvent> {
        let events = self.events.borrow();
        let start = events.iter().rposition(RecorderEvent::is_full).unwrap_or(0);
        events[start..].to_vec()
    }
}

impl RecordSink for Timeline {
    fn emit(&mut self, record: Record) {
        self.events
            .borrow_mut()
            .push(RecorderEvent::new(record, now_millis()));
    }
}
