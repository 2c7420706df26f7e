use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::{Event, EventSource};

/// Creates a connected injector/queue pair.
///
/// The queue end is an [`EventSource`] for the harness's input thread; the
/// injector end can be cloned into any thread that wants to feed it (tests,
/// demos, or a platform layer translating native events).
#[must_use]
pub fn channel() -> (EventInjector, EventQueue) {
    let (tx, rx) = unbounded();
    (EventInjector { tx }, EventQueue { rx })
}

/// Sending half of an event queue.
#[derive(Clone)]
pub struct EventInjector {
    tx: Sender<Event>,
}

impl EventInjector {
    /// Queues an event. Returns false if the receiving half is gone.
    pub fn push(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Receiving half of an event queue.
pub struct EventQueue {
    rx: Receiver<Event>,
}

impl EventSource for EventQueue {
    fn poll_event(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}
