//! Discrete-event emitters.
//!
//! A discrete-event output owns one [`EventEmitter`]; every connection to it
//! adds a subscriber. Events are `(time, gate)` pairs delivered in emission
//! order, where `time` is an absolute engine clock time.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Receiving callback of a discrete-event input: `(time, gate)`.
pub type Notify = Rc<dyn Fn(f64, bool)>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(u64, Notify)>,
}

/// One emitter, many subscribers.
///
/// Cloning an emitter yields another handle to the same subscriber list.
#[derive(Clone, Default)]
pub struct EventEmitter {
    subscribers: Rc<RefCell<Subscribers>>,
}

impl EventEmitter {
    /// Creates an emitter with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber. The returned [`Subscription`] removes it again.
    pub fn subscribe(&self, notify: Notify) -> Subscription {
        let mut subs = self.subscribers.borrow_mut();
        subs.next_id += 1;
        let id = subs.next_id;
        subs.entries.push((id, notify));
        Subscription {
            subscribers: Rc::downgrade(&self.subscribers),
            id: Cell::new(Some(id)),
        }
    }

    /// Delivers an event to every current subscriber.
    ///
    /// The subscriber list is snapshotted first: subscribers added or removed
    /// by a callback take effect from the next emission on, and no borrow is
    /// held while callbacks run.
    pub fn emit(&self, time: f64, gate: bool) {
        let snapshot: Vec<Notify> = self
            .subscribers
            .borrow()
            .entries
            .iter()
            .map(|(_, notify)| Rc::clone(notify))
            .collect();
        for notify in snapshot {
            notify(time, gate);
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().entries.len()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle that removes one subscriber from an [`EventEmitter`].
pub struct Subscription {
    subscribers: Weak<RefCell<Subscribers>>,
    id: Cell<Option<u64>>,
}

impl Subscription {
    /// Removes the subscriber. Calling it again is a no-op, as is calling it
    /// after the emitter has been dropped.
    pub fn cancel(&self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers
                .borrow_mut()
                .entries
                .retain(|(entry_id, _)| *entry_id != id);
        }
    }

    /// Returns true until [`cancel`](Self::cancel) has been called.
    pub fn is_active(&self) -> bool {
        self.id.get().is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id.get())
            .finish()
    }
}
