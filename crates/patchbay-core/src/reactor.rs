//! Cooperative poll driver.
//!
//! The host event loop owns one [`Reactor`]. Units that need timed events
//! obtain a [`LookaheadScheduler`] from it; the host then calls
//! [`turn()`](Reactor::turn) whenever [`next_due()`](Reactor::next_due) says a
//! poll is pending. Offline hosts use [`run_offline()`](Reactor::run_offline),
//! which advances an [`OfflineEngine`] clock from poll to poll.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::engine::{AudioEngine, OfflineEngine};
use crate::scheduler::{LookaheadScheduler, SchedulerConfig, SchedulerInner};

struct ReactorInner {
    engine: Rc<dyn AudioEngine>,
    config: SchedulerConfig,
    schedulers: RefCell<Vec<Weak<SchedulerInner>>>,
    horizon: Cell<Option<f64>>,
}

/// Drives every scheduler created through it against one engine clock.
///
/// Cloning yields another handle to the same reactor.
#[derive(Clone)]
pub struct Reactor {
    inner: Rc<ReactorInner>,
}

impl Reactor {
    /// Creates a reactor reading `engine`'s clock.
    pub fn new(engine: Rc<dyn AudioEngine>, config: SchedulerConfig) -> Self {
        Self {
            inner: Rc::new(ReactorInner {
                engine,
                config,
                schedulers: RefCell::new(Vec::new()),
                horizon: Cell::new(None),
            }),
        }
    }

    /// Engine whose clock drives the polls.
    pub fn engine(&self) -> &Rc<dyn AudioEngine> {
        &self.inner.engine
    }

    /// Timing parameters handed to new schedulers.
    pub fn config(&self) -> SchedulerConfig {
        self.inner.config
    }

    /// Creates a stopped scheduler driven by this reactor.
    pub fn scheduler(&self) -> LookaheadScheduler {
        let scheduler = LookaheadScheduler::new(Rc::clone(&self.inner.engine), self.inner.config);
        self.register(&scheduler);
        scheduler
    }

    /// Adds an externally built scheduler. The reactor holds it weakly.
    pub fn register(&self, scheduler: &LookaheadScheduler) {
        self.inner
            .schedulers
            .borrow_mut()
            .push(Rc::downgrade(&scheduler.inner));
    }

    fn live(&self) -> Vec<LookaheadScheduler> {
        let mut schedulers = self.inner.schedulers.borrow_mut();
        schedulers.retain(|weak| weak.strong_count() > 0);
        schedulers
            .iter()
            .filter_map(Weak::upgrade)
            .map(|inner| LookaheadScheduler { inner })
            .collect()
    }

    /// Polls every scheduler that is due now. Returns the number of polls.
    ///
    /// Works on a snapshot: schedulers created by a callback during this turn
    /// are first polled on the next turn.
    pub fn turn(&self) -> usize {
        let horizon = self.inner.horizon.get();
        self.live()
            .iter()
            .filter(|scheduler| scheduler.is_due())
            .filter(|scheduler| {
                scheduler.set_horizon(horizon);
                scheduler.poll()
            })
            .count()
    }

    /// Earliest clock time at which a running scheduler wants a poll.
    pub fn next_due(&self) -> Option<f64> {
        self.live()
            .iter()
            .filter_map(LookaheadScheduler::next_poll_due)
            .reduce(f64::min)
    }

    /// Number of running schedulers.
    pub fn active(&self) -> usize {
        self.live().iter().filter(|s| s.is_running()).count()
    }

    /// Deadline misses summed over every live scheduler, stopped ones
    /// included.
    pub fn deadline_misses(&self) -> u64 {
        self.live().iter().map(LookaheadScheduler::deadline_misses).sum()
    }

    /// Steps `engine`'s clock from poll to poll until `until`, then leaves
    /// the clock at `until`. Returns the number of polls performed.
    ///
    /// Windows polled during the run end at `until` at the latest, so
    /// nothing past it is buffered. `engine` must be the engine this
    /// reactor reads.
    pub fn run_offline(&self, engine: &OfflineEngine, until: f64) -> usize {
        let previous = self.inner.horizon.replace(Some(until));
        let mut polls = 0;
        loop {
            let polled = self.turn();
            polls += polled;
            let now = engine.current_time();
            match self.next_due() {
                Some(due) if due <= until && due > now => engine.set_time(due),
                // Started during this turn; poll it before moving the clock.
                Some(due) if due <= now && polled > 0 => {}
                _ => break,
            }
        }
        self.inner.horizon.set(previous);
        engine.set_time(until);
        tracing::debug!(polls, until, "offline run finished");
        polls
    }
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("config", &self.inner.config)
            .field("schedulers", &self.inner.schedulers.borrow().len())
            .finish()
    }
}
