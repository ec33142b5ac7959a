//! Lookahead scheduler.
//!
//! A [`LookaheadScheduler`] polls the engine clock at a fixed interval and,
//! on every poll, hands its callback one buffered window `[begin, end)`:
//! `begin` is where the previous window ended (or "now" on the first poll)
//! and `end` is "now + buffer depth". The callback emits every event whose
//! time falls inside the window, so events are scheduled ahead of the engine
//! clock and land sample-accurately.
//!
//! # Deadline Misses
//!
//! When a poll arrives after the previous window's end has already passed,
//! the scheduler records a deadline miss and logs it. Delivery continues:
//! `begin` still equals the old buffered-until value, so late events are
//! handed out in the next window instead of being dropped. Only latency
//! degrades.
//!
//! # Horizon
//!
//! A horizon caps every window's `end`. Offline runs set it to their end
//! time so nothing past the requested span is buffered; the next run picks
//! up from the capped end. A window held back by the horizon does not count
//! as a deadline miss when the clock passes its end.
//!
//! # Cancellation
//!
//! [`stop()`](LookaheadScheduler::stop) is idempotent and guarantees no
//! further callback invocation once it returns, including when called from
//! inside the callback itself.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::engine::AudioEngine;

/// Default wall-clock interval between polls, in seconds.
pub const DEFAULT_POLL_INTERVAL: f64 = 0.05;

/// Default lookahead buffer depth, in seconds.
pub const DEFAULT_BUFFER_DEPTH: f64 = 0.3;

/// Timing parameters of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    /// Seconds between polls.
    pub poll_interval: f64,
    /// Seconds of lookahead buffered on each poll.
    pub buffer_depth: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            buffer_depth: DEFAULT_BUFFER_DEPTH,
        }
    }
}

/// Errors returned by scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// `start` was called while the scheduler was already running.
    #[error("scheduler is already running")]
    AlreadyRunning,
}

/// Lifecycle state of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    /// Not polling. Initial state.
    #[default]
    Stopped,
    /// Polling and invoking the callback.
    Running,
}

/// One buffered window handed to the scheduler callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    /// Absolute clock time where this window starts (inclusive).
    pub begin: f64,
    /// Absolute clock time where this window ends (exclusive).
    pub end: f64,
    /// `begin` relative to the first poll.
    pub relative_begin: f64,
    /// `end` relative to the first poll.
    pub relative_end: f64,
    /// Absolute clock time of the first poll since `start`.
    pub start: f64,
}

impl Window {
    /// Returns whether `time` lies in `[begin, end)`.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.begin && time < self.end
    }
}

type Callback = Box<dyn FnMut(&Window)>;

pub(crate) struct SchedulerInner {
    clock: Rc<dyn AudioEngine>,
    config: SchedulerConfig,
    state: Cell<SchedulerState>,
    /// Bumped on every start so a callback replaced mid-poll is not restored.
    generation: Cell<u64>,
    callback: RefCell<Option<Callback>>,
    in_poll: Cell<bool>,
    start_time: Cell<f64>,
    buffered_until: Cell<Option<f64>>,
    horizon: Cell<Option<f64>>,
    /// Last window ended at the horizon rather than the full lookahead.
    held: Cell<bool>,
    next_poll_due: Cell<f64>,
    polls: Cell<u64>,
    deadline_misses: Cell<u64>,
}

/// Polls the engine clock and dispatches buffered windows.
///
/// Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct LookaheadScheduler {
    pub(crate) inner: Rc<SchedulerInner>,
}

impl LookaheadScheduler {
    /// Creates a stopped scheduler reading `clock`.
    pub fn new(clock: Rc<dyn AudioEngine>, config: SchedulerConfig) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                clock,
                config,
                state: Cell::new(SchedulerState::Stopped),
                generation: Cell::new(0),
                callback: RefCell::new(None),
                in_poll: Cell::new(false),
                start_time: Cell::new(0.0),
                buffered_until: Cell::new(None),
                horizon: Cell::new(None),
                held: Cell::new(false),
                next_poll_due: Cell::new(0.0),
                polls: Cell::new(0),
                deadline_misses: Cell::new(0),
            }),
        }
    }

    /// Transitions Stopped → Running. The first poll is due immediately.
    pub fn start(&self, callback: impl FnMut(&Window) + 'static) -> Result<(), SchedulerError> {
        let inner = &self.inner;
        if inner.state.get() == SchedulerState::Running {
            return Err(SchedulerError::AlreadyRunning);
        }
        inner.generation.set(inner.generation.get() + 1);
        inner.buffered_until.set(None);
        inner.held.set(false);
        inner.next_poll_due.set(inner.clock.current_time());
        *inner.callback.borrow_mut() = Some(Box::new(callback));
        inner.state.set(SchedulerState::Running);
        Ok(())
    }

    /// Transitions Running → Stopped and drops the callback. No-op when
    /// already stopped.
    pub fn stop(&self) {
        let inner = &self.inner;
        if inner.state.replace(SchedulerState::Stopped) == SchedulerState::Stopped {
            return;
        }
        // Drop outside the borrow: the callback may own handles to this scheduler.
        let callback = inner.callback.borrow_mut().take();
        drop(callback);
    }

    /// Performs one poll now, regardless of the poll interval.
    ///
    /// Returns true if the callback was invoked. Polls on a stopped
    /// scheduler, and polls issued from inside the callback, do nothing.
    pub fn poll(&self) -> bool {
        let inner = &self.inner;
        if inner.state.get() != SchedulerState::Running || inner.in_poll.get() {
            return false;
        }

        let now = inner.clock.current_time();
        let begin = match inner.buffered_until.get() {
            Some(buffered_until) => buffered_until,
            None => {
                inner.start_time.set(now);
                now
            }
        };

        let held = inner.held.replace(false);
        if begin < now && !held {
            inner.deadline_misses.set(inner.deadline_misses.get() + 1);
            tracing::warn!(lag = now - begin, "scheduler fell behind");
        }

        let lookahead = now + inner.config.buffer_depth;
        let end = match inner.horizon.get() {
            Some(horizon) => lookahead.min(horizon),
            None => lookahead,
        }
        .max(begin);
        inner.held.set(end < lookahead);
        let start = inner.start_time.get();
        let window = Window {
            begin,
            end,
            relative_begin: begin - start,
            relative_end: end - start,
            start,
        };

        inner.buffered_until.set(Some(end));
        inner.next_poll_due.set(now + inner.config.poll_interval);
        inner.polls.set(inner.polls.get() + 1);

        let generation = inner.generation.get();
        let Some(mut callback) = inner.callback.borrow_mut().take() else {
            return false;
        };

        inner.in_poll.set(true);
        callback(&window);
        inner.in_poll.set(false);

        if inner.state.get() == SchedulerState::Running && inner.generation.get() == generation {
            *inner.callback.borrow_mut() = Some(callback);
        }
        true
    }

    /// Returns whether a poll is due at the current clock time.
    pub fn is_due(&self) -> bool {
        self.is_running() && self.inner.clock.current_time() >= self.inner.next_poll_due.get()
    }

    /// Clock time of the next poll, if running.
    pub fn next_poll_due(&self) -> Option<f64> {
        self.is_running().then(|| self.inner.next_poll_due.get())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.inner.state.get()
    }

    /// Returns true while running.
    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// End of the last buffered window, if any poll happened since `start`.
    pub fn buffered_until(&self) -> Option<f64> {
        self.inner.buffered_until.get()
    }

    /// Caps the end of every following window at `horizon`. `None` lifts
    /// the cap.
    pub fn set_horizon(&self, horizon: Option<f64>) {
        self.inner.horizon.set(horizon);
    }

    /// Current window cap, if any.
    pub fn horizon(&self) -> Option<f64> {
        self.inner.horizon.get()
    }

    /// Number of polls that invoked the callback path since creation.
    pub fn polls(&self) -> u64 {
        self.inner.polls.get()
    }

    /// Number of polls that found the previous window already expired.
    pub fn deadline_misses(&self) -> u64 {
        self.inner.deadline_misses.get()
    }

    /// Timing parameters.
    pub fn config(&self) -> SchedulerConfig {
        self.inner.config
    }
}

impl fmt::Debug for LookaheadScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookaheadScheduler")
            .field("state", &self.state())
            .field("buffered_until", &self.buffered_until())
            .field("polls", &self.polls())
            .field("deadline_misses", &self.deadline_misses())
            .finish()
    }
}
