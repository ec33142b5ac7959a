//! Patchbay Core - runtime primitives for modular patches
//!
//! This crate holds everything a patch graph needs from below: the settings
//! value tree, typed ports, discrete-event emitters, the Audio Engine seam,
//! and the lookahead scheduler that drives timed events against the engine
//! clock.
//!
//! # Core Abstractions
//!
//! ## Units and Ports
//!
//! - [`Unit`] - Object-safe trait implemented by every block instance
//! - [`Ports`] - Named, ordered input and output ports of a unit
//! - [`InputPort`] / [`OutputPort`] - Tagged by [`PortKind`]: audio stream or discrete event
//! - [`ConnectionHandle`] - Capability that undoes one wired connection
//!
//! ## Events
//!
//! - [`EventEmitter`] - One emitter, many subscribers, `(time, gate)` delivery
//! - [`Subscription`] - Cancels a single subscriber
//!
//! ## Engine Seam
//!
//! - [`AudioEngine`] - Clock plus node connect/disconnect primitives
//! - [`OfflineEngine`] - Manually clocked engine for offline hosts and tests
//!
//! ## Scheduling
//!
//! - [`LookaheadScheduler`] - Polls the engine clock and hands out `[begin, end)` windows
//! - [`Reactor`] - Cooperative poll driver for every started scheduler
//!
//! # Threading
//!
//! The runtime assumes a single-threaded event-loop host. Shared state uses
//! `Rc`/`RefCell`; every callback site releases its borrows before invoking
//! user code so subscribers may mutate the patch reentrantly.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use patchbay_core::EventEmitter;
//!
//! let emitter = EventEmitter::new();
//! let hits = Rc::new(Cell::new(0));
//! let seen = Rc::clone(&hits);
//! let sub = emitter.subscribe(Rc::new(move |_time, high| {
//!     if high {
//!         seen.set(seen.get() + 1);
//!     }
//! }));
//!
//! emitter.emit(0.5, true);
//! emitter.emit(0.75, false);
//! sub.cancel();
//! emitter.emit(1.0, true);
//! assert_eq!(hits.get(), 1);
//! ```

pub mod engine;
pub mod error;
pub mod event;
pub mod port;
pub mod reactor;
pub mod scheduler;
pub mod unit;
pub mod value;

pub use engine::{AudioEngine, NodeHandle, OfflineEngine};
pub use error::{EngineError, UnitError};
pub use event::{EventEmitter, Notify, Subscription};
pub use port::{ConnectionHandle, InputPort, OutputPort, PortKind, PortSet, Ports};
pub use reactor::Reactor;
pub use scheduler::{LookaheadScheduler, SchedulerConfig, SchedulerError, SchedulerState, Window};
pub use unit::{Unit, UnitContext};
pub use value::{Value, ValueError, from_value};
