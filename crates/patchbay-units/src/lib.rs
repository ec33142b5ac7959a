//! Patchbay Units - built-in patch units
//!
//! This crate provides the units every patchbay host ships with:
//!
//! - [`Clock`] - Tempo clock with sixteenth, eighth and quarter gate outputs
//! - [`Counter`] - Records gate events and passes them through
//! - [`Gain`] - Audio gain stage backed by one engine node
//! - [`Sampler`] - Plays a stored sample buffer on every rising gate
//! - [`Sequencer`] - Steps through a gate pattern on each clock edge
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use patchbay_core::{OfflineEngine, Reactor, SchedulerConfig, Unit, UnitContext};
//! use patchbay_units::{Clock, ClockConfig};
//!
//! let engine = Rc::new(OfflineEngine::new());
//! let reactor = Reactor::new(engine.clone(), SchedulerConfig::default());
//! let ctx = UnitContext::new(engine.clone(), reactor.clone());
//!
//! let clock = Clock::new(&ctx, ClockConfig::default(), None).unwrap();
//! assert!(clock.ports().outputs.contains("quarter"));
//!
//! reactor.run_offline(&engine, 1.0);
//! assert!(clock.next_tick_index() > 0);
//! ```

pub mod clock;
pub mod counter;
pub mod gain;
pub mod sampler;
pub mod sequencer;
pub mod settings;

// Re-export main types at crate root
pub use clock::{Clock, ClockConfig, Division};
pub use counter::Counter;
pub use gain::Gain;
pub use sampler::Sampler;
pub use sequencer::Sequencer;
pub use settings::Settings;
