//! Patchbay Graph - patches of connected units
//!
//! [`PatchGraph`] owns unit instances and the connections between their
//! ports. It validates every connection through the [`ConnectionManager`],
//! saves itself to a [`PatchDocument`], and reloads atomically. Patches can
//! declare their own ports through [`Boundary`] pseudo-units and be nested
//! inside another patch as a [`Rack`].
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use patchbay_core::{OfflineEngine, Reactor, SchedulerConfig, UnitContext};
//! use patchbay_graph::{ConnectionSpec, PatchGraph, default_registry};
//! use patchbay_units::Counter;
//!
//! let engine = Rc::new(OfflineEngine::new());
//! let reactor = Reactor::new(engine.clone(), SchedulerConfig::default());
//! let ctx = UnitContext::new(engine.clone(), reactor.clone());
//!
//! let mut graph = PatchGraph::new(default_registry().unwrap(), ctx);
//! let clock = graph.add_unit("clock", None).unwrap();
//! let counter = graph.add_unit("counter", None).unwrap();
//! graph
//!     .connect(ConnectionSpec::new(clock, "quarter", counter.clone(), "gate"))
//!     .unwrap();
//!
//! reactor.run_offline(&engine, 2.0);
//! assert_eq!(graph.unit_as::<Counter>(&counter).unwrap().rising(), 4);
//! ```

pub mod boundary;
pub mod connection;
pub mod document;
pub mod error;
pub mod graph;
pub mod id;
pub mod rack;

pub use boundary::{Boundary, BoundarySide};
pub use connection::{Connection, ConnectionManager, ConnectionSpec};
pub use document::{PatchDocument, UnitEntry};
pub use error::{InvalidReason, PatchError};
pub use graph::{NewUnit, PatchGraph, UnitRecord};
pub use id::{ConnectionId, UnitId};
pub use rack::{RACK_TYPE_ID, Rack, default_registry, default_registry_with, register_rack};
