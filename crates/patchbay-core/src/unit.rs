//! The [`Unit`] trait and its construction context.
//!
//! A unit is one block instance in a patch. The graph only sees its ports, an
//! optional settings snapshot and a teardown hook; what the unit does with
//! its engine nodes and emitters is its own business.
//!
//! ## Design Decisions
//!
//! - **Object-safe**: graphs hold `Box<dyn Unit>` created by registry
//!   factories from a type id. No code travels inside saved documents.
//!
//! - **Downcastable**: [`Unit::as_any`] lets hosts reach a concrete unit
//!   (e.g. to change a clock's tempo) without the graph knowing its type.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::engine::AudioEngine;
use crate::port::Ports;
use crate::reactor::Reactor;
use crate::value::Value;

/// Core trait for all patch units.
///
/// # Example
///
/// ```rust
/// use std::any::Any;
/// use patchbay_core::{OutputPort, Ports, Unit, UnitContext, UnitError, Value};
///
/// struct Level {
///     ports: Ports,
///     level: f64,
/// }
///
/// impl Level {
///     fn new(ctx: &UnitContext) -> Result<Self, UnitError> {
///         let node = ctx.engine.create_node("gain")?;
///         let ports = Ports::new().with_output("audio", OutputPort::Audio(node))?;
///         Ok(Self { ports, level: 1.0 })
///     }
/// }
///
/// impl Unit for Level {
///     fn ports(&self) -> &Ports {
///         &self.ports
///     }
///
///     fn save(&self) -> Option<Value> {
///         Some(Value::map().with("level", self.level))
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait Unit {
    /// Declared input and output ports. Must not change after construction.
    fn ports(&self) -> &Ports;

    /// Settings snapshot that recreates this unit when passed back to its
    /// factory. `None` means "no settings".
    fn save(&self) -> Option<Value> {
        None
    }

    /// Releases engine nodes, stops schedulers and drops subscriptions.
    ///
    /// Called once, after every connection touching the unit is gone.
    fn teardown(&mut self) {}

    /// Concrete type access for hosts.
    fn as_any(&self) -> &dyn Any;
}

/// Runtime services handed to unit factories.
#[derive(Clone)]
pub struct UnitContext {
    /// Engine the unit creates its nodes in.
    pub engine: Rc<dyn AudioEngine>,
    /// Poll driver for units that emit timed events.
    pub reactor: Reactor,
}

impl UnitContext {
    /// Creates a context whose reactor reads the same engine.
    pub fn new(engine: Rc<dyn AudioEngine>, reactor: Reactor) -> Self {
        Self { engine, reactor }
    }

    /// Current engine clock time.
    pub fn now(&self) -> f64 {
        self.engine.current_time()
    }
}

impl fmt::Debug for UnitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitContext")
            .field("now", &self.now())
            .field("reactor", &self.reactor)
            .finish()
    }
}
