//! Gain stage.
//!
//! One engine `gain` node serves as both the audio input and the audio
//! output. The graph only routes it; the level lives in the settings.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use patchbay_core::{
    AudioEngine, InputPort, NodeHandle, OutputPort, Ports, Unit, UnitContext, UnitError, Value,
};

use crate::settings::Settings;

/// Linear gain stage.
pub struct Gain {
    ports: Ports,
    engine: Rc<dyn AudioEngine>,
    node: NodeHandle,
    gain: Cell<f64>,
    released: bool,
}

impl Gain {
    /// Creates a gain stage from `settings` (`{ gain }`, default 1.0).
    pub fn new(ctx: &UnitContext, settings: Option<&Value>) -> Result<Self, UnitError> {
        let gain = Settings::new(settings)?.number("gain", 1.0)?;
        let node = ctx.engine.create_node("gain")?;
        let ports = Ports::new()
            .with_input("audio", InputPort::Audio(node))?
            .with_output("audio", OutputPort::Audio(node))?;
        Ok(Self {
            ports,
            engine: Rc::clone(&ctx.engine),
            node,
            gain: Cell::new(gain),
            released: false,
        })
    }

    /// Current linear gain.
    pub fn gain(&self) -> f64 {
        self.gain.get()
    }

    /// Sets the linear gain.
    pub fn set_gain(&self, gain: f64) {
        self.gain.set(gain);
    }

    /// Engine node backing both ports.
    pub fn node(&self) -> NodeHandle {
        self.node
    }
}

impl Unit for Gain {
    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn save(&self) -> Option<Value> {
        Some(Value::map().with("gain", self.gain()))
    }

    fn teardown(&mut self) {
        if !std::mem::replace(&mut self.released, true) {
            self.engine.release_node(self.node);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
