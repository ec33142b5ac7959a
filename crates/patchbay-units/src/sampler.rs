//! One-shot sampler.
//!
//! Holds a raw sample buffer in its settings and plays it through an engine
//! `sampler` node on every rising gate. The buffer is the payload the preset
//! codec moves out into its content-addressed blob table.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use patchbay_core::{
    AudioEngine, InputPort, NodeHandle, OutputPort, Ports, Unit, UnitContext, UnitError, Value,
};

use crate::settings::Settings;

#[derive(Default)]
struct Triggers {
    count: Cell<u64>,
    last: Cell<Option<f64>>,
}

/// Sample player triggered by gate events.
pub struct Sampler {
    ports: Ports,
    engine: Rc<dyn AudioEngine>,
    node: NodeHandle,
    gain: Cell<f64>,
    sample: RefCell<Vec<u8>>,
    triggers: Rc<Triggers>,
    released: bool,
}

impl Sampler {
    /// Creates a sampler from `settings` (`{ gain, sample }`).
    pub fn new(ctx: &UnitContext, settings: Option<&Value>) -> Result<Self, UnitError> {
        let settings = Settings::new(settings)?;
        let gain = settings.number("gain", 1.0)?;
        let sample = settings.bytes("sample")?;

        let node = ctx.engine.create_node("sampler")?;
        let triggers = Rc::new(Triggers::default());
        let hits = Rc::clone(&triggers);
        let ports = Ports::new()
            .with_input(
                "gate",
                InputPort::Event(Rc::new(move |time, gate| {
                    if gate {
                        hits.count.set(hits.count.get() + 1);
                        hits.last.set(Some(time));
                    }
                })),
            )?
            .with_output("audio", OutputPort::Audio(node))?;

        Ok(Self {
            ports,
            engine: Rc::clone(&ctx.engine),
            node,
            gain: Cell::new(gain),
            sample: RefCell::new(sample),
            triggers,
            released: false,
        })
    }

    /// Number of rising gates received.
    pub fn triggers(&self) -> u64 {
        self.triggers.count.get()
    }

    /// Time of the most recent trigger.
    pub fn last_trigger(&self) -> Option<f64> {
        self.triggers.last.get()
    }

    /// Length of the loaded sample in bytes.
    pub fn sample_len(&self) -> usize {
        self.sample.borrow().len()
    }

    /// Replaces the sample buffer.
    pub fn load_sample(&self, bytes: Vec<u8>) {
        *self.sample.borrow_mut() = bytes;
    }

    /// Current linear gain.
    pub fn gain(&self) -> f64 {
        self.gain.get()
    }

    /// Sets the linear gain.
    pub fn set_gain(&self, gain: f64) {
        self.gain.set(gain);
    }
}

impl Unit for Sampler {
    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn save(&self) -> Option<Value> {
        Some(
            Value::map()
                .with("gain", self.gain())
                .with("sample", self.sample.borrow().clone()),
        )
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
