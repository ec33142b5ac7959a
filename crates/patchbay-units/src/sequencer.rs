//! Step sequencer.
//!
//! Each rising edge on `clock` advances one step; the first edge plays step
//! 0. Active steps forward the clock's gate-on and gate-off to `gate`.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use patchbay_core::{EventEmitter, InputPort, OutputPort, Ports, Unit, UnitError, Value};

use crate::settings::Settings;

/// Default number of steps.
pub const DEFAULT_STEPS: usize = 8;

/// Upper bound on the number of steps.
pub const MAX_STEPS: usize = 64;

struct Pattern {
    gates: RefCell<Vec<bool>>,
    /// Step played by the last rising edge.
    current: Cell<Option<usize>>,
    open: Cell<bool>,
    out: EventEmitter,
}

impl Pattern {
    fn on_clock(&self, time: f64, rising: bool) {
        if rising {
            let len = self.gates.borrow().len();
            let step = self.current.get().map_or(0, |s| (s + 1) % len);
            self.current.set(Some(step));
            let active = self.gates.borrow()[step];
            if self.open.replace(active) {
                // Previous gate never got its falling edge.
                self.out.emit(time, false);
            }
            if active {
                self.out.emit(time, true);
            }
        } else if self.open.replace(false) {
            self.out.emit(time, false);
        }
    }
}

/// Gate pattern player.
pub struct Sequencer {
    ports: Ports,
    pattern: Rc<Pattern>,
}

impl Sequencer {
    /// Creates a sequencer from `settings` (`{ steps, gates }`). Missing
    /// gates default to on; extra gates are dropped.
    pub fn new(settings: Option<&Value>) -> Result<Self, UnitError> {
        let settings = Settings::new(settings)?;
        let steps = settings.integer("steps", DEFAULT_STEPS as i64)?;
        let steps = usize::try_from(steps)
            .ok()
            .filter(|s| (1..=MAX_STEPS).contains(s))
            .ok_or_else(|| {
                UnitError::invalid_setting("steps", format!("expected 1..={MAX_STEPS}"))
            })?;
        let mut gates = settings.flags("gates")?.unwrap_or_default();
        gates.resize(steps, true);

        let out = EventEmitter::new();
        let pattern = Rc::new(Pattern {
            gates: RefCell::new(gates),
            current: Cell::new(None),
            open: Cell::new(false),
            out: out.clone(),
        });

        let input = Rc::clone(&pattern);
        let ports = Ports::new()
            .with_input(
                "clock",
                InputPort::Event(Rc::new(move |time, gate| input.on_clock(time, gate))),
            )?
            .with_output("gate", OutputPort::Event(out))?;

        Ok(Self { ports, pattern })
    }

    /// Number of steps.
    pub fn steps(&self) -> usize {
        self.pattern.gates.borrow().len()
    }

    /// Step played by the most recent clock edge.
    pub fn current_step(&self) -> Option<usize> {
        self.pattern.current.get()
    }

    /// Turns one step on or off. Out-of-range steps are ignored.
    pub fn set_gate(&self, step: usize, on: bool) {
        if let Some(gate) = self.pattern.gates.borrow_mut().get_mut(step) {
            *gate = on;
        }
    }

    /// Rewinds so the next clock edge plays step 0.
    pub fn rewind(&self) {
        self.pattern.current.set(None);
    }
}

impl Unit for Sequencer {
    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn save(&self) -> Option<Value> {
        let gates: Vec<Value> = self
            .pattern
            .gates
            .borrow()
            .iter()
            .map(|&g| Value::Bool(g))
            .collect();
        Some(Value::map().with("steps", self.steps()).with("gates", gates))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
