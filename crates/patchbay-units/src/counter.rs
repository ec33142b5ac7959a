//! Gate counter.
//!
//! Records every gate event it receives and passes it straight on through
//! its `gate` output, like a thru jack.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use patchbay_core::{EventEmitter, InputPort, OutputPort, Ports, Unit, UnitError};

/// Counts rising and falling gate events.
pub struct Counter {
    ports: Ports,
    events: Rc<RefCell<Vec<(f64, bool)>>>,
}

impl Counter {
    /// Creates a counter with an empty log.
    pub fn new() -> Result<Self, UnitError> {
        let events: Rc<RefCell<Vec<(f64, bool)>>> = Rc::new(RefCell::new(Vec::new()));
        let thru = EventEmitter::new();

        let log = Rc::clone(&events);
        let out = thru.clone();
        let ports = Ports::new()
            .with_input(
                "gate",
                InputPort::Event(Rc::new(move |time, gate| {
                    log.borrow_mut().push((time, gate));
                    out.emit(time, gate);
                })),
            )?
            .with_output("gate", OutputPort::Event(thru))?;

        Ok(Self { ports, events })
    }

    /// Number of rising events received.
    pub fn rising(&self) -> usize {
        self.events.borrow().iter().filter(|(_, g)| *g).count()
    }

    /// Number of falling events received.
    pub fn falling(&self) -> usize {
        self.events.borrow().iter().filter(|(_, g)| !*g).count()
    }

    /// Every received event, in arrival order.
    pub fn events(&self) -> Vec<(f64, bool)> {
        self.events.borrow().clone()
    }

    /// Forgets every recorded event.
    pub fn reset(&self) {
        self.events.borrow_mut().clear();
    }
}

impl Unit for Counter {
    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_counts_and_forwards() {
        let counter = Counter::new().unwrap();
        let Some(InputPort::Event(notify)) = counter.ports().inputs.get("gate") else {
            panic!("gate input missing");
        };
        let Some(OutputPort::Event(thru)) = counter.ports().outputs.get("gate") else {
            panic!("gate output missing");
        };

        let forwarded = Rc::new(Cell::new(0));
        let seen = Rc::clone(&forwarded);
        let _sub = thru.subscribe(Rc::new(move |_, _| seen.set(seen.get() + 1)));

        notify(0.1, true);
        notify(0.2, false);
        notify(0.6, true);

        assert_eq!(counter.rising(), 2);
        assert_eq!(counter.falling(), 1);
        assert_eq!(counter.events()[1], (0.2, false));
        assert_eq!(forwarded.get(), 3);

        counter.reset();
        assert_eq!(counter.rising(), 0);
    }
}
