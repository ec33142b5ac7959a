//! Property-based tests for the clock generator.
//!
//! Whatever the tempo and however irregular the polling, each division's
//! timestamps never run backwards and no tick is delivered twice.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use patchbay_core::{OfflineEngine, OutputPort, Reactor, SchedulerConfig, Unit, UnitContext, Value};
use patchbay_units::{Clock, ClockConfig, Division};

type Log = Rc<RefCell<Vec<(f64, bool)>>>;

fn record_all(clock: &Clock) -> Vec<Log> {
    Division::ALL
        .iter()
        .map(|division| {
            let log: Log = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&log);
            if let Some(OutputPort::Event(emitter)) = clock.ports().outputs.get(division.port_name()) {
                let _ = emitter.subscribe(Rc::new(move |t, g| sink.borrow_mut().push((t, g))));
            }
            log
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_division_timestamps_are_monotonic(
        tempos in prop::collection::vec(10.0f64..400.0, 1..6),
        steps in prop::collection::vec(0.01f64..0.7, 5..40),
    ) {
        let engine = Rc::new(OfflineEngine::new());
        let reactor = Reactor::new(engine.clone(), SchedulerConfig::default());
        let ctx = UnitContext::new(engine.clone(), reactor.clone());
        let clock = Clock::new(
            &ctx,
            ClockConfig::default(),
            Some(&Value::map().with("tempo", tempos[0])),
        )
        .unwrap();
        let logs = record_all(&clock);
        let scheduler = clock.scheduler().clone();

        for (i, step) in steps.iter().enumerate() {
            if i % 7 == 6 {
                clock.set_tempo(tempos[i % tempos.len()]);
            }
            scheduler.poll();
            engine.advance(*step);
        }

        for log in &logs {
            let events = log.borrow();
            for pair in events.windows(2) {
                prop_assert!(pair[1].0 >= pair[0].0, "time went backwards: {:?}", pair);
            }
            let rising: Vec<f64> = events.iter().filter(|e| e.1).map(|e| e.0).collect();
            for pair in rising.windows(2) {
                prop_assert!(pair[1] > pair[0], "duplicate tick at {}", pair[0]);
            }
            for (i, (_, gate)) in events.iter().enumerate() {
                prop_assert_eq!(*gate, i % 2 == 0);
            }
        }
    }
}
