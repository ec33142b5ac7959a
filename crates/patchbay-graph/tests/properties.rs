//! Property-based tests for patch graph bookkeeping.
//!
//! Random sequences of add, connect and remove operations must never leave
//! duplicate edges or connections pointing at removed units, and whatever
//! state they reach must survive a save/load cycle.

use std::collections::BTreeSet;
use std::rc::Rc;

use patchbay_core::{OfflineEngine, Reactor, SchedulerConfig, UnitContext};
use patchbay_graph::{ConnectionSpec, PatchGraph, UnitId, default_registry};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    AddGain,
    AddCounter,
    Connect(usize, usize),
    Remove(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::AddGain),
        Just(Op::AddCounter),
        (0usize..8, 0usize..8).prop_map(|(a, b)| Op::Connect(a, b)),
        (0usize..8).prop_map(Op::Remove),
    ]
}

fn graph() -> (Rc<OfflineEngine>, PatchGraph) {
    let engine = Rc::new(OfflineEngine::new());
    let reactor = Reactor::new(engine.clone(), SchedulerConfig::default());
    let context = UnitContext::new(engine.clone(), reactor);
    (engine, PatchGraph::new(default_registry().unwrap(), context))
}

fn apply(graph: &mut PatchGraph, ops: &[Op]) {
    for op in ops {
        let ids: Vec<UnitId> = graph.unit_order().to_vec();
        match op {
            Op::AddGain => {
                graph.add_unit("gain", None).unwrap();
            }
            Op::AddCounter => {
                graph.add_unit("counter", None).unwrap();
            }
            Op::Connect(a, b) if !ids.is_empty() => {
                let src = &ids[a % ids.len()];
                let dst = &ids[b % ids.len()];
                let port = |id: &UnitId| match graph.unit(id).map(|r| r.type_id()) {
                    Some("gain") => "audio",
                    _ => "gate",
                };
                let spec = ConnectionSpec::new(src.clone(), port(src), dst.clone(), port(dst));
                let valid = graph.is_valid(&spec);
                assert_eq!(valid, graph.connect(spec).is_ok(), "is_valid disagreed with connect");
            }
            Op::Remove(i) if !ids.is_empty() => {
                graph.remove_unit(&ids[i % ids.len()]).unwrap();
            }
            _ => {}
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// No two live connections share both endpoints.
    #[test]
    fn test_no_duplicate_edges(ops in prop::collection::vec(op(), 1..40)) {
        let (_engine, mut graph) = graph();
        apply(&mut graph, &ops);

        let specs: Vec<&ConnectionSpec> = graph.connections().map(|c| c.spec()).collect();
        let unique: BTreeSet<&ConnectionSpec> = specs.iter().copied().collect();
        prop_assert_eq!(specs.len(), unique.len());
    }

    /// Every live connection references two live units, and every audio
    /// link in the engine belongs to a live connection.
    #[test]
    fn test_removal_leaves_no_dangling_connections(ops in prop::collection::vec(op(), 1..40)) {
        let (engine, mut graph) = graph();
        apply(&mut graph, &ops);

        for connection in graph.connections() {
            prop_assert!(graph.contains_unit(&connection.spec().src_unit));
            prop_assert!(graph.contains_unit(&connection.spec().dst_unit));
        }
        let audio = graph
            .connections()
            .filter(|c| c.kind() == patchbay_core::PortKind::AudioStream)
            .count();
        prop_assert_eq!(engine.link_count(), audio);
    }

    /// Saving, loading into a fresh graph and saving again is stable.
    #[test]
    fn test_save_load_round_trip(ops in prop::collection::vec(op(), 1..30)) {
        let (_engine, mut graph) = graph();
        apply(&mut graph, &ops);
        let saved = graph.save();

        let (_other_engine, mut other) = self::graph();
        other.load(&saved).unwrap();
        prop_assert_eq!(other.save(), saved);
    }
}
