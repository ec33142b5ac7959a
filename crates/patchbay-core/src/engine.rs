//! Audio Engine seam.
//!
//! The patch runtime never processes samples itself. It asks an
//! [`AudioEngine`] for processing nodes, links them together, and reads the
//! engine's monotonically increasing clock. Concrete engines (a device
//! backend, a browser audio context bridge, ...) live outside this crate;
//! [`OfflineEngine`] is the bookkeeping-only engine used by offline hosts and
//! tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::EngineError;

/// Opaque handle to a processing node owned by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(pub u64);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// External collaborator that owns signal processing.
///
/// All methods take `&self`: engines are shared between units through `Rc`
/// and keep their own interior state. A single `connect`/`disconnect` call is
/// not required to be reentrant.
pub trait AudioEngine {
    /// Current engine clock in seconds. Never decreases.
    fn current_time(&self) -> f64;

    /// Instantiates a processing node of the given kind (e.g. `"gain"`).
    fn create_node(&self, kind: &str) -> Result<NodeHandle, EngineError>;

    /// Releases a node and every link touching it.
    fn release_node(&self, node: NodeHandle);

    /// Routes the output of `from` into `to`.
    fn connect(&self, from: NodeHandle, to: NodeHandle) -> Result<(), EngineError>;

    /// Removes a route created by [`connect`](Self::connect).
    fn disconnect(&self, from: NodeHandle, to: NodeHandle) -> Result<(), EngineError>;
}

#[derive(Default)]
struct OfflineState {
    next_node: u64,
    nodes: BTreeMap<NodeHandle, String>,
    links: BTreeSet<(NodeHandle, NodeHandle)>,
}

/// Manually clocked engine that only records nodes and links.
///
/// Used to mount patches without an audio device: the host advances the
/// clock explicitly with [`advance`](Self::advance) or
/// [`set_time`](Self::set_time). Failure injection lets callers check that a
/// failed engine call leaves the patch untouched.
#[derive(Default)]
pub struct OfflineEngine {
    time: Cell<f64>,
    state: RefCell<OfflineState>,
    fail_next_connect: Cell<bool>,
    fail_next_disconnect: Cell<bool>,
}

impl OfflineEngine {
    /// Creates an engine with its clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `seconds`. Negative steps are ignored.
    pub fn advance(&self, seconds: f64) {
        if seconds > 0.0 {
            self.time.set(self.time.get() + seconds);
        }
    }

    /// Sets the clock to `time`. The clock never moves backwards.
    pub fn set_time(&self, time: f64) {
        if time > self.time.get() {
            self.time.set(time);
        }
    }

    /// Makes the next [`connect`](AudioEngine::connect) call fail.
    pub fn fail_next_connect(&self) {
        self.fail_next_connect.set(true);
    }

    /// Makes the next [`disconnect`](AudioEngine::disconnect) call fail.
    pub fn fail_next_disconnect(&self) {
        self.fail_next_disconnect.set(true);
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.state.borrow().nodes.len()
    }

    /// Number of live links.
    pub fn link_count(&self) -> usize {
        self.state.borrow().links.len()
    }

    /// Returns whether `from` is routed into `to`.
    pub fn is_linked(&self, from: NodeHandle, to: NodeHandle) -> bool {
        self.state.borrow().links.contains(&(from, to))
    }

    /// Kind string the node was created with.
    pub fn node_kind(&self, node: NodeHandle) -> Option<String> {
        self.state.borrow().nodes.get(&node).cloned()
    }
}

impl AudioEngine for OfflineEngine {
    fn current_time(&self) -> f64 {
        self.time.get()
    }

    fn create_node(&self, kind: &str) -> Result<NodeHandle, EngineError> {
        let mut state = self.state.borrow_mut();
        state.next_node += 1;
        let handle = NodeHandle(state.next_node);
        state.nodes.insert(handle, kind.to_string());
        Ok(handle)
    }

    fn release_node(&self, node: NodeHandle) {
        let mut state = self.state.borrow_mut();
        state.nodes.remove(&node);
        state.links.retain(|&(from, to)| from != node && to != node);
    }

    fn connect(&self, from: NodeHandle, to: NodeHandle) -> Result<(), EngineError> {
        if self.fail_next_connect.replace(false) {
            return Err(EngineError::Backend("injected connect failure".into()));
        }
        let mut state = self.state.borrow_mut();
        for node in [from, to] {
            if !state.nodes.contains_key(&node) {
                return Err(EngineError::UnknownNode(node));
            }
        }
        if !state.links.insert((from, to)) {
            return Err(EngineError::AlreadyLinked { from, to });
        }
        Ok(())
    }

    fn disconnect(&self, from: NodeHandle, to: NodeHandle) -> Result<(), EngineError> {
        if self.fail_next_disconnect.replace(false) {
            return Err(EngineError::Backend("injected disconnect failure".into()));
        }
        if self.state.borrow_mut().links.remove(&(from, to)) {
            Ok(())
        } else {
            Err(EngineError::NotLinked { from, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_never_decreases() {
        let engine = OfflineEngine::new();
        engine.advance(1.5);
        engine.set_time(1.0);
        engine.advance(-3.0);
        assert_eq!(engine.current_time(), 1.5);
    }

    #[test]
    fn test_connect_and_disconnect() {
        let engine = OfflineEngine::new();
        let a = engine.create_node("gain").unwrap();
        let b = engine.create_node("gain").unwrap();

        engine.connect(a, b).unwrap();
        assert!(engine.is_linked(a, b));
        assert_eq!(
            engine.connect(a, b),
            Err(EngineError::AlreadyLinked { from: a, to: b })
        );

        engine.disconnect(a, b).unwrap();
        assert!(!engine.is_linked(a, b));
        assert!(engine.disconnect(a, b).is_err());
    }

    #[test]
    fn test_release_drops_links() {
        let engine = OfflineEngine::new();
        let a = engine.create_node("osc").unwrap();
        let b = engine.create_node("out").unwrap();
        engine.connect(a, b).unwrap();

        engine.release_node(a);
        assert_eq!(engine.node_count(), 1);
        assert_eq!(engine.link_count(), 0);
        assert_eq!(engine.connect(a, b), Err(EngineError::UnknownNode(a)));
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let engine = OfflineEngine::new();
        let a = engine.create_node("a").unwrap();
        let b = engine.create_node("b").unwrap();

        engine.fail_next_connect();
        assert!(engine.connect(a, b).is_err());
        assert!(!engine.is_linked(a, b));
        assert!(engine.connect(a, b).is_ok());
    }
}
