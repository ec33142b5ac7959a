//! Typed ports and connection capabilities.
//!
//! Every port carries a [`PortKind`] tag. Audio-stream ports expose an engine
//! [`NodeHandle`]; discrete-event outputs expose an [`EventEmitter`] and
//! discrete-event inputs a [`Notify`] callback. Kinds are checked when a
//! connection is requested, never inferred from shape.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::engine::{AudioEngine, NodeHandle};
use crate::error::{EngineError, UnitError};
use crate::event::{EventEmitter, Notify, Subscription};

/// Type tag of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortKind {
    /// Continuous audio signal routed inside the engine.
    AudioStream,
    /// Timestamped gate events delivered through subscriptions.
    DiscreteEvent,
}

impl PortKind {
    /// Stable identifier used in saved documents.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PortKind::AudioStream => "audio",
            PortKind::DiscreteEvent => "event",
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortKind {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(PortKind::AudioStream),
            "event" => Ok(PortKind::DiscreteEvent),
            other => Err(UnitError::invalid_setting(
                "kind",
                format!("unknown port kind '{other}'"),
            )),
        }
    }
}

/// Receiving end of a connection.
#[derive(Clone)]
pub enum InputPort {
    /// Engine node that accepts an audio route.
    Audio(NodeHandle),
    /// Callback invoked for each delivered event.
    Event(Notify),
}

impl InputPort {
    /// Type tag of this port.
    pub fn kind(&self) -> PortKind {
        match self {
            InputPort::Audio(_) => PortKind::AudioStream,
            InputPort::Event(_) => PortKind::DiscreteEvent,
        }
    }
}

impl fmt::Debug for InputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputPort::Audio(node) => f.debug_tuple("Audio").field(node).finish(),
            InputPort::Event(_) => f.write_str("Event(..)"),
        }
    }
}

/// Sending end of a connection.
#[derive(Clone, Debug)]
pub enum OutputPort {
    /// Engine node whose output can be routed.
    Audio(NodeHandle),
    /// Emitter that subscribers attach to.
    Event(EventEmitter),
}

impl OutputPort {
    /// Type tag of this port.
    pub fn kind(&self) -> PortKind {
        match self {
            OutputPort::Audio(_) => PortKind::AudioStream,
            OutputPort::Event(_) => PortKind::DiscreteEvent,
        }
    }
}

/// Named ports of one direction, kept in declaration order.
#[derive(Clone, Debug)]
pub struct PortSet<P> {
    entries: Vec<(String, P)>,
}

impl<P> Default for PortSet<P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<P> PortSet<P> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a port. Names are unique within a set.
    pub fn insert(&mut self, name: impl Into<String>, port: P) -> Result<(), UnitError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(UnitError::DuplicatePort(name));
        }
        self.entries.push((name, port));
        Ok(())
    }

    /// Looks up a port by name.
    pub fn get(&self, name: &str) -> Option<&P> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, port)| port)
    }

    /// Returns whether a port with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Port names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Iterates `(name, port)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &P)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p))
    }

    /// Number of ports.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All ports of a unit.
#[derive(Clone, Debug, Default)]
pub struct Ports {
    /// Receiving ports.
    pub inputs: PortSet<InputPort>,
    /// Sending ports.
    pub outputs: PortSet<OutputPort>,
}

impl Ports {
    /// Creates an empty port declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style input declaration.
    pub fn with_input(mut self, name: &str, port: InputPort) -> Result<Self, UnitError> {
        self.inputs.insert(name, port)?;
        Ok(self)
    }

    /// Builder-style output declaration.
    pub fn with_output(mut self, name: &str, port: OutputPort) -> Result<Self, UnitError> {
        self.outputs.insert(name, port)?;
        Ok(self)
    }
}

/// Capability that undoes one established connection.
pub enum ConnectionHandle {
    /// Engine-level audio route.
    Audio {
        /// Engine the route lives in.
        engine: Rc<dyn AudioEngine>,
        /// Source node.
        from: NodeHandle,
        /// Destination node.
        to: NodeHandle,
    },
    /// Subscription of an event input to an event output.
    Event(Subscription),
}

impl ConnectionHandle {
    /// Asks the engine to route `from` into `to` and returns the handle that
    /// removes the route again.
    pub fn audio(
        engine: Rc<dyn AudioEngine>,
        from: NodeHandle,
        to: NodeHandle,
    ) -> Result<Self, EngineError> {
        engine.connect(from, to)?;
        Ok(ConnectionHandle::Audio { engine, from, to })
    }

    /// Subscribes `notify` to `emitter`.
    pub fn event(emitter: &EventEmitter, notify: Notify) -> Self {
        ConnectionHandle::Event(emitter.subscribe(notify))
    }

    /// Undoes the connection.
    pub fn release(&self) -> Result<(), EngineError> {
        match self {
            ConnectionHandle::Audio { engine, from, to } => engine.disconnect(*from, *to),
            ConnectionHandle::Event(subscription) => {
                subscription.cancel();
                Ok(())
            }
        }
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionHandle::Audio { from, to, .. } => f
                .debug_struct("Audio")
                .field("from", from)
                .field("to", to)
                .finish(),
            ConnectionHandle::Event(sub) => f.debug_tuple("Event").field(sub).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::OfflineEngine;
    use std::cell::Cell;

    #[test]
    fn test_port_kind_round_trip() {
        for kind in [PortKind::AudioStream, PortKind::DiscreteEvent] {
            assert_eq!(kind.as_str().parse::<PortKind>().unwrap(), kind);
        }
        assert!("midi".parse::<PortKind>().is_err());
    }

    #[test]
    fn test_port_set_rejects_duplicates() {
        let mut set = PortSet::new();
        set.insert("audio", OutputPort::Audio(NodeHandle(1))).unwrap();
        let err = set
            .insert("audio", OutputPort::Event(EventEmitter::new()))
            .unwrap_err();
        assert!(matches!(err, UnitError::DuplicatePort(ref name) if name == "audio"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_port_set_keeps_order() {
        let ports = Ports::new()
            .with_output("b", OutputPort::Audio(NodeHandle(2)))
            .unwrap()
            .with_output("a", OutputPort::Audio(NodeHandle(1)))
            .unwrap();
        assert_eq!(ports.outputs.names().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_audio_handle_release() {
        let engine = Rc::new(OfflineEngine::new());
        let a = engine.create_node("a").unwrap();
        let b = engine.create_node("b").unwrap();
        let dyn_engine: Rc<dyn AudioEngine> = engine.clone();

        let handle = ConnectionHandle::audio(dyn_engine, a, b).unwrap();
        assert!(engine.is_linked(a, b));
        handle.release().unwrap();
        assert!(!engine.is_linked(a, b));
    }

    #[test]
    fn test_event_handle_release() {
        let emitter = EventEmitter::new();
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        let handle = ConnectionHandle::event(&emitter, Rc::new(move |_, _| seen.set(seen.get() + 1)));

        emitter.emit(0.0, true);
        handle.release().unwrap();
        emitter.emit(0.1, true);
        assert_eq!(count.get(), 1);
    }
}
