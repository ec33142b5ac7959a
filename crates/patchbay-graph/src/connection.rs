//! Connection manager.
//!
//! Validates candidate edges between an output port and an input port,
//! performs the wiring, and keeps the [`ConnectionHandle`] that undoes it.
//!
//! A candidate is valid when both ports exist, their [`PortKind`]s match,
//! and the exact `(source, destination)` pair is not already live. Wiring
//! happens before the record is stored, so a refused engine call leaves
//! nothing behind.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use patchbay_core::{
    AudioEngine, ConnectionHandle, EventEmitter, InputPort, NodeHandle, Notify, OutputPort,
    PortKind,
};

use serde::{Deserialize, Serialize};

use crate::error::{InvalidReason, PatchError};
use crate::id::{ConnectionId, UnitId};

/// Endpoints of a requested connection.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSpec {
    /// Unit owning the output port.
    #[serde(rename = "srcUnitId")]
    pub src_unit: UnitId,
    /// Output port name.
    pub src_port: String,
    /// Unit owning the input port.
    #[serde(rename = "dstUnitId")]
    pub dst_unit: UnitId,
    /// Input port name.
    pub dst_port: String,
}

impl ConnectionSpec {
    /// Builds a spec from its four endpoint names.
    pub fn new(
        src_unit: impl Into<UnitId>,
        src_port: impl Into<String>,
        dst_unit: impl Into<UnitId>,
        dst_port: impl Into<String>,
    ) -> Self {
        Self {
            src_unit: src_unit.into(),
            src_port: src_port.into(),
            dst_unit: dst_unit.into(),
            dst_port: dst_port.into(),
        }
    }

    /// Returns whether either endpoint belongs to `unit`.
    pub fn touches(&self, unit: &UnitId) -> bool {
        &self.src_unit == unit || &self.dst_unit == unit
    }
}

impl fmt::Display for ConnectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.src_unit, self.src_port, self.dst_unit, self.dst_port
        )
    }
}

/// A live, validated connection.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    spec: ConnectionSpec,
    kind: PortKind,
    handle: ConnectionHandle,
}

impl Connection {
    /// Connection id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Endpoints.
    pub fn spec(&self) -> &ConnectionSpec {
        &self.spec
    }

    /// Kind shared by both ports.
    pub fn kind(&self) -> PortKind {
        self.kind
    }
}

/// Resolved endpoints of a valid candidate.
enum Wiring<'p> {
    Audio(NodeHandle, NodeHandle),
    Event(&'p EventEmitter, &'p Notify),
}

impl Wiring<'_> {
    fn kind(&self) -> PortKind {
        match self {
            Wiring::Audio(..) => PortKind::AudioStream,
            Wiring::Event(..) => PortKind::DiscreteEvent,
        }
    }
}

/// Owns every live connection of one graph.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: BTreeMap<ConnectionId, Connection>,
    next_id: u64,
}

impl ConnectionManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty manager whose first id follows `last`.
    pub(crate) fn starting_after(last: u64) -> Self {
        Self {
            connections: BTreeMap::new(),
            next_id: last,
        }
    }

    /// Highest id handed out so far.
    pub(crate) fn last_id(&self) -> u64 {
        self.next_id
    }

    /// Checks a candidate against resolved ports. `None` means the port
    /// does not exist.
    pub fn validate(
        &self,
        spec: &ConnectionSpec,
        output: Option<&OutputPort>,
        input: Option<&InputPort>,
    ) -> Result<PortKind, InvalidReason> {
        self.plan(spec, output, input).map(|wiring| wiring.kind())
    }

    fn plan<'p>(
        &self,
        spec: &ConnectionSpec,
        output: Option<&'p OutputPort>,
        input: Option<&'p InputPort>,
    ) -> Result<Wiring<'p>, InvalidReason> {
        let output = output.ok_or_else(|| InvalidReason::MissingOutput(spec.src_port.clone()))?;
        let input = input.ok_or_else(|| InvalidReason::MissingInput(spec.dst_port.clone()))?;
        let wiring = match (output, input) {
            (OutputPort::Audio(from), InputPort::Audio(to)) => Wiring::Audio(*from, *to),
            (OutputPort::Event(emitter), InputPort::Event(notify)) => Wiring::Event(emitter, notify),
            _ => {
                return Err(InvalidReason::KindMismatch {
                    from: output.kind(),
                    to: input.kind(),
                });
            }
        };
        if self.find(spec).is_some() {
            return Err(InvalidReason::Duplicate);
        }
        Ok(wiring)
    }

    /// Validates and wires a candidate.
    pub fn connect(
        &mut self,
        engine: &Rc<dyn AudioEngine>,
        spec: ConnectionSpec,
        output: Option<&OutputPort>,
        input: Option<&InputPort>,
    ) -> Result<ConnectionId, PatchError> {
        let wiring = match self.plan(&spec, output, input) {
            Ok(wiring) => wiring,
            Err(reason) => return Err(PatchError::InvalidConnection { spec, reason }),
        };
        let kind = wiring.kind();
        let handle = match wiring {
            Wiring::Audio(from, to) => ConnectionHandle::audio(Rc::clone(engine), from, to)?,
            Wiring::Event(emitter, notify) => ConnectionHandle::event(emitter, Rc::clone(notify)),
        };

        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        tracing::debug!(%id, %spec, kind = %kind, "graph_connect");
        self.connections.insert(
            id,
            Connection {
                id,
                spec,
                kind,
                handle,
            },
        );
        Ok(id)
    }

    /// Undoes a connection and drops its record.
    ///
    /// If the engine refuses to undo the route, the record stays (the route
    /// is still live) and the error is returned.
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<(), PatchError> {
        let connection = self
            .connections
            .get(&id)
            .ok_or(PatchError::UnknownConnection(id))?;
        connection.handle.release()?;
        self.connections.remove(&id);
        tracing::debug!(%id, "graph_disconnect");
        Ok(())
    }

    /// Drops a connection whose endpoint unit is going away. Engine
    /// failures are logged; the unit's nodes are released right after.
    pub(crate) fn sever(&mut self, id: ConnectionId) {
        if let Some(connection) = self.connections.remove(&id) {
            if let Err(err) = connection.handle.release() {
                tracing::warn!(%id, error = %err, "engine refused to undo connection");
            }
            tracing::debug!(%id, "graph_disconnect");
        }
    }

    /// Looks up a connection.
    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Finds the live connection with exactly these endpoints.
    pub fn find(&self, spec: &ConnectionSpec) -> Option<ConnectionId> {
        self.connections
            .values()
            .find(|c| &c.spec == spec)
            .map(|c| c.id)
    }

    /// Ids of every connection touching `unit`.
    pub fn touching(&self, unit: &UnitId) -> Vec<ConnectionId> {
        self.connections
            .values()
            .filter(|c| c.spec.touches(unit))
            .map(|c| c.id)
            .collect()
    }

    /// Live connections in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if there are no live connections.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_core::OfflineEngine;
    use std::cell::Cell;

    fn engine() -> (Rc<OfflineEngine>, Rc<dyn AudioEngine>) {
        let engine = Rc::new(OfflineEngine::new());
        let dyn_engine: Rc<dyn AudioEngine> = engine.clone();
        (engine, dyn_engine)
    }

    fn spec() -> ConnectionSpec {
        ConnectionSpec::new("a", "out", "b", "in")
    }

    #[test]
    fn test_validate_reasons() {
        let manager = ConnectionManager::new();
        let audio_out = OutputPort::Audio(NodeHandle(1));
        let event_in = InputPort::Event(Rc::new(|_, _| {}));

        assert_eq!(
            manager.validate(&spec(), None, Some(&event_in)),
            Err(InvalidReason::MissingOutput("out".into()))
        );
        assert_eq!(
            manager.validate(&spec(), Some(&audio_out), None),
            Err(InvalidReason::MissingInput("in".into()))
        );
        assert_eq!(
            manager.validate(&spec(), Some(&audio_out), Some(&event_in)),
            Err(InvalidReason::KindMismatch {
                from: PortKind::AudioStream,
                to: PortKind::DiscreteEvent
            })
        );
    }

    #[test]
    fn test_event_connect_and_disconnect() {
        let (_engine, dyn_engine) = engine();
        let mut manager = ConnectionManager::new();
        let emitter = EventEmitter::new();
        let hits = Rc::new(Cell::new(0));
        let seen = Rc::clone(&hits);
        let output = OutputPort::Event(emitter.clone());
        let input = InputPort::Event(Rc::new(move |_, _| seen.set(seen.get() + 1)));

        let id = manager
            .connect(&dyn_engine, spec(), Some(&output), Some(&input))
            .unwrap();
        assert_eq!(id.to_string(), "c1");
        assert_eq!(
            manager.validate(&spec(), Some(&output), Some(&input)),
            Err(InvalidReason::Duplicate)
        );

        emitter.emit(0.0, true);
        manager.disconnect(id).unwrap();
        emitter.emit(1.0, true);
        assert_eq!(hits.get(), 1);
        assert!(matches!(
            manager.disconnect(id),
            Err(PatchError::UnknownConnection(_))
        ));
    }

    #[test]
    fn test_engine_failure_leaves_no_record() {
        let (engine, dyn_engine) = engine();
        let mut manager = ConnectionManager::new();
        let a = engine.create_node("a").unwrap();
        let b = engine.create_node("b").unwrap();
        let output = OutputPort::Audio(a);
        let input = InputPort::Audio(b);

        engine.fail_next_connect();
        let err = manager
            .connect(&dyn_engine, spec(), Some(&output), Some(&input))
            .unwrap_err();
        assert!(matches!(err, PatchError::Engine(_)));
        assert!(manager.is_empty());
        assert!(manager.validate(&spec(), Some(&output), Some(&input)).is_ok());
    }

    #[test]
    fn test_failed_disconnect_keeps_record() {
        let (engine, dyn_engine) = engine();
        let mut manager = ConnectionManager::new();
        let a = engine.create_node("a").unwrap();
        let b = engine.create_node("b").unwrap();
        let id = manager
            .connect(
                &dyn_engine,
                spec(),
                Some(&OutputPort::Audio(a)),
                Some(&InputPort::Audio(b)),
            )
            .unwrap();

        engine.fail_next_disconnect();
        assert!(manager.disconnect(id).is_err());
        assert!(manager.get(id).is_some());
        assert!(engine.is_linked(a, b));

        manager.disconnect(id).unwrap();
        assert!(!engine.is_linked(a, b));
    }
}
