//! Boundary pseudo-units.
//!
//! A patch that is embedded as a reusable unit exposes its own ports through
//! two reserved pseudo-units: `__in` carries the signals entering the patch
//! and `__out` the signals leaving it. Each boundary port has two faces: an
//! inner face wired like any other unit port inside the patch, and an
//! exterior face the embedding graph connects to.
//!
//! Audio boundary ports share one engine `passthrough` node between both
//! faces. Event boundary ports forward every exterior event through an
//! emitter on the inner face (or the reverse, for outputs).

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use patchbay_core::{
    AudioEngine, EventEmitter, InputPort, NodeHandle, OutputPort, PortKind, Ports, Unit,
    UnitError, Value,
};

/// Which boundary a pseudo-unit represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundarySide {
    /// Signals entering the patch.
    Inputs,
    /// Signals leaving the patch.
    Outputs,
}

impl BoundarySide {
    /// Both sides.
    pub const ALL: [BoundarySide; 2] = [BoundarySide::Inputs, BoundarySide::Outputs];

    /// Reserved type id stored in patch documents.
    pub const fn type_id(&self) -> &'static str {
        match self {
            BoundarySide::Inputs => "__inputs",
            BoundarySide::Outputs => "__outputs",
        }
    }

    /// Reserved unit id of the pseudo-unit.
    pub const fn unit_id(&self) -> &'static str {
        match self {
            BoundarySide::Inputs => "__in",
            BoundarySide::Outputs => "__out",
        }
    }

    /// Default display name.
    pub const fn display_name(&self) -> &'static str {
        match self {
            BoundarySide::Inputs => "Inputs",
            BoundarySide::Outputs => "Outputs",
        }
    }

    /// Parses a reserved type id.
    pub fn from_type_id(type_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|side| side.type_id() == type_id)
    }
}

impl fmt::Display for BoundarySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundarySide::Inputs => f.write_str("inputs"),
            BoundarySide::Outputs => f.write_str("outputs"),
        }
    }
}

/// One side of a patch's own ports.
pub struct Boundary {
    side: BoundarySide,
    engine: Rc<dyn AudioEngine>,
    inner: Ports,
    exterior: Ports,
    declared: Vec<(String, PortKind)>,
    nodes: Vec<NodeHandle>,
}

impl Boundary {
    pub(crate) fn new(side: BoundarySide, engine: Rc<dyn AudioEngine>) -> Self {
        Self {
            side,
            engine,
            inner: Ports::new(),
            exterior: Ports::new(),
            declared: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Rebuilds a boundary from its saved settings (`{ ports: [{ name, kind }] }`).
    pub(crate) fn from_settings(
        side: BoundarySide,
        engine: Rc<dyn AudioEngine>,
        settings: &Value,
    ) -> Result<Self, UnitError> {
        let mut boundary = Self::new(side, engine);
        let ports = match settings.get("ports") {
            None | Some(Value::Null) => return Ok(boundary),
            Some(ports) => ports
                .as_list()
                .ok_or_else(|| UnitError::invalid_setting("ports", "expected a list"))?,
        };
        let added = ports.iter().try_for_each(|entry| {
            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| UnitError::invalid_setting("ports", "port without a name"))?;
            let kind = entry
                .get("kind")
                .and_then(Value::as_str)
                .ok_or_else(|| UnitError::invalid_setting("ports", "port without a kind"))?
                .parse::<PortKind>()?;
            boundary.add_port(name, kind)
        });
        match added {
            Ok(()) => Ok(boundary),
            Err(err) => {
                // Nodes for the ports added so far are not owned by any graph yet.
                boundary.teardown();
                Err(err)
            }
        }
    }

    /// Adds a port to both faces.
    pub fn add_port(&mut self, name: &str, kind: PortKind) -> Result<(), UnitError> {
        if self.declared.iter().any(|(n, _)| n == name) {
            return Err(UnitError::DuplicatePort(name.to_string()));
        }

        match (self.side, kind) {
            (side, PortKind::AudioStream) => {
                let node = self.engine.create_node("passthrough")?;
                self.nodes.push(node);
                match side {
                    BoundarySide::Inputs => {
                        self.inner.outputs.insert(name, OutputPort::Audio(node))?;
                        self.exterior.inputs.insert(name, InputPort::Audio(node))?;
                    }
                    BoundarySide::Outputs => {
                        self.inner.inputs.insert(name, InputPort::Audio(node))?;
                        self.exterior.outputs.insert(name, OutputPort::Audio(node))?;
                    }
                }
            }
            (BoundarySide::Inputs, PortKind::DiscreteEvent) => {
                let emitter = EventEmitter::new();
                let forward = emitter.clone();
                self.inner.outputs.insert(name, OutputPort::Event(emitter))?;
                self.exterior.inputs.insert(
                    name,
                    InputPort::Event(Rc::new(move |time, gate| forward.emit(time, gate))),
                )?;
            }
            (BoundarySide::Outputs, PortKind::DiscreteEvent) => {
                let emitter = EventEmitter::new();
                let forward = emitter.clone();
                self.inner.inputs.insert(
                    name,
                    InputPort::Event(Rc::new(move |time, gate| forward.emit(time, gate))),
                )?;
                self.exterior.outputs.insert(name, OutputPort::Event(emitter))?;
            }
        }

        self.declared.push((name.to_string(), kind));
        Ok(())
    }

    /// Which side this is.
    pub fn side(&self) -> BoundarySide {
        self.side
    }

    /// Ports as seen from the embedding graph.
    pub fn exterior(&self) -> &Ports {
        &self.exterior
    }

    /// Declared `(name, kind)` pairs in declaration order.
    pub fn declared(&self) -> &[(String, PortKind)] {
        &self.declared
    }
}

impl Unit for Boundary {
    fn ports(&self) -> &Ports {
        &self.inner
    }

    fn save(&self) -> Option<Value> {
        let ports: Vec<Value> = self
            .declared
            .iter()
            .map(|(name, kind)| {
                Value::map()
                    .with("name", name.as_str())
                    .with("kind", kind.as_str())
            })
            .collect();
        Some(Value::map().with("ports", ports))
    }

    fn teardown(&mut self) {
        for node in self.nodes.drain(..) {
            self.engine.release_node(node);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Boundary")
            .field("side", &self.side)
            .field("ports", &self.declared)
            .finish()
    }
}
