//! The patch graph.
//!
//! [`PatchGraph`] owns unit instances (nodes) and connections (edges). It
//! assigns stable unit ids, keeps display names unique, tracks display
//! order, and hosts the two boundary pseudo-units used when the patch is
//! embedded in a rack.
//!
//! # Invariants
//!
//! - Unit ids are never reused within one graph instance.
//! - Display names are unique: `Name`, `Name 2`, `Name 3`, ...
//! - Every connection references two live units.
//! - [`load`](PatchGraph::load) either replaces the whole graph or leaves it
//!   untouched.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use patchbay_core::{InputPort, OutputPort, PortKind, Ports, Unit, UnitContext, UnitError, Value};
use patchbay_registry::{RESERVED_PREFIX, UnitRegistry};

use crate::boundary::{Boundary, BoundarySide};
use crate::connection::{Connection, ConnectionManager, ConnectionSpec};
use crate::document::{PatchDocument, UnitEntry};
use crate::error::PatchError;
use crate::id::{ConnectionId, UnitId};

enum Instance {
    Unit(Box<dyn Unit>),
    Boundary(Boundary),
}

impl Instance {
    fn unit(&self) -> &dyn Unit {
        match self {
            Instance::Unit(unit) => unit.as_ref(),
            Instance::Boundary(boundary) => boundary,
        }
    }

    fn unit_mut(&mut self) -> &mut dyn Unit {
        match self {
            Instance::Unit(unit) => unit.as_mut(),
            Instance::Boundary(boundary) => boundary,
        }
    }
}

/// A unit living in a graph.
pub struct UnitRecord {
    id: UnitId,
    type_id: String,
    display_name: String,
    instance: Instance,
}

impl UnitRecord {
    /// Unit id.
    pub fn id(&self) -> &UnitId {
        &self.id
    }

    /// Type id the unit was created from.
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Unique display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Declared ports.
    pub fn ports(&self) -> &Ports {
        self.instance.unit().ports()
    }

    /// Current settings snapshot (`Null` when the unit has none).
    pub fn settings(&self) -> Value {
        self.instance.unit().save().unwrap_or_default()
    }

    /// The unit instance.
    pub fn unit(&self) -> &dyn Unit {
        self.instance.unit()
    }

    /// Returns true for the two boundary pseudo-units.
    pub fn is_boundary(&self) -> bool {
        matches!(self.instance, Instance::Boundary(_))
    }
}

impl fmt::Debug for UnitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitRecord")
            .field("id", &self.id)
            .field("type_id", &self.type_id)
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Parameters of [`PatchGraph::add_unit_with`].
#[derive(Debug, Clone)]
pub struct NewUnit {
    type_id: String,
    settings: Option<Value>,
    id: Option<UnitId>,
    display_name: Option<String>,
}

impl NewUnit {
    /// A unit of `type_id` with default settings, a fresh id and the type's
    /// default name.
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            settings: None,
            id: None,
            display_name: None,
        }
    }

    /// Settings handed to the factory.
    pub fn settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Explicit unit id.
    pub fn id(mut self, id: impl Into<UnitId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Requested display name, suffixed if already taken.
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Units, connections, ordering and naming of one patch.
pub struct PatchGraph {
    registry: Rc<UnitRegistry>,
    context: UnitContext,
    units: BTreeMap<UnitId, UnitRecord>,
    order: Vec<UnitId>,
    connections: ConnectionManager,
    used_ids: BTreeSet<UnitId>,
    next_unit: u64,
}

impl PatchGraph {
    /// Creates an empty graph building units from `registry`.
    pub fn new(registry: Rc<UnitRegistry>, context: UnitContext) -> Self {
        Self {
            registry,
            context,
            units: BTreeMap::new(),
            order: Vec::new(),
            connections: ConnectionManager::new(),
            used_ids: BTreeSet::new(),
            next_unit: 0,
        }
    }

    /// Registry units are created from.
    pub fn registry(&self) -> &Rc<UnitRegistry> {
        &self.registry
    }

    /// Engine and reactor handed to unit factories.
    pub fn context(&self) -> &UnitContext {
        &self.context
    }

    // --- Units ---

    /// Adds a unit of `type_id` with a fresh id and default name.
    pub fn add_unit(&mut self, type_id: &str, settings: Option<Value>) -> Result<UnitId, PatchError> {
        let mut new = NewUnit::new(type_id);
        new.settings = settings;
        self.add_unit_with(new)
    }

    /// Adds a unit.
    ///
    /// Reserved boundary type ids (`__inputs` / `__outputs`) create the
    /// matching boundary pseudo-unit, at most one per side.
    pub fn add_unit_with(&mut self, new: NewUnit) -> Result<UnitId, PatchError> {
        let NewUnit {
            type_id,
            settings,
            id,
            display_name,
        } = new;
        let side = BoundarySide::from_type_id(&type_id);

        let id = match (side, id) {
            (Some(side), Some(id)) if id != side.unit_id() => return Err(PatchError::ReservedUnit(id)),
            (Some(side), _) => {
                let id = UnitId::new(side.unit_id());
                if self.units.contains_key(&id) {
                    return Err(PatchError::DuplicateBoundary(side));
                }
                id
            }
            (None, Some(id)) => {
                if id.as_str().starts_with(RESERVED_PREFIX) {
                    return Err(PatchError::ReservedUnit(id));
                }
                if self.used_ids.contains(&id) {
                    return Err(PatchError::DuplicateUnitId(id));
                }
                id
            }
            (None, None) => self.fresh_id(),
        };

        let (instance, default_name) = match side {
            Some(side) => {
                let settings = settings.unwrap_or_default();
                let boundary =
                    Boundary::from_settings(side, Rc::clone(&self.context.engine), &settings)
                        .map_err(|source| PatchError::UnitCreation {
                            type_id: type_id.clone(),
                            source,
                        })?;
                (Instance::Boundary(boundary), side.display_name())
            }
            None => {
                let unit = self
                    .registry
                    .create(&type_id, &self.context, settings.as_ref())?;
                let name = self.registry.get(&type_id).map_or("Unit", |d| d.name);
                (Instance::Unit(unit), name)
            }
        };

        let display_name = self.unique_name(display_name.as_deref().unwrap_or(default_name), None);
        tracing::debug!(unit = %id, type_id = type_id.as_str(), name = display_name.as_str(), "graph_add");

        if side.is_none() {
            self.used_ids.insert(id.clone());
        }
        self.order.push(id.clone());
        self.units.insert(
            id.clone(),
            UnitRecord {
                id: id.clone(),
                type_id,
                display_name,
                instance,
            },
        );
        Ok(id)
    }

    fn fresh_id(&mut self) -> UnitId {
        loop {
            self.next_unit += 1;
            let id = UnitId::new(format!("u{}", self.next_unit));
            if !self.used_ids.contains(&id) {
                return id;
            }
        }
    }

    fn unique_name(&self, base: &str, except: Option<&UnitId>) -> String {
        let taken = |name: &str| {
            self.units
                .values()
                .any(|r| r.display_name == name && Some(&r.id) != except)
        };
        if !taken(base) {
            return base.to_string();
        }
        (2u64..)
            .map(|n| format!("{base} {n}"))
            .find(|name| !taken(name))
            .unwrap_or_else(|| base.to_string())
    }

    /// Removes a unit: every connection touching it first, then its
    /// teardown hook, then the record.
    pub fn remove_unit(&mut self, id: &UnitId) -> Result<(), PatchError> {
        let record = self
            .units
            .get(id)
            .ok_or_else(|| PatchError::UnknownUnit(id.clone()))?;
        if record.is_boundary() {
            return Err(PatchError::ReservedUnit(id.clone()));
        }
        self.remove_record(id);
        Ok(())
    }

    fn remove_record(&mut self, id: &UnitId) {
        for connection in self.connections.touching(id) {
            self.connections.sever(connection);
        }
        if let Some(mut record) = self.units.remove(id) {
            record.instance.unit_mut().teardown();
        }
        self.order.retain(|u| u != id);
        tracing::debug!(unit = %id, "graph_remove");
    }

    /// Removes every unit, boundaries included. Unit ids stay used.
    pub fn clear(&mut self) {
        for id in self.order.clone().iter().rev() {
            self.remove_record(id);
        }
    }

    /// Looks up a unit.
    pub fn unit(&self, id: &UnitId) -> Option<&UnitRecord> {
        self.units.get(id)
    }

    /// Looks up a unit and downcasts it to its concrete type.
    pub fn unit_as<T: Any>(&self, id: &UnitId) -> Option<&T> {
        self.units.get(id)?.unit().as_any().downcast_ref::<T>()
    }

    /// Display name of a unit.
    pub fn display_name(&self, id: &UnitId) -> Option<&str> {
        self.units.get(id).map(UnitRecord::display_name)
    }

    /// Renames a unit, suffixing the name if another unit holds it.
    /// Returns the name actually assigned.
    pub fn rename_unit(&mut self, id: &UnitId, name: &str) -> Result<String, PatchError> {
        if !self.units.contains_key(id) {
            return Err(PatchError::UnknownUnit(id.clone()));
        }
        let name = self.unique_name(name, Some(id));
        if let Some(record) = self.units.get_mut(id) {
            record.display_name.clone_from(&name);
        }
        Ok(name)
    }

    /// Moves a unit to `index` in display order (clamped to the end).
    pub fn move_unit(&mut self, id: &UnitId, index: usize) -> Result<(), PatchError> {
        let from = self
            .order
            .iter()
            .position(|u| u == id)
            .ok_or_else(|| PatchError::UnknownUnit(id.clone()))?;
        let unit = self.order.remove(from);
        let index = index.min(self.order.len());
        self.order.insert(index, unit);
        Ok(())
    }

    /// Units in display order.
    pub fn units(&self) -> impl Iterator<Item = &UnitRecord> {
        self.order.iter().filter_map(|id| self.units.get(id))
    }

    /// Unit ids in display order.
    pub fn unit_order(&self) -> &[UnitId] {
        &self.order
    }

    /// Returns whether a unit with this id is live.
    pub fn contains_unit(&self, id: &UnitId) -> bool {
        self.units.contains_key(id)
    }

    /// Number of live units, boundaries included.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if the graph has no units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    // --- Boundaries ---

    /// Adds the boundary pseudo-unit for `side`.
    pub fn add_boundary(&mut self, side: BoundarySide) -> Result<UnitId, PatchError> {
        self.add_unit_with(NewUnit::new(side.type_id()))
    }

    /// Adds a port to a boundary, creating the boundary pseudo-unit first if
    /// the graph has none on that side yet.
    pub fn add_boundary_port(
        &mut self,
        side: BoundarySide,
        name: &str,
        kind: PortKind,
    ) -> Result<(), PatchError> {
        let id = UnitId::new(side.unit_id());
        if !self.units.contains_key(&id) {
            self.add_boundary(side)?;
        }
        let Some(Instance::Boundary(boundary)) = self.units.get_mut(&id).map(|r| &mut r.instance)
        else {
            return Err(PatchError::UnknownUnit(id));
        };
        boundary.add_port(name, kind).map_err(|err| match err {
            UnitError::DuplicatePort(port) => PatchError::DuplicatePort {
                unit: id.clone(),
                port,
            },
            UnitError::Engine(err) => PatchError::Engine(err),
            source => PatchError::UnitCreation {
                type_id: side.type_id().to_string(),
                source,
            },
        })?;
        tracing::debug!(side = %side, port = name, kind = %kind, "boundary port added");
        Ok(())
    }

    /// The boundary pseudo-unit for `side`, if present.
    pub fn boundary(&self, side: BoundarySide) -> Option<&Boundary> {
        match self.units.get(side.unit_id()).map(|r| &r.instance) {
            Some(Instance::Boundary(boundary)) => Some(boundary),
            _ => None,
        }
    }

    /// The ports this patch exposes when embedded: exterior inputs of the
    /// inputs boundary and exterior outputs of the outputs boundary.
    pub fn boundary_ports(&self) -> Ports {
        let mut ports = Ports::new();
        if let Some(inputs) = self.boundary(BoundarySide::Inputs) {
            ports.inputs = inputs.exterior().inputs.clone();
        }
        if let Some(outputs) = self.boundary(BoundarySide::Outputs) {
            ports.outputs = outputs.exterior().outputs.clone();
        }
        ports
    }

    // --- Connections ---

    fn endpoints(
        &self,
        spec: &ConnectionSpec,
    ) -> Result<(Option<&OutputPort>, Option<&InputPort>), PatchError> {
        let src = self
            .units
            .get(&spec.src_unit)
            .ok_or_else(|| PatchError::UnknownUnit(spec.src_unit.clone()))?;
        let dst = self
            .units
            .get(&spec.dst_unit)
            .ok_or_else(|| PatchError::UnknownUnit(spec.dst_unit.clone()))?;
        Ok((
            src.ports().outputs.get(&spec.src_port),
            dst.ports().inputs.get(&spec.dst_port),
        ))
    }

    /// Checks a candidate connection and reports why it would fail.
    pub fn validate(&self, spec: &ConnectionSpec) -> Result<PortKind, PatchError> {
        let (output, input) = self.endpoints(spec)?;
        self.connections
            .validate(spec, output, input)
            .map_err(|reason| PatchError::InvalidConnection {
                spec: spec.clone(),
                reason,
            })
    }

    /// Returns whether `connect(spec)` would pass validation.
    pub fn is_valid(&self, spec: &ConnectionSpec) -> bool {
        self.validate(spec).is_ok()
    }

    /// Validates and wires a connection.
    pub fn connect(&mut self, spec: ConnectionSpec) -> Result<ConnectionId, PatchError> {
        let src = self
            .units
            .get(&spec.src_unit)
            .ok_or_else(|| PatchError::UnknownUnit(spec.src_unit.clone()))?;
        let dst = self
            .units
            .get(&spec.dst_unit)
            .ok_or_else(|| PatchError::UnknownUnit(spec.dst_unit.clone()))?;
        let output = src.ports().outputs.get(&spec.src_port);
        let input = dst.ports().inputs.get(&spec.dst_port);
        self.connections
            .connect(&self.context.engine, spec, output, input)
    }

    /// Removes a connection.
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<(), PatchError> {
        self.connections.disconnect(id)
    }

    /// Live connections in creation order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Looks up a connection.
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    /// Connections touching `unit`.
    pub fn connections_of(&self, unit: &UnitId) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.spec().touches(unit))
            .collect()
    }

    /// Id of the live connection with exactly these endpoints.
    pub fn find_connection(&self, spec: &ConnectionSpec) -> Option<ConnectionId> {
        self.connections.find(spec)
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // --- Persistence ---

    /// Snapshots topology, settings, names and connections.
    pub fn save(&self) -> PatchDocument {
        let unit_map = self
            .units
            .values()
            .map(|record| {
                (
                    record.id.clone(),
                    UnitEntry {
                        type_id: record.type_id.clone(),
                        settings: record.settings(),
                        display_name: record.display_name.clone(),
                    },
                )
            })
            .collect();
        PatchDocument {
            unit_map,
            unit_order: self.order.clone(),
            connections: self.connections.iter().map(|c| c.spec().clone()).collect(),
        }
    }

    /// Replaces the graph with the one described by `doc`.
    ///
    /// The new graph is built off to the side and swapped in only once every
    /// unit and connection is in place; on error the current graph is left
    /// exactly as it was.
    pub fn load(&mut self, doc: &PatchDocument) -> Result<(), PatchError> {
        doc.validate()?;

        let mut fresh = PatchGraph::new(Rc::clone(&self.registry), self.context.clone());
        fresh.connections = ConnectionManager::starting_after(self.connections.last_id());
        for (id, entry) in doc.units() {
            let mut new = NewUnit::new(entry.type_id.as_str())
                .id(id.clone())
                .display_name(entry.display_name.as_str());
            if !entry.settings.is_null() {
                new = new.settings(entry.settings.clone());
            }
            fresh.add_unit_with(new)?;
        }
        for spec in &doc.connections {
            fresh.connect(spec.clone())?;
        }

        fresh.used_ids.extend(self.used_ids.iter().cloned());
        fresh.next_unit = fresh.next_unit.max(self.next_unit);
        // The old graph is torn down when dropped.
        drop(std::mem::replace(self, fresh));

        tracing::info!(
            units = self.units.len(),
            connections = self.connections.len(),
            "patch loaded"
        );
        Ok(())
    }
}

impl Drop for PatchGraph {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for PatchGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchGraph")
            .field("units", &self.order)
            .field("connections", &self.connections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_core::{OfflineEngine, Reactor, SchedulerConfig};
    use patchbay_units::{Counter, Gain};

    fn graph() -> (Rc<OfflineEngine>, PatchGraph) {
        let engine = Rc::new(OfflineEngine::new());
        let reactor = Reactor::new(engine.clone(), SchedulerConfig::default());
        let context = UnitContext::new(engine.clone(), reactor);
        (engine, PatchGraph::new(Rc::new(UnitRegistry::new()), context))
    }

    #[test]
    fn test_ids_are_never_reused() {
        let (_engine, mut graph) = graph();
        let a = graph.add_unit("gain", None).unwrap();
        assert_eq!(a, "u1");
        graph.remove_unit(&a).unwrap();
        let b = graph.add_unit("gain", None).unwrap();
        assert_eq!(b, "u2");

        let err = graph
            .add_unit_with(NewUnit::new("gain").id("u1"))
            .unwrap_err();
        assert!(matches!(err, PatchError::DuplicateUnitId(_)));
    }

    #[test]
    fn test_explicit_ids_are_skipped_by_generator() {
        let (_engine, mut graph) = graph();
        graph.add_unit_with(NewUnit::new("gain").id("u1")).unwrap();
        assert_eq!(graph.add_unit("gain", None).unwrap(), "u2");
    }

    #[test]
    fn test_display_names_are_suffixed() {
        let (_engine, mut graph) = graph();
        let a = graph.add_unit("counter", None).unwrap();
        let b = graph.add_unit("counter", None).unwrap();
        let c = graph.add_unit("counter", None).unwrap();
        assert_eq!(graph.display_name(&a), Some("Counter"));
        assert_eq!(graph.display_name(&b), Some("Counter 2"));
        assert_eq!(graph.display_name(&c), Some("Counter 3"));

        graph.remove_unit(&b).unwrap();
        let d = graph.add_unit("counter", None).unwrap();
        assert_eq!(graph.display_name(&d), Some("Counter 2"));
    }

    #[test]
    fn test_rename_keeps_names_unique() {
        let (_engine, mut graph) = graph();
        let a = graph.add_unit("gain", None).unwrap();
        let b = graph.add_unit("gain", None).unwrap();
        assert_eq!(graph.rename_unit(&b, "Gain").unwrap(), "Gain 2");
        assert_eq!(graph.rename_unit(&a, "Gain").unwrap(), "Gain");
        assert_eq!(graph.rename_unit(&a, "Main").unwrap(), "Main");
        assert!(graph.rename_unit(&UnitId::new("u9"), "x").is_err());
    }

    #[test]
    fn test_unknown_type_and_unit() {
        let (_engine, mut graph) = graph();
        assert!(matches!(
            graph.add_unit("theremin", None),
            Err(PatchError::UnknownType(_))
        ));
        assert!(matches!(
            graph.remove_unit(&UnitId::new("u1")),
            Err(PatchError::UnknownUnit(_))
        ));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_factory_failure_adds_nothing() {
        let (_engine, mut graph) = graph();
        let err = graph
            .add_unit("sequencer", Some(Value::map().with("steps", 0)))
            .unwrap_err();
        assert!(matches!(err, PatchError::UnitCreation { .. }));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_audio_to_event_is_invalid() {
        let (_engine, mut graph) = graph();
        let gain = graph.add_unit("gain", None).unwrap();
        let counter = graph.add_unit("counter", None).unwrap();
        let spec = ConnectionSpec::new(gain, "audio", counter, "gate");

        assert!(!graph.is_valid(&spec));
        assert!(matches!(
            graph.connect(spec),
            Err(PatchError::InvalidConnection { .. })
        ));
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_connect_unknown_unit() {
        let (_engine, mut graph) = graph();
        let gain = graph.add_unit("gain", None).unwrap();
        let spec = ConnectionSpec::new(gain, "audio", "u7", "audio");
        assert!(!graph.is_valid(&spec));
        assert!(matches!(graph.connect(spec), Err(PatchError::UnknownUnit(_))));
    }

    #[test]
    fn test_remove_unit_drops_its_connections() {
        let (engine, mut graph) = graph();
        let a = graph.add_unit("gain", None).unwrap();
        let b = graph.add_unit("gain", None).unwrap();
        let c = graph.add_unit("gain", None).unwrap();
        graph
            .connect(ConnectionSpec::new(a.clone(), "audio", b.clone(), "audio"))
            .unwrap();
        graph
            .connect(ConnectionSpec::new(b.clone(), "audio", c.clone(), "audio"))
            .unwrap();
        graph
            .connect(ConnectionSpec::new(a.clone(), "audio", c.clone(), "audio"))
            .unwrap();

        graph.remove_unit(&b).unwrap();
        assert!(graph.connections_of(&b).is_empty());
        assert_eq!(graph.connection_count(), 1);
        assert_eq!(engine.node_count(), 2);
        assert_eq!(engine.link_count(), 1);
    }

    #[test]
    fn test_move_unit() {
        let (_engine, mut graph) = graph();
        let a = graph.add_unit("gain", None).unwrap();
        let b = graph.add_unit("gain", None).unwrap();
        let c = graph.add_unit("gain", None).unwrap();
        graph.move_unit(&c, 0).unwrap();
        assert_eq!(graph.unit_order(), &[c.clone(), a.clone(), b.clone()]);
        graph.move_unit(&c, 99).unwrap();
        assert_eq!(graph.unit_order(), &[a, b, c]);
    }

    #[test]
    fn test_unit_as_downcasts() {
        let (_engine, mut graph) = graph();
        let gain = graph.add_unit("gain", Some(Value::map().with("gain", 2.0))).unwrap();
        assert_eq!(graph.unit_as::<Gain>(&gain).map(Gain::gain), Some(2.0));
        assert!(graph.unit_as::<Counter>(&gain).is_none());
    }

    #[test]
    fn test_boundaries() {
        let (_engine, mut graph) = graph();
        graph
            .add_boundary_port(BoundarySide::Inputs, "in", PortKind::AudioStream)
            .unwrap();
        graph
            .add_boundary_port(BoundarySide::Outputs, "gate", PortKind::DiscreteEvent)
            .unwrap();

        let err = graph
            .add_boundary_port(BoundarySide::Inputs, "in", PortKind::DiscreteEvent)
            .unwrap_err();
        assert!(matches!(err, PatchError::DuplicatePort { ref port, .. } if port == "in"));
        assert!(matches!(
            graph.add_boundary(BoundarySide::Inputs),
            Err(PatchError::DuplicateBoundary(BoundarySide::Inputs))
        ));
        assert!(matches!(
            graph.remove_unit(&UnitId::new("__in")),
            Err(PatchError::ReservedUnit(_))
        ));
        assert!(matches!(
            graph.add_unit_with(NewUnit::new("gain").id("__x")),
            Err(PatchError::ReservedUnit(_))
        ));

        let ports = graph.boundary_ports();
        assert!(ports.inputs.contains("in"));
        assert!(ports.outputs.contains("gate"));
        assert_eq!(graph.display_name(&UnitId::new("__out")), Some("Outputs"));
    }

    #[test]
    fn test_failed_load_keeps_graph() {
        let (_engine, mut graph) = graph();
        let gain = graph.add_unit("gain", None).unwrap();
        let before = graph.save();

        let mut doc = before.clone();
        doc.unit_map.insert(
            UnitId::new("u9"),
            UnitEntry {
                type_id: "theremin".into(),
                settings: Value::Null,
                display_name: "Theremin".into(),
            },
        );
        doc.unit_order.push(UnitId::new("u9"));

        assert!(matches!(graph.load(&doc), Err(PatchError::UnknownType(_))));
        assert_eq!(graph.save(), before);
        assert!(graph.contains_unit(&gain));
    }

    #[test]
    fn test_load_replaces_and_tears_down() {
        let (engine, mut graph) = graph();
        graph.add_unit("gain", None).unwrap();
        graph.add_unit("gain", None).unwrap();
        assert_eq!(engine.node_count(), 2);

        let mut other = PatchDocument::new();
        other.unit_map.insert(
            UnitId::new("u5"),
            UnitEntry {
                type_id: "counter".into(),
                settings: Value::Null,
                display_name: "Hits".into(),
            },
        );
        other.unit_order.push(UnitId::new("u5"));

        graph.load(&other).unwrap();
        assert_eq!(engine.node_count(), 0);
        assert_eq!(graph.save(), other);
        // Ids of the replaced graph stay used.
        assert_eq!(graph.add_unit("gain", None).unwrap(), "u3");
    }
}
