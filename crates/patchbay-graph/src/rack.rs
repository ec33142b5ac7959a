//! Nested patches as units.
//!
//! A [`Rack`] hosts a whole [`PatchGraph`] and shows up in the enclosing
//! graph as a single unit whose ports are the exterior faces of the inner
//! graph's boundary pseudo-units. Its settings are the inner patch document,
//! so saving a graph that contains racks captures every nesting level.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use patchbay_core::{Ports, Unit, UnitContext, UnitError, Value};
use patchbay_registry::{RegistryError, UnitCategory, UnitDescriptor, UnitRegistry};
use patchbay_units::ClockConfig;

use crate::document::PatchDocument;
use crate::error::PatchError;
use crate::graph::PatchGraph;

/// Type id racks are registered under.
pub const RACK_TYPE_ID: &str = "rack";

/// A unit wrapping a nested patch graph.
pub struct Rack {
    graph: PatchGraph,
    ports: Ports,
}

impl Rack {
    /// Builds the inner graph from a saved patch document. `None` or `Null`
    /// settings give an empty rack without ports.
    pub fn new(
        registry: &Rc<UnitRegistry>,
        context: &UnitContext,
        settings: Option<&Value>,
    ) -> Result<Self, PatchError> {
        let mut graph = PatchGraph::new(Rc::clone(registry), context.clone());
        if let Some(settings) = settings.filter(|v| !v.is_null()) {
            graph.load(&PatchDocument::from_value(settings)?)?;
        }
        let ports = graph.boundary_ports();
        Ok(Self { graph, ports })
    }

    /// The nested graph.
    pub fn graph(&self) -> &PatchGraph {
        &self.graph
    }
}

impl Unit for Rack {
    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn save(&self) -> Option<Value> {
        Some(self.graph.save().to_value())
    }

    fn teardown(&mut self) {
        self.graph.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Rack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rack").field("graph", &self.graph).finish()
    }
}

/// Registers the `rack` unit type.
pub fn register_rack(registry: &mut UnitRegistry) -> Result<(), RegistryError> {
    registry.register(
        UnitDescriptor {
            id: RACK_TYPE_ID,
            name: "Rack",
            description: "Nested patch exposed through its boundary ports",
            category: UnitCategory::Structure,
        },
        |args| {
            let rack = Rack::new(args.registry, args.context, args.settings)
                .map_err(|err| UnitError::Nested(Box::new(err)))?;
            Ok(Box::new(rack) as Box<dyn Unit>)
        },
    )
}

/// Builtin units plus racks, with the default clock configuration.
pub fn default_registry() -> Result<Rc<UnitRegistry>, RegistryError> {
    default_registry_with(ClockConfig::default())
}

/// Builtin units plus racks, with a custom clock configuration.
pub fn default_registry_with(clock: ClockConfig) -> Result<Rc<UnitRegistry>, RegistryError> {
    let mut registry = UnitRegistry::with_clock_config(clock);
    register_rack(&mut registry)?;
    Ok(Rc::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundarySide;
    use crate::connection::ConnectionSpec;
    use patchbay_core::{OfflineEngine, PortKind, Reactor, SchedulerConfig};

    fn context() -> (Rc<OfflineEngine>, UnitContext) {
        let engine = Rc::new(OfflineEngine::new());
        let reactor = Reactor::new(engine.clone(), SchedulerConfig::default());
        (engine.clone(), UnitContext::new(engine, reactor))
    }

    fn inner_patch(context: &UnitContext) -> Value {
        let mut inner = PatchGraph::new(default_registry().unwrap(), context.clone());
        inner
            .add_boundary_port(BoundarySide::Inputs, "in", PortKind::AudioStream)
            .unwrap();
        inner
            .add_boundary_port(BoundarySide::Outputs, "out", PortKind::AudioStream)
            .unwrap();
        let gain = inner
            .add_unit("gain", Some(Value::map().with("gain", 0.5)))
            .unwrap();
        inner
            .connect(ConnectionSpec::new("__in", "in", gain.clone(), "audio"))
            .unwrap();
        inner
            .connect(ConnectionSpec::new(gain, "audio", "__out", "out"))
            .unwrap();
        inner.save().to_value()
    }

    #[test]
    fn test_rack_exposes_boundary_ports() {
        let (_engine, context) = context();
        let registry = default_registry().unwrap();
        let rack = registry
            .create(RACK_TYPE_ID, &context, Some(&inner_patch(&context)))
            .unwrap();
        assert!(rack.ports().inputs.contains("in"));
        assert!(rack.ports().outputs.contains("out"));
    }

    #[test]
    fn test_rack_saves_inner_patch() {
        let (_engine, context) = context();
        let registry = default_registry().unwrap();
        let settings = inner_patch(&context);
        let rack = Rack::new(&registry, &context, Some(&settings)).unwrap();
        assert_eq!(rack.graph().len(), 3);
        assert_eq!(rack.save(), Some(settings));
    }

    #[test]
    fn test_empty_rack() {
        let (_engine, context) = context();
        let rack = Rack::new(&default_registry().unwrap(), &context, None).unwrap();
        assert!(rack.ports().inputs.is_empty());
        assert!(rack.graph().is_empty());
    }

    #[test]
    fn test_broken_inner_patch_fails_creation() {
        let (_engine, context) = context();
        let registry = default_registry().unwrap();
        let bad = Value::map()
            .with("unitMap", Value::map().with("u1", Value::map().with("typeId", "theremin").with("displayName", "T")))
            .with("unitOrder", vec![Value::from("u1")]);
        let err = registry.create(RACK_TYPE_ID, &context, Some(&bad)).err().expect("creating a rack from a broken patch should fail");
        let RegistryError::Create {
            source: UnitError::Nested(inner),
            ..
        } = err
        else {
            panic!("expected a nested creation error");
        };
        assert!(matches!(
            inner.downcast_ref::<PatchError>(),
            Some(PatchError::UnknownType(id)) if id == "theremin"
        ));
    }

    #[test]
    fn test_rack_cannot_be_registered_twice() {
        let mut registry = UnitRegistry::new();
        register_rack(&mut registry).unwrap();
        assert!(matches!(
            register_rack(&mut registry),
            Err(RegistryError::DuplicateType(_))
        ));
    }

    #[test]
    fn test_teardown_releases_inner_nodes() {
        let (engine, context) = context();
        let settings = inner_patch(&context);
        assert_eq!(engine.node_count(), 0);
        let mut rack = Rack::new(&default_registry().unwrap(), &context, Some(&settings)).unwrap();
        assert_eq!(engine.node_count(), 3);
        rack.teardown();
        assert_eq!(engine.node_count(), 0);
    }
}
