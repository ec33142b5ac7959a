//! Unit registry and factory for patchbay patches.
//!
//! This crate maps a unit type id to a factory that builds the unit. Saved
//! patches reference units only by type id, so the registry is the single
//! place where a document turns back into running code.
//!
//! # Features
//!
//! - **Unit Discovery**: List all registered unit types with metadata
//! - **Factory Pattern**: Create units by type id at runtime
//! - **Category System**: Unit types organized by role (timing, sources, ...)
//! - **Append-only**: Types can be added but never removed or replaced
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use patchbay_core::{OfflineEngine, Reactor, SchedulerConfig, UnitContext};
//! use patchbay_registry::{UnitCategory, UnitRegistry};
//!
//! let registry = Rc::new(UnitRegistry::new());
//!
//! for unit in registry.all_units() {
//!     println!("{}: {}", unit.id, unit.description);
//! }
//!
//! let engine = Rc::new(OfflineEngine::new());
//! let ctx = UnitContext::new(
//!     engine.clone(),
//!     Reactor::new(engine, SchedulerConfig::default()),
//! );
//! let gain = registry.create("gain", &ctx, None).unwrap();
//! assert!(gain.ports().inputs.contains("audio"));
//!
//! assert!(registry.create("theremin", &ctx, None).is_err());
//! ```

use std::fmt;
use std::rc::Rc;

use patchbay_core::{Unit, UnitContext, UnitError, Value};
use patchbay_units::{Clock, ClockConfig, Counter, Gain, Sampler, Sequencer};
use thiserror::Error;

/// Prefix reserved for pseudo-unit type ids owned by the graph.
pub const RESERVED_PREFIX: &str = "__";

/// Category of unit type for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitCategory {
    /// Clocks and other timed event generators
    Timing,
    /// Pattern and step sequencers
    Sequencing,
    /// Units that produce audio
    Source,
    /// Gain stages, counters and other helpers
    Utility,
    /// Units that contain other patches
    Structure,
}

impl UnitCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            UnitCategory::Timing => "Timing",
            UnitCategory::Sequencing => "Sequencing",
            UnitCategory::Source => "Source",
            UnitCategory::Utility => "Utility",
            UnitCategory::Structure => "Structure",
        }
    }

    /// Returns a description of the category.
    pub const fn description(&self) -> &'static str {
        match self {
            UnitCategory::Timing => "Clocks and other generators of timed gate events",
            UnitCategory::Sequencing => "Step sequencers and pattern players",
            UnitCategory::Source => "Samplers and other units that produce audio",
            UnitCategory::Utility => "Gain stages, counters and routing helpers",
            UnitCategory::Structure => "Units that wrap a whole patch",
        }
    }
}

/// Describes a unit type in the registry.
#[derive(Debug, Clone)]
pub struct UnitDescriptor {
    /// Unique type id stored in patch documents (lowercase, no spaces).
    pub id: &'static str,
    /// Human-readable name, also the default display name of new units.
    pub name: &'static str,
    /// Brief description of the unit.
    pub description: &'static str,
    /// Category for organization.
    pub category: UnitCategory,
}

/// Everything a factory gets to build one unit.
pub struct FactoryArgs<'a> {
    /// Engine and reactor the unit runs against.
    pub context: &'a UnitContext,
    /// Saved settings, if any.
    pub settings: Option<&'a Value>,
    /// The registry itself, for units that build nested patches.
    pub registry: &'a Rc<UnitRegistry>,
}

/// Factory function type for creating units.
pub type UnitFactory = Box<dyn Fn(&FactoryArgs<'_>) -> Result<Box<dyn Unit>, UnitError>>;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No factory is registered under this type id.
    #[error("unknown unit type '{0}'")]
    UnknownType(String),

    /// A factory is already registered under this type id.
    #[error("unit type '{0}' is already registered")]
    DuplicateType(String),

    /// The type id uses the prefix reserved for graph pseudo-units.
    #[error("unit type '{0}' uses a reserved prefix")]
    ReservedType(String),

    /// The factory refused the settings it was given.
    #[error("failed to create unit '{type_id}'")]
    Create {
        /// Type id passed to `create`.
        type_id: String,
        /// Why the factory failed.
        #[source]
        source: UnitError,
    },
}

/// Internal entry in the registry.
struct RegistryEntry {
    descriptor: UnitDescriptor,
    factory: UnitFactory,
}

/// Registry of all available unit types.
///
/// Build it mutably, then share it behind an `Rc`: [`create`](Self::create)
/// takes `self: &Rc<Self>` so nested-patch factories can keep a handle.
pub struct UnitRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitRegistry {
    /// Create a new registry with all built-in units registered.
    pub fn new() -> Self {
        Self::with_clock_config(ClockConfig::default())
    }

    /// Create a registry with the built-in units, using `clock` for every
    /// clock it creates.
    pub fn with_clock_config(clock: ClockConfig) -> Self {
        let mut registry = Self::empty();
        registry.register_builtin_units(clock);
        registry
    }

    /// Create a registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            entries: Vec::with_capacity(8),
        }
    }

    /// Register all built-in units.
    fn register_builtin_units(&mut self, clock: ClockConfig) {
        // Timing
        self.insert(
            UnitDescriptor {
                id: "clock",
                name: "Clock",
                description: "Tempo clock with sixteenth, eighth and quarter gate outputs",
                category: UnitCategory::Timing,
            },
            move |args| Ok(Box::new(Clock::new(args.context, clock, args.settings)?)),
        );

        // Sequencing
        self.insert(
            UnitDescriptor {
                id: "sequencer",
                name: "Sequencer",
                description: "Step sequencer advancing one step per clock edge",
                category: UnitCategory::Sequencing,
            },
            |args| Ok(Box::new(Sequencer::new(args.settings)?)),
        );

        // Sources
        self.insert(
            UnitDescriptor {
                id: "sampler",
                name: "Sampler",
                description: "One-shot sample player triggered by gates",
                category: UnitCategory::Source,
            },
            |args| Ok(Box::new(Sampler::new(args.context, args.settings)?)),
        );

        // Utility
        self.insert(
            UnitDescriptor {
                id: "gain",
                name: "Gain",
                description: "Linear gain stage",
                category: UnitCategory::Utility,
            },
            |args| Ok(Box::new(Gain::new(args.context, args.settings)?)),
        );
        self.insert(
            UnitDescriptor {
                id: "counter",
                name: "Counter",
                description: "Counts gate events and passes them through",
                category: UnitCategory::Utility,
            },
            |_| Ok(Box::new(Counter::new()?)),
        );
    }

    fn insert<F>(&mut self, descriptor: UnitDescriptor, factory: F)
    where
        F: Fn(&FactoryArgs<'_>) -> Result<Box<dyn Unit>, UnitError> + 'static,
    {
        self.entries.push(RegistryEntry {
            descriptor,
            factory: Box::new(factory),
        });
    }

    /// Register a unit type. Type ids are unique and never unregistered.
    pub fn register<F>(&mut self, descriptor: UnitDescriptor, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&FactoryArgs<'_>) -> Result<Box<dyn Unit>, UnitError> + 'static,
    {
        if descriptor.id.starts_with(RESERVED_PREFIX) {
            return Err(RegistryError::ReservedType(descriptor.id.to_string()));
        }
        if self.contains(descriptor.id) {
            return Err(RegistryError::DuplicateType(descriptor.id.to_string()));
        }
        tracing::debug!(type_id = descriptor.id, "unit type registered");
        self.insert(descriptor, factory);
        Ok(())
    }

    /// Get all registered unit descriptors, in registration order.
    pub fn all_units(&self) -> Vec<&UnitDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Get unit descriptors in a specific category.
    pub fn units_in_category(&self, category: UnitCategory) -> Vec<&UnitDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Get a unit descriptor by type id.
    pub fn get(&self, id: &str) -> Option<&UnitDescriptor> {
        self.entry(id).map(|e| &e.descriptor)
    }

    /// Returns whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entry(id).is_some()
    }

    fn entry(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.descriptor.id == id)
    }

    /// Create a unit by type id.
    pub fn create(
        self: &Rc<Self>,
        id: &str,
        context: &UnitContext,
        settings: Option<&Value>,
    ) -> Result<Box<dyn Unit>, RegistryError> {
        let entry = self
            .entry(id)
            .ok_or_else(|| RegistryError::UnknownType(id.to_string()))?;
        let args = FactoryArgs {
            context,
            settings,
            registry: self,
        };
        (entry.factory)(&args).map_err(|source| RegistryError::Create {
            type_id: id.to_string(),
            source,
        })
    }

    /// Get the number of registered unit types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.descriptor.id))
            .finish()
    }
}
