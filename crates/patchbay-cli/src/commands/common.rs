//! Shared helpers for CLI commands.

use std::rc::Rc;

use anyhow::Context;
use patchbay_config::{PresetDocument, PresetFile, RuntimeConfig, find_preset};
use patchbay_core::{OfflineEngine, Reactor, UnitContext};
use patchbay_graph::{PatchGraph, default_registry_with};

/// An offline engine, its reactor, and an empty graph wired to both.
pub struct Host {
    pub engine: Rc<OfflineEngine>,
    pub reactor: Reactor,
    pub graph: PatchGraph,
}

impl Host {
    pub fn new(config: &RuntimeConfig) -> anyhow::Result<Self> {
        let engine = Rc::new(OfflineEngine::new());
        let reactor = Reactor::new(engine.clone(), config.scheduler_config());
        let context = UnitContext::new(engine.clone(), reactor.clone());
        let registry =
            default_registry_with(config.clock_config()).context("building the unit registry")?;
        let graph = PatchGraph::new(registry, context);
        Ok(Self {
            engine,
            reactor,
            graph,
        })
    }
}

/// Resolves a preset argument: a file path, or a name in the presets dir.
pub fn resolve_preset(name: &str, config: &RuntimeConfig) -> anyhow::Result<PresetFile> {
    let path = find_preset(name, &config.presets_dir())
        .with_context(|| format!("no preset named '{name}'"))?;
    Ok(PresetFile::new(path))
}

/// Loads a preset file with path context on failure.
pub fn load_preset(file: &PresetFile) -> anyhow::Result<PresetDocument> {
    file.load()
        .with_context(|| format!("reading preset {}", file.path().display()))
}
