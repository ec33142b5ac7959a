//! Preset inspection command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use patchbay_config::{PresetFormat, RuntimeConfig};

use super::common::{load_preset, resolve_preset};

#[derive(Args)]
pub struct InspectArgs {
    /// Preset path or name
    preset: String,
}

pub fn run(args: InspectArgs, config: &RuntimeConfig) -> anyhow::Result<()> {
    let file = resolve_preset(&args.preset, config)?;
    let preset = load_preset(&file)?;

    println!("{}", file.path().display());
    println!("{}", "=".repeat(file.path().display().to_string().len()));
    println!();
    println!("Root type: {}", preset.root_type_id);
    println!("Blobs:     {}", preset.blob_count()?);
    let format = match preset.preferred_format() {
        PresetFormat::Json => "json",
        PresetFormat::Container => "container",
    };
    println!("Fits:      {format}");

    let Ok(patch) = preset.patch() else {
        return Ok(());
    };

    println!();
    println!("Units:");
    println!();
    println!("  {:8}  {:12}  {}", "Id", "Type", "Name");
    println!("  {:8}  {:12}  {}", "--", "----", "----");
    for (id, entry) in patch.units() {
        println!("  {:8}  {:12}  {}", id, entry.type_id, entry.display_name);
    }

    println!();
    println!("Connections:");
    println!();
    if patch.connections.is_empty() {
        println!("  (none)");
    }
    for spec in &patch.connections {
        println!("  {spec}");
    }
    Ok(())
}
