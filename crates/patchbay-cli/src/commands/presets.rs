//! Preset directory listing.

use clap::Args;
use patchbay_config::{PresetFile, RuntimeConfig, list_presets_in, preset_name_from_path};

#[derive(Args)]
pub struct PresetsArgs {
    /// Also decode each preset and show its root type
    #[arg(short, long)]
    long: bool,
}

pub fn run(args: PresetsArgs, config: &RuntimeConfig) -> anyhow::Result<()> {
    let dir = config.presets_dir();
    let presets = list_presets_in(&dir);

    println!("Presets in {}", dir.display());
    println!();
    if presets.is_empty() {
        println!("  (none)");
        return Ok(());
    }

    for path in presets {
        let name = preset_name_from_path(&path).unwrap_or_default();
        if !args.long {
            println!("  {name}");
            continue;
        }
        match PresetFile::new(&path).load() {
            Ok(preset) => println!("  {name:20} {}", preset.root_type_id),
            Err(err) => println!("  {name:20} unreadable: {err}"),
        }
    }
    Ok(())
}
