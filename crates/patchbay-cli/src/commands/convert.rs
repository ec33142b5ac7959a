//! Preset format conversion.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use patchbay_config::{PresetError, PresetFile};

use super::common::load_preset;

#[derive(Args)]
pub struct ConvertArgs {
    /// Input preset file
    input: PathBuf,

    /// Output preset file
    output: PathBuf,

    /// Write the binary container form (required for presets with samples)
    #[arg(long)]
    binary: bool,
}

pub fn run(args: ConvertArgs) -> anyhow::Result<()> {
    let preset = load_preset(&PresetFile::new(&args.input))?;
    let out = PresetFile::new(&args.output);

    let result = if args.binary {
        out.save_binary(&preset)
    } else {
        out.save_json(&preset)
    };
    match result {
        Err(PresetError::BlobsNeedContainer(count)) => anyhow::bail!(
            "{} holds {count} sample blob(s); rerun with --binary",
            args.input.display()
        ),
        other => other.with_context(|| format!("writing {}", args.output.display()))?,
    }

    println!(
        "Wrote {} ({})",
        args.output.display(),
        if args.binary { "container" } else { "json" }
    );
    Ok(())
}
