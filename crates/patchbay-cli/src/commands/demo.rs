//! Demo patch writer.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use patchbay_config::{PresetDocument, PresetFile, RuntimeConfig};
use patchbay_core::Value;
use patchbay_graph::{ConnectionSpec, NewUnit, PatchGraph, UnitId};

use super::common::Host;

#[derive(Args)]
pub struct DemoArgs {
    /// Where to write the patch
    output: PathBuf,

    /// Clock tempo in BPM
    #[arg(short, long, default_value = "120.0")]
    tempo: f64,
}

/// Eight-bit click: a decaying square burst.
fn click(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| {
            let level = 127.0 * (1.0 - i as f64 / len as f64);
            let sign = if (i / 8) % 2 == 0 { 1.0 } else { -1.0 };
            (128.0 + sign * level) as u8
        })
        .collect()
}

/// Clock into a sequencer triggering a sampler, plus a counter on the
/// quarter output.
pub fn build(graph: &mut PatchGraph, tempo: f64) -> anyhow::Result<()> {
    let clock = graph.add_unit_with(
        NewUnit::new("clock")
            .settings(Value::map().with("tempo", tempo))
            .display_name("Main Clock"),
    )?;
    let gates: Vec<Value> = [true, false, true, true, false, true, false, false]
        .into_iter()
        .map(Value::from)
        .collect();
    let seq = graph.add_unit(
        "sequencer",
        Some(Value::map().with("steps", 8).with("gates", gates)),
    )?;
    let sampler = graph.add_unit(
        "sampler",
        Some(Value::map().with("gain", 0.8).with("sample", click(2048))),
    )?;
    let gain = graph.add_unit("gain", Some(Value::map().with("gain", 0.5)))?;
    let beats = graph.add_unit_with(NewUnit::new("counter").display_name("Beats"))?;

    let wire = |src: &UnitId, out: &str, dst: &UnitId, input: &str| {
        ConnectionSpec::new(src.clone(), out, dst.clone(), input)
    };
    graph.connect(wire(&clock, "sixteenth", &seq, "clock"))?;
    graph.connect(wire(&seq, "gate", &sampler, "gate"))?;
    graph.connect(wire(&sampler, "audio", &gain, "audio"))?;
    graph.connect(wire(&clock, "quarter", &beats, "gate"))?;
    Ok(())
}

pub fn run(args: DemoArgs, config: &RuntimeConfig) -> anyhow::Result<()> {
    let mut host = Host::new(config)?;
    build(&mut host.graph, args.tempo)?;

    let preset = PresetDocument::from_graph(&host.graph);
    let format = PresetFile::new(&args.output)
        .save(&preset)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "Wrote {} ({} units, {} connections, {:?})",
        args.output.display(),
        host.graph.len(),
        host.graph.connection_count(),
        format
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_patch_is_valid_and_round_trips() {
        let mut host = Host::new(&RuntimeConfig::default()).unwrap();
        build(&mut host.graph, 120.0).unwrap();
        assert_eq!(host.graph.len(), 5);
        assert_eq!(host.graph.connection_count(), 4);

        let preset = PresetDocument::from_graph(&host.graph);
        let bytes = preset.to_container().unwrap();
        let mut other = Host::new(&RuntimeConfig::default()).unwrap();
        PresetDocument::decode(&bytes)
            .unwrap()
            .mount(&mut other.graph)
            .unwrap();
        assert_eq!(other.graph.save(), host.graph.save());
    }

    #[test]
    fn test_click_is_bounded() {
        let sample = click(64);
        assert_eq!(sample.len(), 64);
        assert!(sample[0] > 200);
    }
}
