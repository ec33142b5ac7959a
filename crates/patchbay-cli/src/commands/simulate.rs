//! Offline patch simulation.

use anyhow::Context;
use clap::Args;
use patchbay_config::RuntimeConfig;
use patchbay_units::{Clock, Counter, Sampler};

use super::common::{Host, load_preset, resolve_preset};

#[derive(Args)]
pub struct SimulateArgs {
    /// Preset path or name
    preset: String,

    /// Seconds of engine time to run
    #[arg(short, long, default_value = "2.0")]
    seconds: f64,
}

pub fn run(args: SimulateArgs, config: &RuntimeConfig) -> anyhow::Result<()> {
    if !(args.seconds.is_finite() && args.seconds >= 0.0) {
        anyhow::bail!("--seconds must be a non-negative number");
    }
    let file = resolve_preset(&args.preset, config)?;
    let preset = load_preset(&file)?;

    let mut host = Host::new(config)?;
    preset
        .mount(&mut host.graph)
        .with_context(|| format!("mounting {}", file.path().display()))?;

    let polls = host.reactor.run_offline(&host.engine, args.seconds);
    println!(
        "Simulated {:.3} s: {polls} polls, {} units, {} connections",
        args.seconds,
        host.graph.len(),
        host.graph.connection_count()
    );
    println!();

    for record in host.graph.units() {
        let id = record.id();
        let name = record.display_name();
        if let Some(counter) = host.graph.unit_as::<Counter>(id) {
            println!(
                "  {name:16} rising {:4}  falling {:4}",
                counter.rising(),
                counter.falling()
            );
        } else if let Some(sampler) = host.graph.unit_as::<Sampler>(id) {
            println!("  {name:16} triggers {:4}", sampler.triggers());
        } else if let Some(clock) = host.graph.unit_as::<Clock>(id) {
            println!(
                "  {name:16} {:.1} bpm, {} ticks",
                clock.tempo(),
                clock.next_tick_index()
            );
        }
    }

    println!();
    println!("Deadline misses: {}", host.reactor.deadline_misses());
    Ok(())
}
