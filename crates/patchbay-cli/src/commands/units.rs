//! Unit type listing.

use clap::Args;
use patchbay_config::RuntimeConfig;
use patchbay_core::{InputPort, OutputPort, PortSet};

use super::common::Host;

#[derive(Args)]
pub struct UnitsArgs {
    /// Show only one unit type
    #[arg(value_name = "TYPE")]
    unit: Option<String>,
}

fn describe<P>(ports: &PortSet<P>, kind: impl Fn(&P) -> &'static str) -> String {
    if ports.is_empty() {
        return "-".to_string();
    }
    ports
        .iter()
        .map(|(name, port)| format!("{name} ({})", kind(port)))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn run(args: UnitsArgs, config: &RuntimeConfig) -> anyhow::Result<()> {
    let host = Host::new(config)?;
    let registry = host.graph.registry();

    let descriptors: Vec<_> = match &args.unit {
        Some(id) => vec![
            registry
                .get(id)
                .ok_or_else(|| anyhow::anyhow!("Unknown unit type: {id}"))?,
        ],
        None => registry.all_units(),
    };

    println!("Available Units");
    println!("===============");
    println!();

    for descriptor in descriptors {
        println!(
            "  {:10} {:11} {}",
            descriptor.id,
            descriptor.category.name(),
            descriptor.description
        );
        match registry.create(descriptor.id, host.graph.context(), None) {
            Ok(mut unit) => {
                let ports = unit.ports();
                println!(
                    "  {:22} in:  {}",
                    "",
                    describe(&ports.inputs, |p: &InputPort| p.kind().as_str())
                );
                println!(
                    "  {:22} out: {}",
                    "",
                    describe(&ports.outputs, |p: &OutputPort| p.kind().as_str())
                );
                unit.teardown();
            }
            Err(err) => tracing::warn!(unit = descriptor.id, error = %err, "could not instantiate"),
        }
    }

    println!();
    println!("Use 'patchbay demo <file>' to write an example patch.");
    Ok(())
}
