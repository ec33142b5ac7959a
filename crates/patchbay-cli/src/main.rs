//! Patchbay CLI - build, inspect and simulate patches from the command line.

mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use patchbay_config::RuntimeConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patchbay")]
#[command(author, version, about = "Modular patch runtime CLI", long_about = None)]
struct Cli {
    /// Runtime configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log graph and scheduler activity
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available unit types and their ports
    Units(commands::units::UnitsArgs),

    /// Show the contents of a preset file
    Inspect(commands::inspect::InspectArgs),

    /// Re-encode a preset between JSON and binary container form
    Convert(commands::convert::ConvertArgs),

    /// Run a patch against an offline clock and report what happened
    Simulate(commands::simulate::SimulateArgs),

    /// Write a demo patch
    Demo(commands::demo::DemoArgs),

    /// List presets in the presets directory
    Presets(commands::presets::PresetsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RuntimeConfig::load_default().context("loading default config")?,
    };

    match cli.command {
        Commands::Units(args) => commands::units::run(args, &config),
        Commands::Inspect(args) => commands::inspect::run(args, &config),
        Commands::Convert(args) => commands::convert::run(args),
        Commands::Simulate(args) => commands::simulate::run(args, &config),
        Commands::Demo(args) => commands::demo::run(args, &config),
        Commands::Presets(args) => commands::presets::run(args, &config),
    }
}
